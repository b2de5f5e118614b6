use crate::{failure::Failure, util::NODE_SEPARATOR};

/// Rendering used when there is no stack trace to normalize.
pub const NO_STACK_TRACE: &str = "[NULL]";

/// Renders the outermost failure's stack trace on a single line.
///
/// The trace is trimmed, every line break together with the indentation that
/// follows it becomes `::`, and the result is bracketed. Causes are not
/// consulted: only the outermost failure's trace is used. Without a trace the
/// result is `[NULL]`.
///
/// ```
/// use faultchain::{Fault, normalize_stack_trace};
///
/// let fault = Fault::new("Error", "m")
///     .with_stack_trace("   at app::load in src/lib.rs:line 10\n   at app::main in src/main.rs:line 3\n");
/// assert_eq!(
///     normalize_stack_trace(Some(&fault)),
///     "[at app::load in src/lib.rs:line 10::at app::main in src/main.rs:line 3]"
/// );
/// ```
pub fn normalize_stack_trace(outer: Option<&dyn Failure>) -> String {
    let Some(trace) = outer.and_then(|failure| failure.stack_trace()) else {
        return NO_STACK_TRACE.to_owned();
    };

    let mut normalized = String::with_capacity(trace.len() + 2);
    normalized.push('[');
    for (index, line) in trace.trim().lines().enumerate() {
        if index > 0 {
            normalized.push_str(NODE_SEPARATOR);
            normalized.push_str(line.trim_start());
        } else {
            normalized.push_str(line);
        }
    }
    normalized.push(']');
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fault;

    #[test]
    fn test_no_trace() {
        assert_eq!(normalize_stack_trace(None), "[NULL]");
        let fault = Fault::new("Error", "m");
        assert_eq!(normalize_stack_trace(Some(&fault)), "[NULL]");
    }

    #[test]
    fn test_single_line() {
        let fault = Fault::new("Error", "m").with_stack_trace(
            "   at Billing.InvoiceWorker.ProcessInvoice() in C:\\Projects\\InvoiceWorker.cs:line 465",
        );
        assert_eq!(
            normalize_stack_trace(Some(&fault)),
            "[at Billing.InvoiceWorker.ProcessInvoice() in C:\\Projects\\InvoiceWorker.cs:line 465]"
        );
    }

    #[test]
    fn test_crlf_and_bare_breaks() {
        let fault =
            Fault::new("Error", "m").with_stack_trace("at a\r\n   at b\nat c\r\n\tat d\r\n");
        assert_eq!(normalize_stack_trace(Some(&fault)), "[at a::at b::at c::at d]");
    }

    #[test]
    fn test_only_outer_trace_is_used() {
        let fault = Fault::new("Outer", "m")
            .with_cause(Fault::new("Inner", "n").with_stack_trace("at inner"));
        assert_eq!(normalize_stack_trace(Some(&fault)), "[NULL]");
    }
}
