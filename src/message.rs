//! Consolidated failure messages.
//!
//! Each node of a chain contributes its message (or `NULL`) followed by
//! `; Source=[origin]` when the node names its origin. Nodes are joined with
//! `::`, outermost first:
//!
//! ```text
//! Topmost exception message; Source=[X]::Inner exception message
//! ```
//!
//! [`aggregate_typed_messages`] additionally prefixes every node with its type
//! name and brackets the message:
//!
//! ```text
//! Exception=[Topmost exception message]; Source=[X]::Exception=[Inner exception message]
//! ```

use core::fmt::Write;

use crate::{
    aux_data::NULL_LITERAL,
    chain::walk,
    data::write_entries,
    error::{FormatError, FormatErrorKind},
    failure::Failure,
    util::{finish, render_chain, render_nodes},
};

/// Renders the messages of every node of a chain.
pub fn aggregate_messages<'a, I>(chain: I) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a dyn Failure>,
{
    render_chain(chain, |out, node| {
        write_message(out, node, false).map_err(|_| render_fault("aggregate_messages", node))
    })
}

/// Renders the messages of every node of a chain as `TypeName=[message]`.
pub fn aggregate_typed_messages<'a, I>(chain: I) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a dyn Failure>,
{
    render_chain(chain, |out, node| {
        write_message(out, node, true).map_err(|_| render_fault("aggregate_typed_messages", node))
    })
}

fn write_message(out: &mut String, node: &dyn Failure, typed: bool) -> core::fmt::Result {
    let message = node.message();
    let message = message.as_deref().unwrap_or(NULL_LITERAL);
    if typed {
        write!(out, "{}=[{message}]", node.type_name())?;
    } else {
        out.push_str(message);
    }
    if let Some(origin) = node.origin() {
        write!(out, "; Source=[{origin}]")?;
    }
    Ok(())
}

fn render_fault(operation: &'static str, node: &dyn Failure) -> FormatError {
    FormatError::new(operation, FormatErrorKind::Render).record("failure", node.type_name())
}

/// Options for [`full_message`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FullMessageOptions {
    /// Append each node's attached data as `; Data=[...]`.
    pub include_data: bool,
    /// Append the outermost node's raw stack trace.
    pub include_stack_trace: bool,
}

impl FullMessageOptions {
    /// Messages only.
    pub const MESSAGES_ONLY: Self = Self {
        include_data: false,
        include_stack_trace: false,
    };

    /// Messages, data and stack trace.
    pub const EVERYTHING: Self = Self {
        include_data: true,
        include_stack_trace: true,
    };

    /// Sets [`include_data`](Self::include_data).
    #[must_use]
    pub const fn with_data(mut self, include_data: bool) -> Self {
        self.include_data = include_data;
        self
    }

    /// Sets [`include_stack_trace`](Self::include_stack_trace).
    #[must_use]
    pub const fn with_stack_trace(mut self, include_stack_trace: bool) -> Self {
        self.include_stack_trace = include_stack_trace;
        self
    }
}

/// Renders a failure chain as one line, optionally with attached data and the
/// outermost stack trace.
///
/// Every node renders as its message and origin like
/// [`aggregate_messages`]. With [`include_data`](FullMessageOptions::include_data)
/// each node is followed by `; Data=[{key}={value}|...]`, or `; Data=[None]`
/// when it has no data. With
/// [`include_stack_trace`](FullMessageOptions::include_stack_trace) the raw
/// trace of the outermost failure, if it has one, is appended as
/// `; Stack Trace=[...].`
///
/// An absent failure renders as an empty string.
///
/// ```
/// use faultchain::{Fault, FullMessageOptions, full_message};
///
/// let fault = Fault::new("Error", "test exception").attach("attempt", 3);
/// let options = FullMessageOptions::default().with_data(true);
/// assert_eq!(
///     full_message(Some(&fault), options).unwrap(),
///     "test exception; Data=[{attempt}={3}]"
/// );
/// ```
pub fn full_message(
    failure: Option<&dyn Failure>,
    options: FullMessageOptions,
) -> Result<String, FormatError> {
    let record_options = |error: FormatError| {
        error
            .record("include_data", options.include_data)
            .record("include_stack_trace", options.include_stack_trace)
    };

    let Some(outer) = failure else {
        return Ok(String::new());
    };

    // The trailing separator is only stripped once the trace is appended.
    let mut message = render_nodes(walk(Some(outer)), |out, node| {
        write_message(out, node, false).map_err(|_| render_fault("full_message", node))?;
        if options.include_data {
            out.push_str("; Data=[");
            if !write_entries(out, node, "full_message")? {
                out.push_str("None");
            }
            out.push(']');
        }
        Ok(())
    })
    .map_err(record_options)?;

    if options.include_stack_trace
        && let Some(trace) = outer.stack_trace()
    {
        let trimmed = message.trim();
        let separator = if trimmed.ends_with(';') { " " } else { "; " };
        message = format!("{trimmed}{separator}Stack Trace=[{trace}].");
    }

    Ok(finish(&message).to_owned())
}

#[cfg(test)]
mod tests {
    use core::fmt;

    use super::*;
    use crate::{AuxValue, Chain, Fault, aggregate_data};

    struct Unrenderable;

    impl fmt::Display for Unrenderable {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    fn two_level() -> Fault {
        Fault::new("Exception", "Topmost exception message")
            .with_origin("X")
            .with_cause(Fault::new("Exception", "Inner exception message"))
    }

    #[test]
    fn test_empty_chain() {
        assert_eq!(aggregate_messages(walk(None)).unwrap(), "");
        assert_eq!(aggregate_typed_messages(walk(None)).unwrap(), "");
    }

    #[test]
    fn test_single_node() {
        let fault = Fault::new("ArgumentError", "M").with_origin("S");
        assert_eq!(aggregate_messages(Chain::new(&fault)).unwrap(), "M; Source=[S]");
        assert_eq!(
            aggregate_typed_messages(Chain::new(&fault)).unwrap(),
            "ArgumentError=[M]; Source=[S]"
        );
    }

    #[test]
    fn test_two_level_chain() {
        let fault = two_level();
        assert_eq!(
            aggregate_messages(Chain::new(&fault)).unwrap(),
            "Topmost exception message; Source=[X]::Inner exception message"
        );
        assert_eq!(
            aggregate_typed_messages(Chain::new(&fault)).unwrap(),
            "Exception=[Topmost exception message]; Source=[X]::Exception=[Inner exception message]"
        );
    }

    #[test]
    fn test_missing_message_renders_null() {
        let fault = Fault::without_message("Silent").with_cause(Fault::new("Inner", "x"));
        assert_eq!(aggregate_messages(Chain::new(&fault)).unwrap(), "NULL::x");
        assert_eq!(
            aggregate_typed_messages(Chain::new(&fault)).unwrap(),
            "Silent=[NULL]::Inner=[x]"
        );
    }

    #[test]
    fn test_whitespace_tail_is_trimmed() {
        let fault = Fault::new("Outer", "outer").with_cause(Fault::new("Inner", "   "));
        assert_eq!(aggregate_messages(Chain::new(&fault)).unwrap(), "outer");
    }

    #[test]
    fn test_idempotent() {
        let fault = two_level();
        let first = aggregate_messages(Chain::new(&fault)).unwrap();
        let second = aggregate_messages(Chain::new(&fault)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_message_variants() {
        let fault = Fault::new("InvalidOperation", "test exception")
            .with_origin("app")
            .with_stack_trace("at app::run in src/main.rs:line 4")
            .attach("id", 9)
            .with_cause(Fault::new("Inner", "cause"));

        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::MESSAGES_ONLY).unwrap(),
            "test exception; Source=[app]::cause"
        );
        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::default().with_data(true)).unwrap(),
            "test exception; Source=[app]; Data=[{id}={9}]::cause; Data=[None]"
        );
        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::default().with_stack_trace(true))
                .unwrap(),
            "test exception; Source=[app]::cause; Stack Trace=[at app::run in src/main.rs:line 4]."
        );
        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::EVERYTHING).unwrap(),
            "test exception; Source=[app]; Data=[{id}={9}]::cause; Data=[None]; \
             Stack Trace=[at app::run in src/main.rs:line 4]."
        );
    }

    #[test]
    fn test_full_message_trace_after_semicolon() {
        let fault = Fault::new("Error", "ends with;").with_stack_trace("at main");
        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::EVERYTHING.with_data(false)).unwrap(),
            "ends with; Stack Trace=[at main]."
        );
    }

    #[test]
    fn test_full_message_without_trace() {
        let fault = Fault::new("Error", "no trace");
        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::EVERYTHING).unwrap(),
            "no trace; Data=[None]"
        );
    }

    #[test]
    fn test_full_message_keeps_separator_before_trace() {
        let fault = Fault::new("Outer", "outer")
            .with_stack_trace("at main")
            .with_cause(Fault::new("Inner", "   "));
        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::MESSAGES_ONLY).unwrap(),
            "outer"
        );
        assert_eq!(
            full_message(Some(&fault), FullMessageOptions::MESSAGES_ONLY.with_stack_trace(true))
                .unwrap(),
            "outer::; Stack Trace=[at main]."
        );
    }

    #[test]
    fn test_full_message_fault_records_options() {
        let fault = Fault::new("Outer", "m")
            .with_stack_trace("at main")
            .attach("broken", AuxValue::opaque(Unrenderable));

        let error = full_message(Some(&fault), FullMessageOptions::EVERYTHING).unwrap_err();
        assert_eq!(error.kind(), FormatErrorKind::Render);
        assert_eq!(error.operation(), "full_message");
        assert_eq!(error.data().get("key"), Some(&AuxValue::Text("broken".into())));
        assert_eq!(error.data().get("include_data"), Some(&AuxValue::Bool(true)));
        assert_eq!(error.data().get("include_stack_trace"), Some(&AuxValue::Bool(true)));
        assert_eq!(
            aggregate_data(walk(Some(&error))).unwrap(),
            "Data=[{failure}={Outer}|{key}={broken}|{include_data}={True}|{include_stack_trace}={True}]"
        );
    }

    #[test]
    fn test_full_message_absent() {
        assert_eq!(full_message(None, FullMessageOptions::EVERYTHING).unwrap(), "");
    }
}
