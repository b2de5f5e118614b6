//! Everything known about a caught failure, in one call.

use crate::{
    caller::{DiagnosticReport, StackSnapshot, current_thread_id, locate_caller},
    chain::walk,
    data::aggregate_typed_data,
    error::FormatError,
    failure::Failure,
    message::aggregate_typed_messages,
    stack_trace::normalize_stack_trace,
};

/// Message rendered when [`describe_failure`] is given no failure.
pub const ABSENT_MESSAGE: &str = "Failure was absent. No message information can be obtained.";
/// Data rendered when [`describe_failure`] is given no failure.
pub const ABSENT_DATA: &str =
    "Failure was absent. No data collection information can be obtained.";
/// Stack trace rendered when [`describe_failure`] is given no failure.
pub const ABSENT_STACK_TRACE: &str = "Failure was absent. No stack information can be obtained.";

/// Separator that replaces line breaks in [`FailureInfo::log_message`] and
/// [`FailureInfo::stack_trace`].
pub const LINE_BREAK_REPLACEMENT: &str = " | ";

/// The consolidated description of a failure and of the place it was caught.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureInfo {
    /// Every node's `TypeName=[message]`, joined with `::`.
    pub log_message: String,
    /// Every node's `TypeName Data=[...]`, joined with `::`.
    pub data: String,
    /// The outermost node's stack trace on one line.
    pub stack_trace: String,
    /// The frame that called the describing function.
    pub caller: DiagnosticReport,
}

/// Describes a failure chain and the location it is being handled at.
///
/// `snapshot` is the current call stack captured by the caller; frame `1`
/// (or frame `0` if it is the only one) identifies the handling code. An
/// absent failure renders the `ABSENT_*` sentinels, and an absent snapshot
/// leaves the caller's module, method and line empty. Line breaks in the log
/// message and stack trace are replaced with `" | "`.
///
/// On a formatting fault, everything rendered so far is recorded into the
/// error's data before it is returned.
///
/// ```
/// use faultchain::{CallFrame, Fault, StackSnapshot, describe_failure};
///
/// let fault = Fault::new("Exception", "Topmost exception message")
///     .attach("Outer Data 1", 1234)
///     .with_cause(Fault::new("Exception", "Inner exception message"));
/// let snapshot = StackSnapshot::new(vec![
///     CallFrame::new("app::errors", "describe"),
///     CallFrame::new("app::Worker", "run").at("src/worker.rs", 40, 13),
/// ]);
///
/// let info = describe_failure(Some(&fault), Some(&snapshot)).unwrap();
/// assert_eq!(
///     info.log_message,
///     "Exception=[Topmost exception message]::Exception=[Inner exception message]"
/// );
/// assert_eq!(info.data, "Exception Data=[{Outer Data 1}={1234}]::Exception Data=[None]");
/// assert_eq!(info.stack_trace, "[NULL]");
/// assert_eq!(info.caller.caller_module, "Worker");
/// assert_eq!(info.caller.caller_line_number, 40);
/// ```
pub fn describe_failure(
    failure: Option<&dyn Failure>,
    snapshot: Option<&StackSnapshot>,
) -> Result<FailureInfo, FormatError> {
    let mut info = FailureInfo {
        caller: DiagnosticReport {
            executing_thread_id: current_thread_id(),
            ..DiagnosticReport::default()
        },
        ..FailureInfo::default()
    };

    describe_into(&mut info, failure, snapshot).map_err(|error| {
        error
            .record(
                "failure",
                failure.map_or("NULL", |failure| failure.type_name()),
            )
            .record("log_message", info.log_message.as_str())
            .record("data", info.data.as_str())
            .record("stack_trace", info.stack_trace.as_str())
            .record("caller_module", info.caller.caller_module.as_str())
            .record("caller_method", info.caller.caller_method.as_str())
            .record("caller_line_number", info.caller.caller_line_number)
            .record("executing_thread_id", info.caller.executing_thread_id)
    })?;

    Ok(info)
}

fn describe_into(
    info: &mut FailureInfo,
    failure: Option<&dyn Failure>,
    snapshot: Option<&StackSnapshot>,
) -> Result<(), FormatError> {
    match failure {
        None => {
            info.log_message = ABSENT_MESSAGE.to_owned();
            info.stack_trace = ABSENT_STACK_TRACE.to_owned();
            info.data = ABSENT_DATA.to_owned();
        }
        Some(_) => {
            info.log_message = aggregate_typed_messages(walk(failure))?;
            info.stack_trace = normalize_stack_trace(failure);
            info.data = aggregate_typed_data(walk(failure))?;
        }
    }

    if let Some(snapshot) = snapshot {
        info.caller = locate_caller(snapshot)?;
    }

    info.log_message = replace_line_breaks(&info.log_message);
    info.stack_trace = replace_line_breaks(&info.stack_trace);
    Ok(())
}

fn replace_line_breaks(text: &str) -> String {
    text.replace("\r\n", LINE_BREAK_REPLACEMENT)
        .replace('\n', LINE_BREAK_REPLACEMENT)
}
