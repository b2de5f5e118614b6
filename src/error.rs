//! Errors raised by the formatters themselves.
//!
//! Absent inputs are never errors: an absent failure, an empty chain or a
//! missing stack trace all render fixed sentinel strings. A [`FormatError`]
//! means something unexpected went wrong while rendering, for instance an
//! attached value whose [`Display`](core::fmt::Display) implementation
//! failed. The error records the state of the failed call in its own
//! [`AuxData`], and is itself a [`Failure`], so it can be summarized with the
//! same functions that produced it:
//!
//! ```
//! use faultchain::{aggregate_typed_data, locate_caller, walk, StackSnapshot};
//!
//! let error = locate_caller(&StackSnapshot::default()).unwrap_err();
//! let data = aggregate_typed_data(walk(Some(&error))).unwrap();
//! assert_eq!(data, "FormatError Data=[{frame_count}={0}]");
//! ```

use std::borrow::Cow;

use crate::{
    aux_data::{AuxData, AuxValue},
    failure::Failure,
};

/// What went wrong inside a formatting call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FormatErrorKind {
    /// An attached value could not be rendered.
    #[error("an attached value could not be rendered")]
    Render,
    /// A stack snapshot held no frames.
    #[error("the stack snapshot holds no frames")]
    MissingFrame,
}

/// A fault raised while formatting a failure chain.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{operation} failed: {kind}")]
pub struct FormatError {
    operation: &'static str,
    kind: FormatErrorKind,
    data: AuxData,
}

impl FormatError {
    pub(crate) fn new(operation: &'static str, kind: FormatErrorKind) -> Self {
        tracing::debug!(operation, %kind, "formatting fault");
        Self {
            operation,
            kind,
            data: AuxData::new(),
        }
    }

    /// Records a piece of call state, without ever overwriting earlier
    /// records.
    #[must_use]
    pub(crate) fn record(mut self, key: &str, value: impl Into<AuxValue>) -> Self {
        self.data.insert_checked(key, value);
        self
    }

    /// The kind of fault.
    pub fn kind(&self) -> FormatErrorKind {
        self.kind
    }

    /// The name of the formatting operation that failed.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The call state recorded while the fault propagated.
    pub fn data(&self) -> &AuxData {
        &self.data
    }

    /// Mutable access to the recorded call state, for callers that want to
    /// add their own context before re-raising.
    pub fn data_mut(&mut self) -> &mut AuxData {
        &mut self.data
    }
}

impl Failure for FormatError {
    fn type_name(&self) -> &str {
        "FormatError"
    }

    fn message(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(self.to_string()))
    }

    fn origin(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_NAME"))
    }

    fn aux_data(&self) -> Option<&AuxData> {
        Some(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_send_sync() {
        static_assertions::assert_impl_all!(FormatError: Send, Sync, std::error::Error);
    }

    #[test]
    fn test_display_and_records() {
        let error = FormatError::new("aggregate_data", FormatErrorKind::Render)
            .record("key", "secret")
            .record("key", "other");
        assert_eq!(
            error.to_string(),
            "aggregate_data failed: an attached value could not be rendered"
        );
        assert_eq!(error.kind(), FormatErrorKind::Render);
        assert_eq!(error.operation(), "aggregate_data");
        assert_eq!(error.data().keys().collect::<Vec<_>>(), ["key", "key-1"]);
    }

    #[test]
    fn test_format_error_is_a_failure() {
        let error = FormatError::new("locate_caller", FormatErrorKind::MissingFrame);
        assert_eq!(error.type_name(), "FormatError");
        assert_eq!(error.origin(), Some("faultchain"));
        assert_eq!(
            error.message().as_deref(),
            Some("locate_caller failed: the stack snapshot holds no frames")
        );
    }
}
