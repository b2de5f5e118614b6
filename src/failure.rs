//! The failure view consumed by the formatters, and an owned implementation.
//!
//! A failure chain is a sequence of nodes, each pointing to the failure that
//! caused it. The formatters only ever see the chain through the [`Failure`]
//! trait, borrowing it for the duration of a single call.
//!
//! [`Fault`] is the owned chain type shipped with this crate. It can be built
//! by hand, converted from any [`std::error::Error`] with
//! [`Fault::from_error`], or from other error libraries through the
//! [`compat`](crate::compat) module.
//!
//! ```
//! use faultchain::{Fault, aggregate_messages, walk};
//!
//! let fault = Fault::new("ConfigError", "Failed to load configuration")
//!     .with_origin("settings")
//!     .with_cause(Fault::new("IoError", "file not found"));
//!
//! let message = aggregate_messages(walk(Some(&fault))).unwrap();
//! assert_eq!(message, "Failed to load configuration; Source=[settings]::file not found");
//! ```

use std::{borrow::Cow, error::Error, fmt};

use crate::{
    aux_data::{AuxData, AuxValue, NULL_LITERAL},
    caller::simple_type_name,
    context::ContextStore,
};

/// A read-only view over one link of a failure chain.
pub trait Failure {
    /// The simple name of the failure's type, e.g. `ParseError`.
    fn type_name(&self) -> &str;

    /// The failure's message, if it has one.
    fn message(&self) -> Option<Cow<'_, str>>;

    /// The component that raised the failure.
    fn origin(&self) -> Option<&str> {
        None
    }

    /// Diagnostic key/value pairs attached to this node.
    fn aux_data(&self) -> Option<&AuxData> {
        None
    }

    /// The failure that caused this one.
    fn cause(&self) -> Option<&dyn Failure> {
        None
    }

    /// The stack trace captured when this failure was raised, as
    /// multi-line text.
    fn stack_trace(&self) -> Option<&str> {
        None
    }
}

/// An owned failure chain.
///
/// Each `Fault` owns its cause, so a chain built from `Fault`s is always
/// finite and acyclic.
#[derive(Clone, Debug, PartialEq)]
pub struct Fault {
    type_name: Cow<'static, str>,
    message: Option<String>,
    origin: Option<String>,
    data: AuxData,
    stack_trace: Option<String>,
    cause: Option<Box<Fault>>,
}

impl Fault {
    /// Creates a fault with a type name and a message.
    pub fn new(type_name: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::without_message(type_name)
        }
    }

    /// Creates a fault that has no message. Its message renders as `NULL`.
    pub fn without_message(type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_name: type_name.into(),
            message: None,
            origin: None,
            data: AuxData::new(),
            stack_trace: None,
            cause: None,
        }
    }

    /// Converts an error and its [`source`](Error::source) chain.
    ///
    /// The outer node is named after `E`; nodes reached through `source()`
    /// are type-erased and named `Error`.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let outer = short_type_name(core::any::type_name::<E>());
        let mut messages = vec![(Cow::Owned(outer.to_owned()), error.to_string())];
        let mut next = error.source();
        while let Some(source) = next {
            messages.push((Cow::Borrowed("Error"), source.to_string()));
            next = source.source();
        }
        Self::from_messages(messages)
    }

    /// Builds a chain from `(type name, message)` pairs, outermost first.
    pub(crate) fn from_messages<I>(messages: I) -> Self
    where
        I: IntoIterator<Item = (Cow<'static, str>, String)>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut chain: Option<Fault> = None;
        for (type_name, message) in messages.into_iter().rev() {
            let mut fault = Fault::new(type_name, message);
            fault.cause = chain.map(Box::new);
            chain = Some(fault);
        }
        chain.unwrap_or_else(|| Fault::without_message("Error"))
    }

    /// Sets the component that raised the failure.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the failure that caused this one, replacing any previous cause.
    #[must_use]
    pub fn with_cause(mut self, cause: Fault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Sets the captured stack trace text.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Attaches a key/value pair, relocating it under a suffixed key if
    /// `key` is taken. See [`AuxData::insert_checked`].
    #[must_use]
    pub fn attach(mut self, key: &str, value: impl Into<AuxValue>) -> Self {
        self.data.insert_checked(key, value);
        self
    }

    /// Copies every entry of a context store into this fault's data.
    #[must_use]
    pub fn attach_context(mut self, store: &ContextStore) -> Self {
        for (key, value) in store.snapshot().iter() {
            self.data.insert_checked(key, value.clone());
        }
        self
    }

    /// The attached data.
    pub fn data(&self) -> &AuxData {
        &self.data
    }

    /// Mutable access to the attached data, for collision-safe inserts after
    /// construction.
    pub fn data_mut(&mut self) -> &mut AuxData {
        &mut self.data
    }

    /// The cause as a [`Fault`].
    pub fn cause_fault(&self) -> Option<&Fault> {
        self.cause.as_deref()
    }
}

impl Failure for Fault {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn message(&self) -> Option<Cow<'_, str>> {
        self.message.as_deref().map(Cow::Borrowed)
    }

    fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    fn aux_data(&self) -> Option<&AuxData> {
        Some(&self.data)
    }

    fn cause(&self) -> Option<&dyn Failure> {
        self.cause.as_deref().map(|cause| cause as &dyn Failure)
    }

    fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or(NULL_LITERAL))
    }
}

impl Error for Fault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Reduces a Rust type path such as `alloc::vec::Vec<u8>` to `Vec`. Trait
/// objects are all named `Error`.
pub(crate) fn short_type_name(full: &str) -> &str {
    if full.starts_with("dyn ") {
        "Error"
    } else {
        simple_type_name(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, derive_more::Display, derive_more::Error)]
    #[display("request failed")]
    struct RequestError {
        source: std::io::Error,
    }

    #[test]
    fn test_fault_send_sync() {
        static_assertions::assert_impl_all!(Fault: Send, Sync, Clone, Error);
    }

    #[test]
    fn test_builder() {
        let fault = Fault::new("Outer", "outer message")
            .with_origin("component")
            .with_stack_trace("at main")
            .attach("id", 7)
            .attach("id", 8)
            .with_cause(Fault::without_message("Inner"));

        assert_eq!(fault.type_name(), "Outer");
        assert_eq!(fault.message().as_deref(), Some("outer message"));
        assert_eq!(fault.origin(), Some("component"));
        assert_eq!(fault.stack_trace(), Some("at main"));
        assert_eq!(fault.data().keys().collect::<Vec<_>>(), ["id", "id-1"]);

        let cause = fault.cause_fault().unwrap();
        assert_eq!(cause.type_name(), "Inner");
        assert_eq!(cause.message(), None);
        assert_eq!(cause.to_string(), "NULL");
        assert!(Failure::cause(cause).is_none());
    }

    #[test]
    fn test_from_error_walks_sources() {
        let error = RequestError {
            source: std::io::Error::other("connection reset"),
        };
        let fault = Fault::from_error(&error);

        assert_eq!(fault.type_name(), "RequestError");
        assert_eq!(fault.message().as_deref(), Some("request failed"));
        let cause = fault.cause_fault().unwrap();
        assert_eq!(cause.type_name(), "Error");
        assert_eq!(cause.message().as_deref(), Some("connection reset"));
        assert!(cause.cause_fault().is_none());
    }

    #[test]
    fn test_from_dyn_error() {
        let error: Box<dyn Error + Send + Sync> = "plain failure".into();
        let fault = Fault::from_error(&*error);
        assert_eq!(fault.type_name(), "Error");
        assert_eq!(fault.message().as_deref(), Some("plain failure"));
    }

    #[test]
    fn test_error_source_follows_cause() {
        let fault = Fault::new("Outer", "a").with_cause(Fault::new("Inner", "b"));
        let source = fault.source().unwrap();
        assert_eq!(source.to_string(), "b");
        assert!(source.source().is_none());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("alloc::vec::Vec<u8>"), "Vec");
        assert_eq!(short_type_name("std::io::error::Error"), "Error");
        assert_eq!(short_type_name("Plain"), "Plain");
        assert_eq!(short_type_name("dyn core::error::Error + Send + Sync"), "Error");
    }
}
