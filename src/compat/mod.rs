//! Conversions from other error handling libraries.
//!
//! # Overview
//!
//! The formatters accept anything implementing [`Failure`](crate::Failure).
//! This module turns the error types of other libraries into owned
//! [`Fault`] chains, so their messages and causes can be summarized the same
//! way as hand-built faults.
//!
//! # Available Integrations
//!
//! - [`boxed_error`] - Boxed error trait objects (`Box<dyn Error>` and
//!   `Box<dyn Error + Send + Sync>`)
//! - [`anyhow1`] - The `anyhow` 1.x error handling library (requires the
//!   `compat-anyhow1` feature flag)
//! - [`eyre06`] - The `eyre` 0.6.x error handling library (requires the
//!   `compat-eyre06` feature flag)
//!
//! The opposite direction needs no help: [`Fault`] implements
//! [`std::error::Error`], so it converts into any of these types with `?` or
//! [`Into`].
//!
//! # Example
//!
//! ```
//! use faultchain::{aggregate_messages, compat::IntoFault, walk};
//!
//! # #[cfg(feature = "compat-anyhow1")] {
//! use anyhow::Context;
//!
//! fn legacy_function() -> anyhow::Result<String> {
//!     std::fs::read_to_string("/definitely/not/here").context("Failed to read settings")
//! }
//!
//! let fault = legacy_function().into_fault().unwrap_err();
//! let message = aggregate_messages(walk(Some(&fault))).unwrap();
//! assert!(message.starts_with("Failed to read settings::"));
//! # }
//! ```

use crate::Fault;

/// Converts external error values into [`Fault`] chains.
///
/// # Implementations
///
/// - [`boxed_error`] implements it for `Box<dyn Error>` and
///   `Box<dyn Error + Send + Sync>`
/// - [`anyhow1`] implements it for [`anyhow::Error`] and
///   [`anyhow::Result<T>`]
/// - [`eyre06`] implements it for [`eyre::Report`] and [`eyre::Result<T>`]
///
/// [`anyhow::Error`]: ::anyhow::Error
/// [`anyhow::Result<T>`]: ::anyhow::Result
/// [`eyre::Report`]: ::eyre::Report
/// [`eyre::Result<T>`]: ::eyre::Result
///
/// ```
/// use faultchain::{Failure, compat::IntoFault};
///
/// let error: Box<dyn std::error::Error + Send + Sync> = "disk full".into();
/// let fault = error.into_fault();
/// assert_eq!(fault.message().as_deref(), Some("disk full"));
/// ```
pub trait IntoFault {
    /// The type produced by the conversion.
    ///
    /// For error types, this is [`Fault`]. For `Result` types, this is
    /// `Result<T, Fault>`.
    type Output;

    /// Converts this value, keeping every message of its cause chain.
    fn into_fault(self) -> Self::Output;
}

pub mod boxed_error;

#[cfg(feature = "compat-anyhow1")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-anyhow1")))]
pub mod anyhow1;

#[cfg(feature = "compat-eyre06")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-eyre06")))]
pub mod eyre06;

/// Builds a fault chain from the messages of a `source()` chain. Every node
/// is named `Error`, since the concrete types are erased.
pub(crate) fn fault_from_chain<'a, I>(chain: I) -> Fault
where
    I: IntoIterator<Item = &'a (dyn std::error::Error + 'static)>,
{
    let messages: Vec<_> = chain
        .into_iter()
        .map(|error| (std::borrow::Cow::Borrowed("Error"), error.to_string()))
        .collect();
    Fault::from_messages(messages)
}
