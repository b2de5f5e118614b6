//! Integration with the [`anyhow`] 1.x error handling library.
//!
//! This module specifically supports `anyhow` version 1.x. To enable this
//! integration, add the `compat-anyhow1` feature flag to your `Cargo.toml`.
//!
//! # Converting from Anyhow
//!
//! Every entry of [`anyhow::Error::chain`] becomes one node of the resulting
//! [`Fault`], outermost context first. When anyhow captured a backtrace, it
//! becomes the outer node's stack trace.
//!
//! ```
//! use faultchain::{aggregate_messages, compat::IntoFault, walk};
//! use anyhow::Context;
//!
//! fn anyhow_function() -> anyhow::Result<()> {
//!     Err(anyhow::anyhow!("connection refused")).context("Failed to reach the ledger")
//! }
//!
//! let fault = anyhow_function().into_fault().unwrap_err();
//! let message = aggregate_messages(walk(Some(&fault))).unwrap();
//! assert_eq!(message, "Failed to reach the ledger::connection refused");
//! ```
//!
//! # Converting to Anyhow
//!
//! [`Fault`] implements [`std::error::Error`], so the `?` operator converts
//! it into an [`anyhow::Error`] directly.

use std::backtrace::BacktraceStatus;

use super::{IntoFault, fault_from_chain};
use crate::Fault;

impl IntoFault for anyhow::Error {
    type Output = Fault;

    fn into_fault(self) -> Self::Output {
        let fault = fault_from_chain(self.chain());
        let backtrace = self.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            fault.with_stack_trace(backtrace.to_string())
        } else {
            fault
        }
    }
}

impl<T> IntoFault for anyhow::Result<T> {
    type Output = Result<T, Fault>;

    fn into_fault(self) -> Self::Output {
        self.map_err(IntoFault::into_fault)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;
    use crate::{Chain, Failure, aggregate_typed_messages};

    #[test]
    fn test_context_layers_become_nodes() {
        let error = Err::<(), _>(std::io::Error::other("timed out"))
            .context("Failed to fetch page 3")
            .context("Import aborted")
            .unwrap_err();
        let fault = error.into_fault();

        assert_eq!(
            aggregate_typed_messages(Chain::new(&fault)).unwrap(),
            "Error=[Import aborted]::Error=[Failed to fetch page 3]::Error=[timed out]"
        );
    }

    #[test]
    fn test_fault_converts_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(Fault::new("QuotaError", "quota exceeded"))?;
            Ok(())
        }
        let error = fails().unwrap_err();
        assert_eq!(error.to_string(), "quota exceeded");
        assert!(error.downcast_ref::<Fault>().is_some());

        let round_trip = error.into_fault();
        assert_eq!(round_trip.type_name(), "Error");
        assert_eq!(round_trip.message().as_deref(), Some("quota exceeded"));
    }
}
