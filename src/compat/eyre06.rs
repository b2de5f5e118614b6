//! Integration with the [`eyre`] 0.6.x error handling library.
//!
//! This module specifically supports `eyre` version 0.6.x. To enable this
//! integration, add the `compat-eyre06` feature flag to your `Cargo.toml`.
//!
//! Every entry of [`eyre::Report::chain`] becomes one node of the resulting
//! [`Fault`], outermost first.
//!
//! ```
//! use faultchain::{aggregate_messages, compat::IntoFault, walk};
//! use eyre::WrapErr;
//!
//! fn eyre_function() -> eyre::Result<()> {
//!     Err(eyre::eyre!("checksum mismatch")).wrap_err("Failed to verify the archive")
//! }
//!
//! let fault = eyre_function().into_fault().unwrap_err();
//! let message = aggregate_messages(walk(Some(&fault))).unwrap();
//! assert_eq!(message, "Failed to verify the archive::checksum mismatch");
//! ```

use super::{IntoFault, fault_from_chain};
use crate::Fault;

impl IntoFault for eyre::Report {
    type Output = Fault;

    fn into_fault(self) -> Self::Output {
        fault_from_chain(self.chain())
    }
}

impl<T> IntoFault for eyre::Result<T> {
    type Output = Result<T, Fault>;

    fn into_fault(self) -> Self::Output {
        self.map_err(IntoFault::into_fault)
    }
}

#[cfg(test)]
mod tests {
    use eyre::WrapErr;

    use super::*;
    use crate::{Chain, aggregate_typed_messages};

    #[test]
    fn test_wrapped_report() {
        let report = Err::<(), _>(std::io::Error::other("no space left"))
            .wrap_err("Failed to write snapshot")
            .unwrap_err();
        let fault = report.into_fault();

        assert_eq!(
            aggregate_typed_messages(Chain::new(&fault)).unwrap(),
            "Error=[Failed to write snapshot]::Error=[no space left]"
        );
    }

    #[test]
    fn test_ok_passes_through() {
        let ok: eyre::Result<&str> = Ok("done");
        assert_eq!(ok.into_fault(), Ok("done"));
    }
}
