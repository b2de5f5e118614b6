//! Convert boxed error trait objects into [`Fault`]s.
//!
//! The boxed error and every error reachable through
//! [`source`](std::error::Error::source) become one node each. Since the
//! concrete types are erased, all nodes are named `Error`.
//!
//! ```
//! use faultchain::{aggregate_typed_messages, compat::IntoFault, walk};
//! use std::error::Error;
//!
//! fn boxed_error_function() -> Result<u32, Box<dyn Error + Send + Sync>> {
//!     Err("quota exceeded".into())
//! }
//!
//! let fault = boxed_error_function().into_fault().unwrap_err();
//! let message = aggregate_typed_messages(walk(Some(&fault))).unwrap();
//! assert_eq!(message, "Error=[quota exceeded]");
//! ```
//!
//! Going the other way needs no conversion trait, as [`Fault`] is itself an
//! error:
//!
//! ```
//! use faultchain::Fault;
//! use std::error::Error;
//!
//! let boxed: Box<dyn Error + Send + Sync> = Fault::new("IoError", "disk full").into();
//! assert_eq!(boxed.to_string(), "disk full");
//! ```

use std::error::Error;

use super::{IntoFault, fault_from_chain};
use crate::Fault;

fn fault_from_boxed(error: &(dyn Error + 'static)) -> Fault {
    fault_from_chain(core::iter::successors(Some(error), |&error| error.source()))
}

impl IntoFault for Box<dyn Error> {
    type Output = Fault;

    fn into_fault(self) -> Self::Output {
        fault_from_boxed(&*self)
    }
}

impl IntoFault for Box<dyn Error + Send + Sync> {
    type Output = Fault;

    fn into_fault(self) -> Self::Output {
        fault_from_boxed(&*self)
    }
}

impl<T> IntoFault for Result<T, Box<dyn Error>> {
    type Output = Result<T, Fault>;

    fn into_fault(self) -> Self::Output {
        self.map_err(IntoFault::into_fault)
    }
}

impl<T> IntoFault for Result<T, Box<dyn Error + Send + Sync>> {
    type Output = Result<T, Fault>;

    fn into_fault(self) -> Self::Output {
        self.map_err(IntoFault::into_fault)
    }
}
