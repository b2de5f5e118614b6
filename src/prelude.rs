//! Commonly used items for convenient importing.
//!
//! ```rust
//! use faultchain::prelude::*;
//!
//! let fault = Fault::new("TimeoutError", "upstream did not answer")
//!     .attach("upstream", "billing")
//!     .with_stack_trace("at billing::charge");
//! let summary = full_message(Some(&fault), FullMessageOptions::EVERYTHING).unwrap();
//! assert_eq!(
//!     summary,
//!     "upstream did not answer; Data=[{upstream}={billing}]; Stack Trace=[at billing::charge]."
//! );
//! ```
//!
//! # What's Included
//!
//! - **[`Fault`]** and **[`Failure`]**: the owned chain type and the view
//!   every formatter reads
//! - **[`walk`]** and **[`Chain`]**: chain traversal
//! - The aggregators, **[`full_message`]** and **[`describe_failure`]**
//! - **[`IntoFault`]**: conversions from other error libraries

pub use crate::{
    AuxValue, Chain, Failure, Fault, FormatError, FullMessageOptions, aggregate_data,
    aggregate_messages, aggregate_typed_data, aggregate_typed_messages, compat::IntoFault,
    describe_failure, full_message, walk,
};
