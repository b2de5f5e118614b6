#![deny(
    missing_docs,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![forbid(unsafe_code)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Deterministic, single-line summaries of failure chains for logs.
//!
//! ## Overview
//!
//! When an operation fails deep inside a program, the failure usually wraps
//! other failures: a configuration error caused by an I/O error caused by a
//! permission problem. This crate walks such a chain, outermost failure
//! first, and renders it into plain strings that fit on one log line:
//!
//! - the messages of every node ([`aggregate_messages`],
//!   [`aggregate_typed_messages`]),
//! - the key/value data attached to every node ([`aggregate_data`],
//!   [`aggregate_typed_data`]),
//! - the outermost stack trace ([`normalize_stack_trace`]),
//! - the location the failure is being handled at ([`locate_caller`]).
//!
//! [`describe_failure`] produces all of these in one call, and
//! [`full_message`] renders messages, data and trace into a single sentence.
//!
//! ## Quick Example
//!
//! ```
//! use faultchain::{Fault, aggregate_typed_data, aggregate_typed_messages, walk};
//!
//! let fault = Fault::new("ConfigError", "Failed to load configuration")
//!     .attach("path", "/etc/app.toml")
//!     .with_cause(Fault::new("IoError", "permission denied").attach("uid", 1000));
//!
//! assert_eq!(
//!     aggregate_typed_messages(walk(Some(&fault))).unwrap(),
//!     "ConfigError=[Failed to load configuration]::IoError=[permission denied]"
//! );
//! assert_eq!(
//!     aggregate_typed_data(walk(Some(&fault))).unwrap(),
//!     "ConfigError Data=[{path}={/etc/app.toml}]::IoError Data=[{uid}={1000}]"
//! );
//! ```
//!
//! ## Core Concepts
//!
//! The formatters never own the failures they describe. They read them
//! through the [`Failure`] trait, one borrowed node at a time, in the order
//! produced by [`walk`]. [`Fault`] is the owned implementation shipped with
//! the crate; any other type can implement [`Failure`] directly.
//!
//! Attached data lives in an [`AuxData`] collection whose inserts never
//! overwrite: a colliding key is stored as `key-1`, `key-2` and so on (see
//! [`insert_checked`]).
//!
//! Absent inputs are not errors. An absent failure, an empty chain or a
//! missing stack trace each render a fixed sentinel. A [`FormatError`] is only
//! returned when rendering itself goes wrong, and it carries the state of the
//! failed call as its own data.
//!
//! ## Ecosystem
//!
//! - **[`faultchain-backtrace`]** captures [`StackSnapshot`]s of the running
//!   program and formats backtraces the way the aggregators expect them.
//!
//! [`faultchain-backtrace`]: https://docs.rs/faultchain-backtrace
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events at `debug` level when a value is
//! dropped by [`insert_checked`] and when a [`FormatError`] is raised, and at
//! `warn` level when [`walk`] detects a cycle. Install any `tracing`
//! subscriber to see them.

pub mod aux_data;
mod caller;
mod chain;
pub mod compat;
pub mod context;
mod data;
mod describe;
mod error;
mod failure;
mod message;
pub mod prelude;
mod stack_trace;
mod util;

pub use self::{
    aux_data::{AuxData, AuxValue, insert_checked},
    caller::{
        CONSTRUCTOR_METHOD, CallFrame, DiagnosticReport, StackSnapshot, current_thread_id,
        locate_caller, stack_info,
    },
    chain::{Chain, walk},
    data::{aggregate_data, aggregate_typed_data},
    describe::{
        ABSENT_DATA, ABSENT_MESSAGE, ABSENT_STACK_TRACE, FailureInfo, LINE_BREAK_REPLACEMENT,
        describe_failure,
    },
    error::{FormatError, FormatErrorKind},
    failure::{Failure, Fault},
    message::{FullMessageOptions, aggregate_messages, aggregate_typed_messages, full_message},
    stack_trace::{NO_STACK_TRACE, normalize_stack_trace},
};
