#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
//! Stack capture for [`faultchain`].
//!
//! The [`faultchain`] formatters read call stacks that someone else captured:
//! [`locate_caller`] and [`stack_info`](faultchain::stack_info) take a
//! [`StackSnapshot`], and [`normalize_stack_trace`](faultchain::normalize_stack_trace)
//! reads the text stored on a failure. This crate captures both from the
//! running program using the [`backtrace`] crate.
//!
//! ## Quick Start
//!
//! ```
//! use faultchain::{Fault, normalize_stack_trace};
//! use faultchain_backtrace::FaultBacktraceExt;
//!
//! fn load() -> Result<(), Fault> {
//!     Err(Fault::new("LoadError", "settings file is empty")).with_captured_stack_trace()
//! }
//!
//! let fault = load().unwrap_err();
//! assert!(normalize_stack_trace(Some(&fault)).starts_with("[at "));
//! ```
//!
//! Finding out who is handling a failure:
//!
//! ```
//! fn handle(error: &dyn std::error::Error) -> u32 {
//!     let report = faultchain_backtrace::caller_report().unwrap();
//!     report.caller_line_number
//! }
//! # let _ = handle(&std::fmt::Error);
//! ```
//!
//! ## Snapshot Layout
//!
//! Every capturing function of this crate places *itself* at index `0` of the
//! snapshot and its caller at index `1`, matching what
//! [`locate_caller`] expects. Frames of the [`backtrace`] crate and of the
//! standard library below them are never included.
//!
//! ## Filtering
//!
//! [`SnapshotFilter`] controls which frames are kept:
//!
//! - frames of the standard library and of async runtimes at the bottom of
//!   the stack are dropped
//! - at most [`max_frame_count`](SnapshotFilter::max_frame_count) frames are
//!   kept
//! - source paths inside the Rust sources or the cargo registry are
//!   shortened to `crate-version/src/...` unless
//!   [`show_full_path`](SnapshotFilter::show_full_path) is set
//!
//! ### Environment Variables
//!
//! [`SnapshotFilter::from_env`] reads:
//!
//! - `RUST_BACKTRACE=full` - keep every frame and show full paths
//! - `FAULTCHAIN_BACKTRACE` - comma-separated options:
//!   - `full` - keep every frame, like `RUST_BACKTRACE=full`
//!   - `full_paths` - show full source paths but keep filtering
//!
//! The variables are read once and cached for the rest of the process.
//!
//! ## Debugging Symbols
//!
//! Stack traces need debug symbols to show file names and line numbers. In
//! release builds, enable them in `Cargo.toml`:
//!
//! ```toml
//! [profile.release]
//! strip = false
//! debug = "line-tables-only"
//! ```

use std::{fmt, sync::OnceLock};

use faultchain::{
    CallFrame, DiagnosticReport, Failure, FailureInfo, Fault, FormatError, StackSnapshot,
    describe_failure, locate_caller,
};

mod capture;

/// Controls which frames a captured snapshot keeps.
#[derive(Copy, Clone, Debug)]
pub struct SnapshotFilter {
    /// Crates whose frames are dropped from the top of the stack, until the
    /// first frame of another crate is seen.
    pub skipped_initial_crates: &'static [&'static str],
    /// Crates whose frames are dropped from the bottom of the stack.
    pub skipped_final_crates: &'static [&'static str],
    /// The maximum number of frames kept.
    pub max_frame_count: usize,
    /// Whether source paths are kept in full instead of being shortened.
    pub show_full_path: bool,
}

impl SnapshotFilter {
    /// Drops the capture machinery and the runtime entry frames, and keeps at
    /// most 32 frames with shortened paths.
    pub const DEFAULT: Self = Self {
        skipped_initial_crates: &["backtrace", "core", "std", "alloc"],
        skipped_final_crates: &["std", "core", "alloc", "tokio", "test"],
        max_frame_count: 32,
        show_full_path: false,
    };

    /// Keeps every frame below the capture machinery.
    pub const FULL: Self = Self {
        skipped_initial_crates: &["backtrace", "core", "std", "alloc"],
        skipped_final_crates: &[],
        max_frame_count: usize::MAX,
        show_full_path: true,
    };

    /// The filter selected by the `RUST_BACKTRACE` and
    /// `FAULTCHAIN_BACKTRACE` environment variables.
    pub fn from_env() -> Self {
        let options = EnvOptions::get();
        let filter = if options.full {
            Self::FULL
        } else {
            Self::DEFAULT
        };
        Self {
            show_full_path: options.show_full_path,
            ..filter
        }
    }
}

impl Default for SnapshotFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
struct EnvOptions {
    full: bool,
    show_full_path: bool,
}

impl EnvOptions {
    fn get() -> &'static Self {
        static OPTIONS: OnceLock<EnvOptions> = OnceLock::new();

        OPTIONS.get_or_init(|| {
            let rust_backtrace_full =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut options = EnvOptions {
                full: rust_backtrace_full,
                show_full_path: rust_backtrace_full,
            };
            if let Some(var) = std::env::var_os("FAULTCHAIN_BACKTRACE") {
                for v in var.to_string_lossy().split(',') {
                    let v = v.trim();
                    if v.eq_ignore_ascii_case("full") {
                        options.full = true;
                        options.show_full_path = true;
                    } else if v.eq_ignore_ascii_case("full_paths") {
                        options.show_full_path = true;
                    }
                }
            }
            tracing::debug!(?options, "backtrace options read from the environment");
            options
        })
    }
}

/// Captures the current call stack using [`SnapshotFilter::from_env`].
///
/// Frame `0` of the result is this function, frame `1` its caller.
#[inline(never)]
pub fn capture_snapshot() -> StackSnapshot {
    capture::snapshot(&SnapshotFilter::from_env())
}

/// Captures the current call stack using `filter`.
///
/// Frame `0` of the result is this function, frame `1` its caller.
#[inline(never)]
pub fn capture_snapshot_with_filter(filter: &SnapshotFilter) -> StackSnapshot {
    capture::snapshot(filter)
}

/// Reports the function that called this one, with its line and the current
/// thread.
#[inline(never)]
pub fn caller_report() -> Result<DiagnosticReport, FormatError> {
    locate_caller(&capture::snapshot(&SnapshotFilter::from_env()))
}

/// Renders the location of the function that called this one as
/// `Type::method() @ Line [n], Column [c]`.
#[inline(never)]
pub fn stack_info() -> String {
    let snapshot = capture::snapshot(&SnapshotFilter::from_env());
    faultchain::stack_info(snapshot.caller_frame())
}

/// [`describe_failure`] for the function that called this one.
#[inline(never)]
pub fn describe_failure_here(failure: Option<&dyn Failure>) -> Result<FailureInfo, FormatError> {
    let snapshot = capture::snapshot(&SnapshotFilter::from_env());
    describe_failure(failure, Some(&snapshot))
}

/// Renders frames in the line-per-frame text format stored on failures.
///
/// Each frame renders as `   at path::method in file:line n`. The file part
/// is left out when it is unknown, and the line part when the line is.
///
/// ```
/// use faultchain::CallFrame;
/// use faultchain_backtrace::RenderedTrace;
///
/// let frames = [
///     CallFrame::new("app::jobs::Importer", "run").at("src/jobs.rs", 41, 9),
///     CallFrame::new("app", "main"),
/// ];
/// assert_eq!(
///     RenderedTrace(&frames).to_string(),
///     "   at app::jobs::Importer::run in src/jobs.rs:line 41\n   at app::main"
/// );
/// ```
#[derive(Copy, Clone, Debug)]
pub struct RenderedTrace<'a>(pub &'a [CallFrame]);

impl fmt::Display for RenderedTrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, frame) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            f.write_str("   at ")?;
            if !frame.declaring_type_name.is_empty() {
                write!(f, "{}::", frame.declaring_type_name)?;
            }
            f.write_str(&frame.method_signature)?;
            if let Some(file) = &frame.source_file {
                write!(f, " in {file}")?;
                if let Some(line) = frame.line_number {
                    write!(f, ":line {line}")?;
                }
            }
        }
        Ok(())
    }
}

/// Renders a snapshot as stack trace text, leaving out frame `0`.
pub fn render_trace(snapshot: &StackSnapshot) -> String {
    let frames = snapshot.frames.get(1..).unwrap_or_default();
    RenderedTrace(frames).to_string()
}

/// Records the current call stack as the stack trace of a [`Fault`].
pub trait FaultBacktraceExt: Sized {
    /// Replaces the fault's stack trace with the current call stack, using
    /// [`SnapshotFilter::from_env`].
    fn with_captured_stack_trace(self) -> Self;

    /// Replaces the fault's stack trace with the current call stack, using
    /// `filter`.
    fn with_captured_stack_trace_filter(self, filter: &SnapshotFilter) -> Self;
}

impl FaultBacktraceExt for Fault {
    #[inline(never)]
    fn with_captured_stack_trace(self) -> Self {
        let trace = render_trace(&capture::snapshot(&SnapshotFilter::from_env()));
        self.with_stack_trace(trace)
    }

    #[inline(never)]
    fn with_captured_stack_trace_filter(self, filter: &SnapshotFilter) -> Self {
        let trace = render_trace(&capture::snapshot(filter));
        self.with_stack_trace(trace)
    }
}

impl<T> FaultBacktraceExt for Result<T, Fault> {
    #[inline(never)]
    fn with_captured_stack_trace(self) -> Self {
        match self {
            Ok(value) => Ok(value),
            Err(fault) => {
                let trace = render_trace(&capture::snapshot(&SnapshotFilter::from_env()));
                Err(fault.with_stack_trace(trace))
            }
        }
    }

    #[inline(never)]
    fn with_captured_stack_trace_filter(self, filter: &SnapshotFilter) -> Self {
        match self {
            Ok(value) => Ok(value),
            Err(fault) => Err(fault.with_stack_trace(render_trace(&capture::snapshot(filter)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_copy() {
        static_assertions::assert_impl_all!(SnapshotFilter: Copy, Send, Sync);
        static_assertions::assert_impl_all!(RenderedTrace<'static>: Copy, Send, Sync);
    }

    #[test]
    fn test_render_trace_skips_capturing_frame() {
        let snapshot = StackSnapshot::new(vec![
            CallFrame::new("faultchain_backtrace", "capture_snapshot"),
            CallFrame::new("app::Loader", "load").at("src/loader.rs", 12, 5),
        ]);
        assert_eq!(render_trace(&snapshot), "   at app::Loader::load in src/loader.rs:line 12");
        assert_eq!(render_trace(&StackSnapshot::default()), "");
    }

    #[test]
    fn test_render_without_line() {
        let frame = CallFrame {
            source_file: Some("src/lib.rs".to_owned()),
            ..CallFrame::new("", "main")
        };
        assert_eq!(RenderedTrace(&[frame]).to_string(), "   at main in src/lib.rs");
    }

    #[test]
    fn test_default_filter() {
        let filter = SnapshotFilter::default();
        assert_eq!(filter.max_frame_count, 32);
        assert!(!filter.show_full_path);
        assert!(SnapshotFilter::FULL.skipped_final_crates.is_empty());
    }
}
