//! Caller location metadata.
//!
//! The functions in this module work on a [`StackSnapshot`] of the *current*
//! call stack, captured by the caller at the moment of the request (the
//! `faultchain-backtrace` crate provides a capturing implementation). Frame
//! `0` of a snapshot is the function that captured it; frame `1` is that
//! function's caller.

use std::{
    borrow::Cow,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::error::{FormatError, FormatErrorKind};

/// Method name used for constructors in frames produced by managed runtimes.
pub const CONSTRUCTOR_METHOD: &str = ".ctor";

/// One entry of a captured call stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallFrame {
    /// Full name of the type (or module) declaring the method.
    pub declaring_type_name: String,
    /// The method's signature or name.
    pub method_signature: String,
    /// The source file, if debug information was available.
    pub source_file: Option<String>,
    /// The line number, if debug information was available.
    pub line_number: Option<u32>,
    /// The column number, if debug information was available.
    pub column_number: Option<u32>,
}

impl CallFrame {
    /// Creates a frame without source location information.
    pub fn new(declaring_type_name: impl Into<String>, method_signature: impl Into<String>) -> Self {
        Self {
            declaring_type_name: declaring_type_name.into(),
            method_signature: method_signature.into(),
            ..Self::default()
        }
    }

    /// Sets the source location.
    #[must_use]
    pub fn at(mut self, source_file: impl Into<String>, line: u32, column: u32) -> Self {
        self.source_file = Some(source_file.into());
        self.line_number = Some(line);
        self.column_number = Some(column);
        self
    }

    /// The last path segment of the declaring type, without generic
    /// arguments: `Parser` for `my_app::parse::Parser<'a>`.
    pub fn declaring_type_simple_name(&self) -> &str {
        simple_type_name(&self.declaring_type_name)
    }
}

/// A captured call stack, innermost frame first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackSnapshot {
    /// The frames, index `0` being the function that captured the snapshot.
    pub frames: Vec<CallFrame>,
}

impl StackSnapshot {
    /// Creates a snapshot from frames ordered innermost first.
    pub fn new(frames: Vec<CallFrame>) -> Self {
        Self { frames }
    }

    /// The frame of the function that called the capturing function, or the
    /// capturing function itself when the snapshot has a single frame.
    pub fn caller_frame(&self) -> Option<&CallFrame> {
        self.frames.get(1).or_else(|| self.frames.first())
    }
}

impl FromIterator<CallFrame> for StackSnapshot {
    fn from_iter<I: IntoIterator<Item = CallFrame>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Where a failure was caught.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DiagnosticReport {
    /// The simple name of the calling frame's declaring type.
    pub caller_module: String,
    /// The calling method, with constructor names rewritten.
    pub caller_method: String,
    /// The calling frame's line number, `0` when unknown.
    pub caller_line_number: u32,
    /// Identifier of the thread that produced the report.
    pub executing_thread_id: u64,
}

/// Identifies the immediate caller in a stack snapshot.
///
/// Frame `1` is used when the snapshot has at least two frames, frame `0`
/// otherwise. A snapshot without frames is a [`FormatError`] of kind
/// [`MissingFrame`](FormatErrorKind::MissingFrame).
///
/// ```
/// use faultchain::{CallFrame, StackSnapshot, locate_caller};
///
/// let snapshot = StackSnapshot::new(vec![
///     CallFrame::new("app::report::Reporter", "capture"),
///     CallFrame::new("app::jobs::Importer", ".ctor").at("src/jobs.rs", 88, 17),
/// ]);
/// let report = locate_caller(&snapshot).unwrap();
/// assert_eq!(report.caller_module, "Importer");
/// assert_eq!(report.caller_method, "Default Constructor");
/// assert_eq!(report.caller_line_number, 88);
/// ```
pub fn locate_caller(snapshot: &StackSnapshot) -> Result<DiagnosticReport, FormatError> {
    let executing_thread_id = current_thread_id();
    let Some(frame) = snapshot.caller_frame() else {
        return Err(
            FormatError::new("locate_caller", FormatErrorKind::MissingFrame)
                .record("frame_count", snapshot.frames.len()),
        );
    };

    Ok(DiagnosticReport {
        caller_module: frame.declaring_type_simple_name().to_owned(),
        caller_method: rewrite_constructor(&frame.method_signature).into_owned(),
        caller_line_number: frame.line_number.unwrap_or(0),
        executing_thread_id,
    })
}

/// Renders a frame as `Type::method() @ Line [n], Column [c]`.
///
/// A `.ctor` method name is replaced by the declaring type's simple name.
/// Unknown line and column numbers render as `0`. An absent frame renders as
/// an empty string.
///
/// ```
/// use faultchain::{CallFrame, stack_info};
///
/// let frame = CallFrame::new("app::Loader", "load").at("src/loader.rs", 12, 5);
/// assert_eq!(stack_info(Some(&frame)), "app::Loader::load() @ Line [12], Column [5]");
/// ```
pub fn stack_info(frame: Option<&CallFrame>) -> String {
    let Some(frame) = frame else {
        return String::new();
    };
    let method = frame
        .method_signature
        .replace(CONSTRUCTOR_METHOD, frame.declaring_type_simple_name());
    format!(
        "{}::{}() @ Line [{}], Column [{}]",
        frame.declaring_type_name,
        method,
        frame.line_number.unwrap_or(0),
        frame.column_number.unwrap_or(0)
    )
}

/// The two constructor rewrites: a bare `.ctor` becomes
/// `Default Constructor`, and `Void .ctor` is removed from longer signatures.
fn rewrite_constructor(method: &str) -> Cow<'_, str> {
    if method == CONSTRUCTOR_METHOD {
        Cow::Borrowed("Default Constructor")
    } else if method.contains("Void .ctor") {
        Cow::Owned(method.replace("Void .ctor", ""))
    } else {
        Cow::Borrowed(method)
    }
}

/// Reduces a type path to its last segment, without generic arguments.
///
/// Handles Rust paths (`a::b::C<T>`), qualified paths
/// (`<a::C as Trait>`) and dotted managed names (`Ns.Type`).
pub(crate) fn simple_type_name(full: &str) -> &str {
    let mut name = full.trim();
    if let Some(inner) = name.strip_prefix('<') {
        name = inner.split(" as ").next().unwrap_or(inner);
        name = name.strip_suffix('>').unwrap_or(name);
    }
    if let Some(generics) = name.find('<').filter(|&start| start > 0) {
        name = &name[..generics];
    }
    let name = name.rsplit("::").next().unwrap_or(name);
    name.rsplit('.').next().unwrap_or(name)
}

/// A small, process-unique identifier for the current thread.
///
/// Identifiers are handed out in the order threads first ask for one,
/// starting at `1`. Returns `0` when called while the thread is being torn
/// down.
pub fn current_thread_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static THREAD_ID: u64 = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    }
    THREAD_ID.try_with(|id| *id).unwrap_or(0)
}
