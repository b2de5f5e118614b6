use std::{ops::Range, sync::OnceLock};

use backtrace::BytesOrWideString;
use faultchain::{CallFrame, StackSnapshot};

use crate::SnapshotFilter;

/// Symbols of this module never appear in a snapshot.
const INTERNAL_PREFIX: &str = "faultchain_backtrace::capture::";

struct CapturedFrame {
    frame: CallFrame,
    crate_name: Option<String>,
    symbol: String,
}

/// Captures the current call stack.
///
/// The first frame of the result is the public function that called this
/// one; the frames of the `backtrace` crate and of this module are dropped.
#[inline(never)]
pub(crate) fn snapshot(filter: &SnapshotFilter) -> StackSnapshot {
    let mut initial_filtering = true;
    let mut frames: Vec<CapturedFrame> = Vec::new();
    let mut omitted = 0usize;

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            let Some(name) = symbol.name() else {
                return;
            };
            let symbol_name = format!("{name:#}");
            let path = symbol.filename_raw().map(FramePath::new);
            let crate_name = match &path {
                Some(path) => path.crate_name.clone(),
                None => symbol_crate(&symbol_name).map(str::to_owned),
            };

            if initial_filtering {
                let skipped_crate = crate_name
                    .as_deref()
                    .is_some_and(|name| filter.skipped_initial_crates.contains(&name));
                if skipped_crate || symbol_name.starts_with(INTERNAL_PREFIX) {
                    omitted += 1;
                    return;
                }
                initial_filtering = false;
            }

            if frames.len() >= filter.max_frame_count {
                omitted += 1;
                return;
            }

            let (declaring_type_name, method) = split_symbol(&symbol_name);
            let source_file = path.map(|path| path.display(filter.show_full_path));
            frames.push(CapturedFrame {
                frame: CallFrame {
                    declaring_type_name: declaring_type_name.to_owned(),
                    method_signature: method.to_owned(),
                    source_file,
                    line_number: symbol.lineno(),
                    column_number: symbol.colno(),
                },
                crate_name,
                symbol: symbol_name,
            });
        });

        true
    });

    while let Some(last) = frames.last() {
        let runtime_crate = last
            .crate_name
            .as_deref()
            .is_some_and(|name| filter.skipped_final_crates.contains(&name));
        let libc_entry = matches!(
            last.symbol.as_str(),
            "__libc_start_call_main" | "__libc_start_main_impl" | "_start" | "main"
        );
        if runtime_crate || libc_entry {
            omitted += 1;
            frames.pop();
        } else {
            break;
        }
    }

    tracing::trace!(frames = frames.len(), omitted, "stack snapshot captured");
    frames.into_iter().map(|captured| captured.frame).collect()
}

/// The crate a demangled symbol belongs to, from its first path segment.
/// Only consulted for frames without a source path.
///
/// `<my_app::Config as core::default::Default>::default` belongs to
/// `my_app`.
pub(crate) fn symbol_crate(symbol: &str) -> Option<&str> {
    let path = symbol.trim_start_matches('<');
    let first = path.split("::").next()?;
    let mut chars = first.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c == '_' || unicode_ident::is_xid_start(c))
        && chars.all(unicode_ident::is_xid_continue);
    (valid && first.len() < path.len()).then_some(first)
}

/// Splits a demangled symbol into the path that declares the function and
/// the function's own name.
///
/// `my_app::jobs::Importer::run` splits into `my_app::jobs::Importer` and
/// `run`. Generic arguments after the name are dropped.
pub(crate) fn split_symbol(symbol: &str) -> (&str, &str) {
    let name = function_name_range(symbol);
    let declaring = symbol[..name.start].trim_end_matches("::");
    (declaring, &symbol[name])
}

/// The byte range of the last identifier (or `{...}` block) that is not
/// nested inside generic arguments.
fn function_name_range(s: &str) -> Range<usize> {
    let mut word_start = 0usize;
    let mut word_end = 0usize;
    let mut angle_nesting_level = 0u64;
    let mut curly_nesting_level = 0u64;
    let mut potential_function_arrow = false;
    let mut inside_word = false;

    for (i, c) in s.char_indices() {
        if curly_nesting_level == 0 && angle_nesting_level == 0 {
            if !inside_word && (c == '_' || unicode_ident::is_xid_start(c)) {
                word_start = i;
                inside_word = true;
            } else if inside_word && !unicode_ident::is_xid_continue(c) {
                word_end = i;
                inside_word = false;
            }
        }

        let was_potential_function_arrow = potential_function_arrow;
        potential_function_arrow = c == '-';

        if c == '<' {
            angle_nesting_level = angle_nesting_level.saturating_add(1);
        } else if c == '>' && !was_potential_function_arrow {
            angle_nesting_level = angle_nesting_level.saturating_sub(1);
        } else if c == '{' {
            curly_nesting_level = curly_nesting_level.saturating_add(1);
            if !inside_word && curly_nesting_level == 1 && angle_nesting_level == 0 {
                word_start = i;
                inside_word = true;
            }
        } else if c == '}' {
            curly_nesting_level = curly_nesting_level.saturating_sub(1);
            if inside_word && curly_nesting_level == 0 {
                word_end = i + 1;
                inside_word = false;
            }
        }
    }

    if inside_word || word_start >= word_end {
        word_start..s.len()
    } else {
        word_start..word_end
    }
}

#[derive(Debug)]
pub(crate) struct FramePath {
    raw_path: String,
    crate_name: Option<String>,
    suffix: Option<String>,
}

impl FramePath {
    pub(crate) fn new(path: BytesOrWideString<'_>) -> Self {
        static REGEXES: OnceLock<Option<[regex::Regex; 2]>> = OnceLock::new();
        let regexes = REGEXES.get_or_init(|| {
            // Rust standard library paths:
            // - /lib/rustlib/src/rust/library/{std|core|alloc|test}/src/...
            // - /rustc/{40-char-hash}/library/{std|core|alloc|test}/src/...
            let std_regex = regex::Regex::new(
                r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc|test)/src/.*$",
            );
            // Cargo registry paths:
            // - /.cargo/registry/src/{index}-{16-char-hash}/{crate}-{version}/src/...
            let registry_regex = regex::Regex::new(
                r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
            );
            match (std_regex, registry_regex) {
                (Ok(std_regex), Ok(registry_regex)) => Some([std_regex, registry_regex]),
                (Err(error), _) | (_, Err(error)) => {
                    tracing::warn!(%error, "frame path patterns unavailable");
                    None
                }
            }
        });

        let raw_path = path.to_str_lossy().into_owned();
        let split = regexes.iter().flatten().find_map(|regex| {
            let crate_capture = regex.captures(&raw_path)?.get(1)?;
            Some((
                crate_capture.as_str().replace('-', "_"),
                raw_path[crate_capture.start()..].to_owned(),
            ))
        });

        match split {
            Some((crate_name, suffix)) => Self {
                raw_path,
                crate_name: Some(crate_name),
                suffix: Some(suffix),
            },
            None => Self {
                raw_path,
                crate_name: None,
                suffix: None,
            },
        }
    }

    fn display(self, show_full_path: bool) -> String {
        match self.suffix {
            Some(suffix) if !show_full_path => suffix,
            _ => self.raw_path,
        }
    }

    #[cfg(test)]
    fn crate_name(&self) -> Option<&str> {
        self.crate_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_symbol() {
        assert_eq!(
            split_symbol("my_app::jobs::Importer::run"),
            ("my_app::jobs::Importer", "run")
        );
        assert_eq!(
            split_symbol("<my_app::Config as core::default::Default>::default"),
            ("<my_app::Config as core::default::Default>", "default")
        );
        assert_eq!(split_symbol("my_app::main::{{closure}}"), ("my_app::main", "{{closure}}"));
        assert_eq!(
            split_symbol("my_app::parse::<alloc::string::String>"),
            ("my_app", "parse")
        );
        assert_eq!(split_symbol("main"), ("", "main"));
    }

    #[test]
    fn test_symbol_crate() {
        assert_eq!(symbol_crate("my_app::jobs::run"), Some("my_app"));
        assert_eq!(
            symbol_crate("<faultchain::Fault as faultchain_backtrace::FaultBacktraceExt>::x"),
            Some("faultchain")
        );
        assert_eq!(symbol_crate("__libc_start_main_impl"), None);
        assert_eq!(symbol_crate("_start"), None);
    }

    #[test]
    fn test_frame_path_std() {
        let path = FramePath::new(BytesOrWideString::Bytes(
            b"/rustc/0123456789abcdef0123456789abcdef01234567/library/std/src/rt.rs",
        ));
        assert_eq!(path.crate_name(), Some("std"));
        assert_eq!(path.display(false), "std/src/rt.rs");
    }

    #[test]
    fn test_frame_path_registry() {
        let raw = "/home/u/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f/tokio-util-0.7.16/src/task.rs";
        let path = FramePath::new(BytesOrWideString::Bytes(raw.as_bytes()));
        assert_eq!(path.crate_name(), Some("tokio_util"));
        assert_eq!(path.display(true), raw);
    }

    #[test]
    fn test_frame_path_local() {
        let path = FramePath::new(BytesOrWideString::Bytes(b"src/main.rs"));
        assert_eq!(path.crate_name(), None);
        assert_eq!(path.display(false), "src/main.rs");
    }
}
