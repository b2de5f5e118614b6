//! Consolidated auxiliary data.
//!
//! Each node's entries render as `{key}={value}` in insertion order, joined
//! with `|` and wrapped as `Data=[...]`. A node without entries renders
//! `Data=[None]`. Nodes are joined with `::`, outermost first.
//!
//! Whether data is wanted at all is the caller's decision: these functions
//! always render it.

use core::fmt::Write;

use crate::{
    error::{FormatError, FormatErrorKind},
    failure::Failure,
    util::render_chain,
};

/// Renders the attached data of every node of a chain as `Data=[...]`.
///
/// ```
/// use faultchain::{Chain, Fault, aggregate_data};
///
/// let fault = Fault::new("Exception", "Topmost exception message")
///     .attach("Outer Data 1", 1234)
///     .attach("Outer Data 2", "Simple PIN number");
/// assert_eq!(
///     aggregate_data(Chain::new(&fault)).unwrap(),
///     "Data=[{Outer Data 1}={1234}|{Outer Data 2}={Simple PIN number}]"
/// );
/// ```
pub fn aggregate_data<'a, I>(chain: I) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a dyn Failure>,
{
    render_chain(chain, |out, node| write_node(out, node, false, "aggregate_data"))
}

/// Renders the attached data of every node of a chain as
/// `TypeName Data=[...]`.
pub fn aggregate_typed_data<'a, I>(chain: I) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a dyn Failure>,
{
    render_chain(chain, |out, node| {
        write_node(out, node, true, "aggregate_typed_data")
    })
}

fn write_node(
    out: &mut String,
    node: &dyn Failure,
    typed: bool,
    operation: &'static str,
) -> Result<(), FormatError> {
    if typed {
        out.push_str(node.type_name());
        out.push(' ');
    }
    out.push_str("Data=[");
    if !write_entries(out, node, operation)? {
        out.push_str("None");
    }
    out.push(']');
    Ok(())
}

/// Writes a node's entries as `{key}={value}|...`.
///
/// Returns `false` if the node has no entries and nothing was written.
pub(crate) fn write_entries(
    out: &mut String,
    node: &dyn Failure,
    operation: &'static str,
) -> Result<bool, FormatError> {
    let Some(data) = node.aux_data().filter(|data| !data.is_empty()) else {
        return Ok(false);
    };

    for (index, (key, value)) in data.iter().enumerate() {
        if index > 0 {
            out.push('|');
        }
        write!(out, "{{{key}}}={{{value}}}").map_err(|_| {
            FormatError::new(operation, FormatErrorKind::Render)
                .record("failure", node.type_name())
                .record("key", key)
        })?;
    }
    Ok(true)
}
