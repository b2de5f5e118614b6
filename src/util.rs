use crate::{error::FormatError, failure::Failure};

/// Separator placed between the renderings of consecutive chain nodes.
pub(crate) const NODE_SEPARATOR: &str = "::";

/// Renders every node with `render`, separating nodes with
/// [`NODE_SEPARATOR`], then trims the result and strips one trailing
/// separator.
pub(crate) fn render_chain<'a, I, F>(chain: I, render: F) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a dyn Failure>,
    F: FnMut(&mut String, &'a dyn Failure) -> Result<(), FormatError>,
{
    let out = render_nodes(chain, render)?;
    Ok(finish(&out).to_owned())
}

/// Like [`render_chain`], but leaves the joined text untouched.
pub(crate) fn render_nodes<'a, I, F>(chain: I, mut render: F) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a dyn Failure>,
    F: FnMut(&mut String, &'a dyn Failure) -> Result<(), FormatError>,
{
    let mut out = String::new();
    for (index, node) in chain.into_iter().enumerate() {
        if index > 0 {
            out.push_str(NODE_SEPARATOR);
        }
        render(&mut out, node)?;
    }
    Ok(out)
}

/// Trims `rendered` and strips one trailing [`NODE_SEPARATOR`].
pub(crate) fn finish(rendered: &str) -> &str {
    let trimmed = rendered.trim();
    trimmed.strip_suffix(NODE_SEPARATOR).unwrap_or(trimmed)
}
