//! Filesystem path to `file://` URI conversion.

use std::path::Path;

use lsp_types::Uri;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use super::Result;
use super::error::LspError;

/// Characters that must be escaped inside a URI path segment. `/` is kept
/// as the segment separator.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Convert a filesystem path to a `file://` URI.
///
/// The path is canonicalized first, so it must exist. On Unix this yields
/// URIs like `file:///home/user/project/src/Main.java`; on Windows the
/// drive letter is preserved as `file:///C:/...`.
///
/// # Errors
///
/// Returns [`LspError::InvalidPath`] if the path cannot be canonicalized,
/// is not valid UTF-8, or produces an unparseable URI.
pub fn path_to_uri(path: &Path) -> Result<Uri> {
    let absolute_path = path.canonicalize().map_err(|e| {
        LspError::InvalidPath(format!(
            "cannot canonicalize path '{}': {e}",
            path.display()
        ))
    })?;

    let path_str = absolute_path.to_str().ok_or_else(|| {
        LspError::InvalidPath(format!("path contains invalid UTF-8: {}", path.display()))
    })?;

    #[cfg(windows)]
    let escaped = utf8_percent_encode(&path_str.replace('\\', "/"), PATH_SEGMENT).to_string();
    #[cfg(windows)]
    let uri_string = format!("file:///{escaped}");

    #[cfg(not(windows))]
    let escaped = utf8_percent_encode(path_str, PATH_SEGMENT).to_string();
    #[cfg(not(windows))]
    let uri_string = format!("file://{escaped}");

    uri_string
        .parse()
        .map_err(|e| LspError::InvalidPath(format!("invalid URI '{uri_string}': {e}")))
}
