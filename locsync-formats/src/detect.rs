//! Format detection.
//!
//! An explicit tag always wins. Otherwise the file extension decides;
//! checks are case-insensitive.

use std::path::Path;

use locsync_core::FormatTag;

use crate::FormatError;

/// Pick the format for `path`.
///
/// Returns `FormatError::UnknownFormat` when no tag is given and the
/// extension is not recognised.
pub fn detect_format(path: &Path, explicit: Option<FormatTag>) -> Result<FormatTag, FormatError> {
    if let Some(tag) = explicit {
        return Ok(tag);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("csv") => Ok(FormatTag::Csv),
        Some("properties") => Ok(FormatTag::Properties),
        Some("js") | Some("mjs") | Some("cjs") | Some("ts") => Ok(FormatTag::Js),
        _ => Err(FormatError::UnknownFormat {
            path: path.to_path_buf(),
        }),
    }
}
