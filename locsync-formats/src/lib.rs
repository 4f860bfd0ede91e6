//! Record codecs for `locsync`.
//!
//! [`detect_format`] picks a [`FormatTag`] for a file; [`codec`] returns the
//! [`RecordFormat`] implementation for a tag. Codecs are pure: they turn
//! file contents into records and back, and never touch the filesystem.

mod delimited;
mod detect;
mod error;
mod js_module;
mod properties;

use locsync_core::{ContentHash, FormatTag, SourceRecord, TargetRecord};

pub use delimited::CsvFormat;
pub use detect::detect_format;
pub use error::FormatError;
pub use js_module::JsModuleFormat;
pub use properties::PropertiesFormat;

/// Comment prefix that carries a target record's stored hash in
/// comment-based formats (`# hash: 1a2b3c4d`, `// hash: 1a2b3c4d`).
pub const HASH_MARKER: &str = "hash:";

/// Read/write capability for one on-disk representation.
pub trait RecordFormat: Send + Sync {
    fn tag(&self) -> FormatTag;

    fn parse_source(&self, content: &str) -> Result<Vec<SourceRecord>, FormatError>;

    fn parse_target(&self, content: &str) -> Result<Vec<TargetRecord>, FormatError>;

    /// Render records in the order given, ending with a newline.
    fn render_source(&self, records: &[SourceRecord]) -> Result<String, FormatError>;

    /// Render records in the order given, ending with a newline.
    fn render_target(&self, records: &[TargetRecord]) -> Result<String, FormatError>;
}

/// The codec for `tag`.
pub fn codec(tag: FormatTag) -> &'static dyn RecordFormat {
    match tag {
        FormatTag::Csv => &CsvFormat,
        FormatTag::Properties => &PropertiesFormat,
        FormatTag::Js => &JsModuleFormat,
    }
}

// ---------------------------------------------------------------------------
// Shared helpers for comment-carrying formats
// ---------------------------------------------------------------------------

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Pull the stored hash out of pending comment lines. The last marker wins.
fn hash_from_comments(comments: &[String]) -> ContentHash {
    comments
        .iter()
        .rev()
        .find_map(|c| c.strip_prefix(HASH_MARKER))
        .map(|h| ContentHash::from(h.trim()))
        .unwrap_or_else(|| ContentHash::from(""))
}

/// Comment lines of a description; an empty description has none.
fn description_lines(description: &str) -> impl Iterator<Item = &str> {
    description.split('\n').filter(move |_| !description.is_empty())
}
