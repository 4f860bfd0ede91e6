use std::path::PathBuf;

use locsync_core::FormatTag;
use thiserror::Error;

/// Errors from reading or rendering a record file.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{format} parse error at line {line}: {message}")]
    Parse {
        format: FormatTag,
        line: usize,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to render {format}: {message}")]
    Render { format: FormatTag, message: String },

    #[error("cannot infer format for {path}; set `format` to csv, properties or js")]
    UnknownFormat { path: PathBuf },
}

pub(crate) fn parse_err(format: FormatTag, line: usize, message: impl Into<String>) -> FormatError {
    FormatError::Parse {
        format,
        line,
        message: message.into(),
    }
}
