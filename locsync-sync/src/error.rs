//! Error types for locsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use locsync_core::ConfigError;
use locsync_formats::FormatError;
use locsync_translate::TranslateError;

/// Why a record file could not be read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("file not found")]
    NotFound,

    #[error(transparent)]
    Io(std::io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ReadError::NotFound
        } else {
            ReadError::Io(err)
        }
    }
}

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured file has no usable format.
    #[error("{path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    /// The source file is missing or unparseable. Always fatal.
    #[error("cannot read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    /// An existing target file is malformed. A missing one is not an error.
    #[error("cannot read {language} target {path}: {source}")]
    TargetRead {
        language: String,
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    /// Translation failed after the individual fallback was exhausted.
    #[error("{language}: translation failed: {source}")]
    Translation {
        language: String,
        #[source]
        source: TranslateError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A per-language task panicked or was cancelled.
    #[error("language task failed: {0}")]
    Join(String),

    /// The run was cancelled before any file was written.
    #[error("run aborted before writing")]
    Aborted,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
