use std::path::PathBuf;

use thiserror::Error;

/// Errors from building or calling a translation backend.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Network or API failure, passed through as text.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend answered, but not with something usable.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// A batch reply omitted a requested key.
    #[error("backend returned no translation for key '{key}'")]
    MissingTranslation { key: String },

    #[error("cannot read instructions file {path}: {source}")]
    Instructions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("environment variable {var} with the backend API key is not set")]
    MissingApiKey { var: String },
}
