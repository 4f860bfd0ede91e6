use thiserror::Error;

/// Error surface for watch mode.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Config(#[from] locsync_core::ConfigError),
}
