//! locsync core library: record types, content hashing, configuration and errors.
//!
//! Public API surface:
//! - [`types`]: source/target records, candidates, format tags
//! - [`hash`]: the content fingerprint used for staleness detection
//! - [`config`]: validated, immutable run configuration
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{
    find_config_in, starter_config, BackendConfig, BatchSize, Config, OutputSpec, RawBackend,
    RawConfig, RawOutput, RawSource, RawTarget, SourceSpec, TargetSpec, CONFIG_FILE_NAMES,
};
pub use error::{ConfigError, ValidationError};
pub use hash::content_hash;
pub use types::{
    build_source_map, BatchRequest, Candidate, ContentHash, FormatTag, SourceMap, SourceRecord,
    TargetRecord,
};
