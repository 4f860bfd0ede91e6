//! Format resolution for every file a run touches, done before any I/O.

use std::path::PathBuf;

use locsync_core::{Config, FormatTag, OutputSpec, TargetSpec};
use locsync_formats::detect_format;

use crate::SyncError;

/// A secondary output with its format settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub file: PathBuf,
    pub format: FormatTag,
}

/// A target language with its file formats settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub spec: TargetSpec,
    pub format: FormatTag,
    pub outputs: Vec<ResolvedOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub source_format: FormatTag,
    pub source_outputs: Vec<ResolvedOutput>,
    pub targets: Vec<ResolvedTarget>,
}

impl RunPlan {
    /// Settle the format of the source, every target and every output.
    /// Fails on the first file whose format cannot be determined.
    pub fn resolve(config: &Config) -> Result<Self, SyncError> {
        let targets = config
            .targets
            .iter()
            .map(|spec| {
                Ok(ResolvedTarget {
                    format: resolve(&spec.file, spec.format)?,
                    outputs: resolve_outputs(&spec.outputs)?,
                    spec: spec.clone(),
                })
            })
            .collect::<Result<_, SyncError>>()?;

        Ok(Self {
            source_format: resolve(&config.source.file, config.source.format)?,
            source_outputs: resolve_outputs(&config.source.outputs)?,
            targets,
        })
    }
}

fn resolve(path: &std::path::Path, explicit: Option<FormatTag>) -> Result<FormatTag, SyncError> {
    detect_format(path, explicit).map_err(|source| SyncError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_outputs(outputs: &[OutputSpec]) -> Result<Vec<ResolvedOutput>, SyncError> {
    outputs
        .iter()
        .map(|o| {
            Ok(ResolvedOutput {
                file: o.file.clone(),
                format: resolve(&o.file, o.format)?,
            })
        })
        .collect()
}
