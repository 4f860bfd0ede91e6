//! Read-only freshness report per target language.
//!
//! Signal precedence:
//! 1. `NeverSynced` (target file missing)
//! 2. `Stale` (keys missing from the target, or stored hashes out of date)
//! 3. `Orphan` (target carries keys the source no longer has, or repeats a key)
//! 4. `Current`

use std::path::PathBuf;

use serde::Serialize;

use locsync_core::{build_source_map, Config};

use crate::plan::RunPlan;
use crate::reconcile::reconcile;
use crate::store::{read_source, read_target};
use crate::SyncError;

/// Freshness classification for one target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum StatusSignal {
    NeverSynced,
    Current,
    Stale { reason: String },
    Orphan { keys: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageStatus {
    pub language: String,
    pub file: PathBuf,
    pub exists: bool,
    /// Keys whose stored hash matches the source.
    pub current: usize,
    /// Keys present in the target with an out-of-date hash.
    pub stale: usize,
    /// Source keys with no target record.
    pub missing: usize,
    /// Target keys gone from the source.
    pub orphaned: usize,
    /// Extra occurrences of repeated target keys; sync keeps only the last.
    pub duplicates: usize,
    pub signal: StatusSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub source: PathBuf,
    pub source_keys: usize,
    pub languages: Vec<LanguageStatus>,
}

impl StatusReport {
    pub fn all_current(&self) -> bool {
        self.languages
            .iter()
            .all(|l| l.signal == StatusSignal::Current)
    }
}

/// Classify every target against the source. Reads only; no backend.
pub async fn status(config: &Config) -> Result<StatusReport, SyncError> {
    let plan = RunPlan::resolve(config)?;
    let (source, _) = build_source_map(read_source(&config.source.file, plan.source_format).await?);

    let mut languages = Vec::with_capacity(plan.targets.len());
    for target in &plan.targets {
        let spec = &target.spec;
        let exists = tokio::fs::metadata(&spec.file).await.is_ok();
        let existing = read_target(&spec.language, &spec.file, target.format).await?;
        let existing_keys: std::collections::HashSet<String> =
            existing.iter().map(|r| r.key.clone()).collect();

        let diff = reconcile(&source, existing);
        let missing = diff
            .candidates
            .iter()
            .filter(|c| !existing_keys.contains(&c.key))
            .count();
        let stale = diff.candidates.len() - missing;

        let signal = if !exists {
            StatusSignal::NeverSynced
        } else if !diff.candidates.is_empty() {
            StatusSignal::Stale {
                reason: stale_reason(stale, missing),
            }
        } else if diff.removed_count() > 0 {
            StatusSignal::Orphan {
                keys: diff
                    .removed
                    .iter()
                    .chain(diff.duplicates.iter())
                    .cloned()
                    .collect(),
            }
        } else {
            StatusSignal::Current
        };

        languages.push(LanguageStatus {
            language: spec.language.clone(),
            file: spec.file.clone(),
            exists,
            current: diff.preserved.len(),
            stale,
            missing,
            orphaned: diff.removed.len(),
            duplicates: diff.duplicates.len(),
            signal,
        });
    }

    Ok(StatusReport {
        source: config.source.file.clone(),
        source_keys: source.len(),
        languages,
    })
}

fn stale_reason(stale: usize, missing: usize) -> String {
    let mut parts = Vec::new();
    if stale > 0 {
        parts.push(format!("{stale} outdated"));
    }
    if missing > 0 {
        parts.push(format!("{missing} untranslated"));
    }
    parts.join(", ")
}

/// Short preview of a key list: the first three, then a count.
pub fn preview_keys(keys: &[String]) -> String {
    let mut shown: Vec<String> = keys.iter().take(3).cloned().collect();
    if keys.len() > shown.len() {
        shown.push(format!("+{} more", keys.len() - shown.len()));
    }
    shown.join(", ")
}
