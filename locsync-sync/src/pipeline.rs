//! Per-language pipeline: read target, reconcile, translate, merge.
//!
//! Produces a write-ready [`TargetOutcome`] and never writes anything
//! itself; writes happen in the run coordinator after every language is
//! done.

use std::path::PathBuf;

use locsync_core::{BatchSize, SourceMap, TargetRecord};
use locsync_translate::{TranslatorContext, TranslatorFactory};
use tracing::{debug, info, warn};

use crate::batch::{translate_candidates, BatchStats, FallbackScope};
use crate::plan::ResolvedTarget;
use crate::reconcile::reconcile;
use crate::store::read_target;
use crate::SyncError;

/// Settings shared by every language in a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_language: String,
    pub global_instructions: Option<PathBuf>,
    pub batch_size: BatchSize,
    pub fallback_scope: FallbackScope,
}

/// Write-ready result for one target language.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: ResolvedTarget,
    /// Final record set, sorted by key.
    pub records: Vec<TargetRecord>,
    /// `false` when the existing file is already current.
    pub has_changes: bool,
    pub preserved: usize,
    pub translated: usize,
    pub removed: usize,
    pub stats: BatchStats,
}

/// Run the pipeline for one target language.
///
/// A translator is only built when there is something to translate, so an
/// up-to-date target never touches the backend.
pub async fn process_target(
    settings: &PipelineSettings,
    target: ResolvedTarget,
    source: &SourceMap,
    factory: &dyn TranslatorFactory,
) -> Result<TargetOutcome, SyncError> {
    let language = target.spec.language.clone();
    let existing = read_target(&language, &target.spec.file, target.format).await?;

    let diff = reconcile(source, existing);
    for key in &diff.removed {
        info!(language = %language, key = %key, "removing orphaned key");
    }
    for key in &diff.duplicates {
        warn!(language = %language, key = %key, "duplicate key in target file; keeping last");
    }

    if diff.is_noop() {
        debug!(language = %language, "target is up to date");
        return Ok(TargetOutcome {
            target,
            preserved: diff.preserved.len(),
            records: diff.preserved,
            has_changes: false,
            translated: 0,
            removed: 0,
            stats: BatchStats::default(),
        });
    }

    let removed = diff.removed_count();
    let mut records = diff.preserved;
    let preserved = records.len();
    let mut stats = BatchStats::default();

    if !diff.candidates.is_empty() {
        let wrap = |source| SyncError::Translation {
            language: language.clone(),
            source,
        };
        let context = TranslatorContext::load(
            &settings.source_language,
            &language,
            settings.global_instructions.as_deref(),
            target.spec.instructions.as_deref(),
        )
        .map_err(wrap)?;
        let translator = factory.create(context).map_err(wrap)?;

        info!(
            language = %language,
            candidates = diff.candidates.len(),
            "translating"
        );
        let output = translate_candidates(
            translator.as_ref(),
            &diff.candidates,
            settings.batch_size,
            settings.fallback_scope,
            &language,
        )
        .await
        .map_err(wrap)?;
        records.extend(output.records);
        stats = output.stats;
    }

    records.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(TargetOutcome {
        translated: records.len() - preserved,
        target,
        records,
        has_changes: true,
        preserved,
        removed,
        stats,
    })
}
