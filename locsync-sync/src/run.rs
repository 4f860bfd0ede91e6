//! Run coordinator.
//!
//! ```text
//! resolve formats -> read source once -> fan out one task per language
//!   -> await all (failure policy) -> write barrier -> write targets + outputs
//! ```
//!
//! Nothing is written until every language has finished computing. A run
//! cancelled before that point leaves every file untouched.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use locsync_core::{build_source_map, Config, SourceMap, SourceRecord};
use locsync_formats::codec;
use locsync_translate::TranslatorFactory;

use crate::batch::{BatchStats, FallbackScope};
use crate::pipeline::{process_target, PipelineSettings, TargetOutcome};
use crate::plan::{ResolvedOutput, RunPlan};
use crate::store::read_source;
use crate::writer::{write_file, write_output, WriteResult};
use crate::SyncError;

/// What happens to the run when one language fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Any failed language aborts the run before anything is written.
    #[default]
    AbortAll,
    /// Failed languages are reported; every other language is written.
    Isolate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    pub failure_policy: FailurePolicy,
    pub fallback_scope: FallbackScope,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LanguageReport {
    pub language: String,
    pub preserved: usize,
    pub translated: usize,
    pub removed: usize,
    pub has_changes: bool,
    #[serde(skip)]
    pub stats: BatchStats,
    /// Target file first, then its secondary outputs.
    pub writes: Vec<WriteResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageFailure {
    pub language: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub languages: Vec<LanguageReport>,
    /// Only populated under [`FailurePolicy::Isolate`].
    pub failures: Vec<LanguageFailure>,
    pub source_outputs: Vec<WriteResult>,
}

impl RunReport {
    pub fn has_changes(&self) -> bool {
        self.languages.iter().any(|l| l.has_changes)
            || self.source_outputs.iter().any(WriteResult::is_change)
    }

    pub fn writes(&self) -> impl Iterator<Item = &WriteResult> {
        self.languages
            .iter()
            .flat_map(|l| l.writes.iter())
            .chain(self.source_outputs.iter())
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run one full synchronization pass.
pub async fn run(
    config: Arc<Config>,
    factory: Arc<dyn TranslatorFactory>,
    options: RunOptions,
) -> Result<RunReport, SyncError> {
    run_until(config, factory, options, std::future::pending::<()>()).await
}

/// Like [`run`], but `shutdown` completing before the write barrier aborts
/// the run with [`SyncError::Aborted`] and leaves every file untouched.
/// Once writing has started it runs to completion.
pub async fn run_until(
    config: Arc<Config>,
    factory: Arc<dyn TranslatorFactory>,
    options: RunOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<RunReport, SyncError> {
    let plan = RunPlan::resolve(&config)?;

    let computed = tokio::select! {
        result = compute(&config, &plan, factory, options) => result?,
        _ = shutdown => {
            warn!("run cancelled before writing; no files changed");
            return Err(SyncError::Aborted);
        }
    };

    write_all(&config, &plan, computed, options).await
}

// ---------------------------------------------------------------------------
// Compute phase
// ---------------------------------------------------------------------------

struct Computed {
    source: Arc<SourceMap>,
    outcomes: Vec<TargetOutcome>,
    failures: Vec<LanguageFailure>,
}

async fn compute(
    config: &Config,
    plan: &RunPlan,
    factory: Arc<dyn TranslatorFactory>,
    options: RunOptions,
) -> Result<Computed, SyncError> {
    let records = read_source(&config.source.file, plan.source_format).await?;
    let (source, duplicates) = build_source_map(records);
    for key in &duplicates {
        warn!(key = %key, path = %config.source.file.display(), "duplicate key in source; keeping last");
    }
    let source = Arc::new(source);
    info!(keys = source.len(), targets = plan.targets.len(), "source loaded");

    let settings = Arc::new(PipelineSettings {
        source_language: config.source.language.clone(),
        global_instructions: config.instructions.clone(),
        batch_size: config.batch_size,
        fallback_scope: options.fallback_scope,
    });

    let mut tasks = JoinSet::new();
    for (index, target) in plan.targets.iter().cloned().enumerate() {
        let settings = Arc::clone(&settings);
        let source = Arc::clone(&source);
        let factory = Arc::clone(&factory);
        let language = target.spec.language.clone();
        tasks.spawn(async move {
            let result = process_target(&settings, target, &source, factory.as_ref()).await;
            (index, language, result)
        });
    }

    let mut slots: Vec<Option<TargetOutcome>> = vec![None; plan.targets.len()];
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, language, result) = joined.map_err(|e| SyncError::Join(e.to_string()))?;
        match result {
            Ok(outcome) => slots[index] = Some(outcome),
            Err(err) => match options.failure_policy {
                FailurePolicy::AbortAll => {
                    tasks.abort_all();
                    error!(language = %language, error = %err, "language failed; aborting run");
                    return Err(err);
                }
                FailurePolicy::Isolate => {
                    error!(language = %language, error = %err, "language failed; skipping it");
                    failures.push(LanguageFailure {
                        language,
                        error: err.to_string(),
                    });
                }
            },
        }
    }

    Ok(Computed {
        source,
        outcomes: slots.into_iter().flatten().collect(),
        failures,
    })
}

// ---------------------------------------------------------------------------
// Write phase
// ---------------------------------------------------------------------------

async fn write_all(
    config: &Config,
    plan: &RunPlan,
    computed: Computed,
    options: RunOptions,
) -> Result<RunReport, SyncError> {
    let root = config.base_dir.as_path();
    let mut report = RunReport {
        failures: computed.failures,
        ..RunReport::default()
    };

    for outcome in computed.outcomes {
        let language = outcome.target.spec.language.clone();
        match write_language(&outcome, options.dry_run, root).await {
            Ok(writes) => report.languages.push(LanguageReport {
                language,
                preserved: outcome.preserved,
                translated: outcome.translated,
                removed: outcome.removed,
                has_changes: outcome.has_changes,
                stats: outcome.stats,
                writes,
            }),
            Err(err) if options.failure_policy == FailurePolicy::Isolate => {
                error!(language = %language, error = %err, "writing target failed");
                report.failures.push(LanguageFailure {
                    language,
                    error: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    let sorted: Vec<SourceRecord> = computed.source.values().cloned().collect();
    for output in &plan.source_outputs {
        report
            .source_outputs
            .push(write_source_output(output, &sorted, options.dry_run, root).await);
    }

    Ok(report)
}

async fn write_language(
    outcome: &TargetOutcome,
    dry_run: bool,
    root: &Path,
) -> Result<Vec<WriteResult>, SyncError> {
    let target = &outcome.target;
    let mut writes = Vec::with_capacity(1 + target.outputs.len());

    if outcome.has_changes {
        let content = codec(target.format)
            .render_target(&outcome.records)
            .map_err(|source| SyncError::Format {
                path: target.spec.file.clone(),
                source,
            })?;
        writes.push(write_file(&target.spec.file, &content, dry_run, root).await?);
    } else {
        writes.push(WriteResult::Unchanged {
            path: target.spec.file.clone(),
        });
    }

    for output in &target.outputs {
        let render = || codec(output.format).render_target(&outcome.records);
        writes.push(write_output(&output.file, render, outcome.has_changes, dry_run, root).await);
    }
    Ok(writes)
}

async fn write_source_output(
    output: &ResolvedOutput,
    records: &[SourceRecord],
    dry_run: bool,
    root: &Path,
) -> WriteResult {
    let render = || codec(output.format).render_source(records);
    write_output(&output.file, render, true, dry_run, root).await
}
