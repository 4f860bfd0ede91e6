//! Batch translation driver.
//!
//! Candidates are cut into consecutive chunks of at most `batch_size`. Each
//! chunk goes to the backend in one `translate_batch` call. If that call
//! fails, or its reply omits a requested key, the chunk falls back to one
//! `translate` call per item. Errors on the individual path are final.
//!
//! With a batch size of 1 there is no bulk tier at all.
//!
//! Blank source text never reaches the backend on either tier: it is
//! carried over verbatim with the source hash.

use std::collections::HashMap;

use locsync_core::{BatchSize, Candidate, TargetRecord};
use locsync_translate::{TranslateError, Translator};
use tracing::{debug, warn};

/// How far a failed bulk call degrades the rest of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackScope {
    /// Only the failing chunk is retried item by item.
    #[default]
    Chunk,
    /// After the first failed chunk, every remaining chunk skips the bulk call.
    Run,
}

/// Backend call counts for one target language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub batch_calls: usize,
    pub individual_calls: usize,
    /// Chunks whose bulk call failed and were retried individually.
    pub fallback_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOutput {
    /// One record per candidate, in candidate order.
    pub records: Vec<TargetRecord>,
    pub stats: BatchStats,
}

/// Translate every candidate. Each produced record carries the hash of its
/// source record, never a hash of the translation.
pub async fn translate_candidates(
    translator: &dyn Translator,
    candidates: &[Candidate],
    batch_size: BatchSize,
    scope: FallbackScope,
    language: &str,
) -> Result<DriverOutput, TranslateError> {
    let mut stats = BatchStats::default();
    let pending: Vec<Candidate> = candidates
        .iter()
        .filter(|c| !is_blank(c))
        .cloned()
        .collect();
    let mut translated =
        translate_pending(translator, &pending, batch_size, scope, language, &mut stats)
            .await?
            .into_iter();
    let mut records = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if is_blank(candidate) {
            records.push(certify(candidate, candidate.source.text.clone()));
        } else if let Some(record) = translated.next() {
            records.push(record);
        }
    }
    Ok(DriverOutput { records, stats })
}

fn is_blank(candidate: &Candidate) -> bool {
    candidate.source.text.trim().is_empty()
}

async fn translate_pending(
    translator: &dyn Translator,
    candidates: &[Candidate],
    batch_size: BatchSize,
    scope: FallbackScope,
    language: &str,
    stats: &mut BatchStats,
) -> Result<Vec<TargetRecord>, TranslateError> {
    let mut records = Vec::with_capacity(candidates.len());

    if !batch_size.is_batching() {
        records.extend(translate_each(translator, candidates, stats).await?);
        return Ok(records);
    }

    let mut degraded = false;
    for (index, chunk) in candidates.chunks(batch_size.get()).enumerate() {
        if degraded {
            records.extend(translate_each(translator, chunk, stats).await?);
            continue;
        }
        let translated = bulk_or_individual(translator, chunk, stats, |err| {
            warn!(
                language,
                chunk = index,
                size = chunk.len(),
                error = %err,
                "batch call failed; translating chunk item by item"
            );
        })
        .await?;
        if translated.fell_back && scope == FallbackScope::Run {
            degraded = true;
        }
        records.extend(translated.records);
    }

    Ok(records)
}

struct ChunkResult {
    records: Vec<TargetRecord>,
    fell_back: bool,
}

/// Try the bulk call once; on any failure map the chunk to individual calls.
async fn bulk_or_individual(
    translator: &dyn Translator,
    chunk: &[Candidate],
    stats: &mut BatchStats,
    on_fallback: impl FnOnce(&TranslateError),
) -> Result<ChunkResult, TranslateError> {
    match translate_bulk(translator, chunk, stats).await {
        Ok(records) => Ok(ChunkResult {
            records,
            fell_back: false,
        }),
        Err(err) => {
            on_fallback(&err);
            stats.fallback_chunks += 1;
            Ok(ChunkResult {
                records: translate_each(translator, chunk, stats).await?,
                fell_back: true,
            })
        }
    }
}

async fn translate_bulk(
    translator: &dyn Translator,
    chunk: &[Candidate],
    stats: &mut BatchStats,
) -> Result<Vec<TargetRecord>, TranslateError> {
    let requests: Vec<_> = chunk.iter().map(Candidate::request).collect();
    stats.batch_calls += 1;
    let mut reply = translator.translate_batch(&requests).await?;
    let records = pick_by_key(chunk, &mut reply)?;
    if !reply.is_empty() {
        debug!(extra = reply.len(), "batch reply contained unrequested keys");
    }
    Ok(records)
}

/// Look results up by request key; a missing key fails the whole chunk.
fn pick_by_key(
    chunk: &[Candidate],
    reply: &mut HashMap<String, String>,
) -> Result<Vec<TargetRecord>, TranslateError> {
    chunk
        .iter()
        .map(|candidate| {
            let text = reply.remove(&candidate.key).ok_or_else(|| {
                TranslateError::MissingTranslation {
                    key: candidate.key.clone(),
                }
            })?;
            Ok(certify(candidate, text))
        })
        .collect()
}

async fn translate_each(
    translator: &dyn Translator,
    items: &[Candidate],
    stats: &mut BatchStats,
) -> Result<Vec<TargetRecord>, TranslateError> {
    let mut records = Vec::with_capacity(items.len());
    for candidate in items {
        stats.individual_calls += 1;
        let text = translator
            .translate(&candidate.source.text, &candidate.source.description)
            .await?;
        records.push(certify(candidate, text));
    }
    Ok(records)
}

fn certify(candidate: &Candidate, text: String) -> TargetRecord {
    TargetRecord::new(candidate.key.clone(), text, candidate.source.hash().clone())
}
