//! Staleness diff between a source map and an existing target file.
//!
//! Pure: no I/O, no backend. Each existing target key ends up in exactly
//! one bucket:
//!
//! | source has key | stored hash matches | bucket      |
//! |----------------|---------------------|-------------|
//! | no             | n/a                 | removed     |
//! | yes            | yes                 | preserved   |
//! | yes            | no                  | candidate   |
//!
//! Source keys with no target record at all are candidates too.

use std::collections::BTreeMap;

use locsync_core::{Candidate, SourceMap, TargetRecord};

/// Result of reconciling one target against the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Records carried forward unchanged, ordered by key.
    pub preserved: Vec<TargetRecord>,
    /// Keys needing a fresh translation, ordered by key.
    pub candidates: Vec<Candidate>,
    /// Orphaned keys: present in the target, gone from the source.
    pub removed: Vec<String>,
    /// Target keys that appeared more than once; earlier copies were dropped.
    pub duplicates: Vec<String>,
}

impl Reconciliation {
    /// Existing records that will not be written back.
    pub fn removed_count(&self) -> usize {
        self.removed.len() + self.duplicates.len()
    }

    /// Nothing to translate and nothing to drop: the file is already current.
    pub fn is_noop(&self) -> bool {
        self.candidates.is_empty() && self.removed_count() == 0
    }
}

/// Partition `existing` into preserved records, candidates and orphans.
pub fn reconcile(source: &SourceMap, existing: Vec<TargetRecord>) -> Reconciliation {
    let mut by_key: BTreeMap<String, TargetRecord> = BTreeMap::new();
    let mut duplicates = Vec::new();
    for record in existing {
        if let Some(previous) = by_key.insert(record.key.clone(), record) {
            duplicates.push(previous.key);
        }
    }

    let mut preserved = Vec::new();
    let mut removed = Vec::new();
    for (key, record) in by_key.iter() {
        match source.get(key) {
            None => removed.push(key.clone()),
            Some(current) if record.is_current_for(current) => preserved.push(record.clone()),
            Some(_) => {}
        }
    }

    let candidates = source
        .iter()
        .filter(|(key, current)| {
            by_key
                .get(*key)
                .map_or(true, |record| !record.is_current_for(current))
        })
        .map(|(key, current)| Candidate {
            key: key.clone(),
            source: current.clone(),
        })
        .collect();

    Reconciliation {
        preserved,
        candidates,
        removed,
        duplicates,
    }
}
