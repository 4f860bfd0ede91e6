//! # locsync-sync
//!
//! Reconciliation, batch translation and write-barrier orchestration.
//!
//! Call [`run`] for one full synchronization pass across every configured
//! target language, or [`status`] for a read-only freshness report.

pub mod batch;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod run;
pub mod status;
pub mod store;
pub mod writer;

pub use batch::{translate_candidates, BatchStats, FallbackScope};
pub use error::{ReadError, SyncError};
pub use pipeline::{process_target, PipelineSettings, TargetOutcome};
pub use plan::RunPlan;
pub use reconcile::{reconcile, Reconciliation};
pub use run::{run, run_until, FailurePolicy, LanguageFailure, LanguageReport, RunOptions, RunReport};
pub use status::{preview_keys, status, LanguageStatus, StatusReport, StatusSignal};
pub use writer::WriteResult;
