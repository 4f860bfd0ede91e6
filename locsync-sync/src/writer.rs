//! Write phase: content-gated atomic writes and dry-run diffs.
//!
//! A file is only replaced when its rendered content differs from what is
//! on disk (line endings normalised). In dry-run mode nothing is written;
//! the would-be change is returned as a unified diff instead.

use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::TextDiff;
use tracing::{info, warn};

use locsync_formats::FormatError;

use crate::error::SyncError;
use crate::store::{atomic_write, read_optional};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// On-disk content already matches, or nothing needed regenerating.
    Unchanged { path: PathBuf },
    /// Dry run: the file *would* have been written.
    WouldWrite { path: PathBuf, diff: String },
    /// A secondary output could not be produced. Never fatal.
    Skipped { path: PathBuf, reason: String },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path, .. }
            | WriteResult::Skipped { path, .. } => path,
        }
    }

    /// `true` for a real or would-be change on disk.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            WriteResult::Written { .. } | WriteResult::WouldWrite { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Write `content` to `path` unless it is already there.
///
/// `root` only shortens the paths shown in diff headers.
pub async fn write_file(
    path: &Path,
    content: &str,
    dry_run: bool,
    root: &Path,
) -> Result<WriteResult, SyncError> {
    let content = normalize_line_endings(content);
    let existing = read_optional(path).await?.map(|c| normalize_line_endings(&c));
    if existing.as_deref() == Some(content.as_str()) {
        tracing::debug!("unchanged: {}", path.display());
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
        });
    }

    if dry_run {
        info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
            diff: unified_diff(path, root, existing.as_deref().unwrap_or_default(), &content),
        });
    }

    atomic_write(path, &content).await?;
    info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Produce a secondary output.
///
/// With `regenerate == false` an existing file is left alone and only a
/// missing one is created. Failures are logged and reported as
/// [`WriteResult::Skipped`].
pub async fn write_output(
    path: &Path,
    render: impl FnOnce() -> Result<String, FormatError>,
    regenerate: bool,
    dry_run: bool,
    root: &Path,
) -> WriteResult {
    if !regenerate && tokio::fs::metadata(path).await.is_ok() {
        return WriteResult::Unchanged {
            path: path.to_path_buf(),
        };
    }

    let outcome = match render() {
        Ok(content) => write_file(path, &content, dry_run, root)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    outcome.unwrap_or_else(|reason| {
        warn!(path = %path.display(), %reason, "skipping secondary output");
        WriteResult::Skipped {
            path: path.to_path_buf(),
            reason,
        }
    })
}

fn unified_diff(path: &Path, root: &Path, old: &str, new: &str) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let old_header = format!("a/{}", relative.display());
    let new_header = format!("b/{}", relative.display());
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
