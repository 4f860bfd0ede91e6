//! Record-store I/O: read source/target collections, write files atomically.
//!
//! ## `atomic_write`
//!
//! 1. Create parent directories.
//! 2. Write to `<path>.locsync.tmp`.
//! 3. Rename over the final path (atomic on POSIX).
//! 4. On rename failure, remove the tmp file and leave the original intact.

use std::path::{Path, PathBuf};

use locsync_core::{FormatTag, SourceRecord, TargetRecord};
use locsync_formats::codec;

use crate::error::{io_err, ReadError, SyncError};

/// Read and parse a source file. A missing source is fatal.
pub async fn read_source(path: &Path, format: FormatTag) -> Result<Vec<SourceRecord>, SyncError> {
    let wrap = |source: ReadError| SyncError::SourceRead {
        path: path.to_path_buf(),
        source,
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| wrap(e.into()))?;
    codec(format)
        .parse_source(&content)
        .map_err(|e| wrap(e.into()))
}

/// Read and parse a target file. A missing target is an empty collection.
pub async fn read_target(
    language: &str,
    path: &Path,
    format: FormatTag,
) -> Result<Vec<TargetRecord>, SyncError> {
    let wrap = |source: ReadError| SyncError::TargetRead {
        language: language.to_string(),
        path: path.to_path_buf(),
        source,
    };
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(wrap(e.into())),
    };
    codec(format)
        .parse_target(&content)
        .map_err(|e| wrap(e.into()))
}

/// Read a file, mapping "not found" to `None`.
pub(crate) async fn read_optional(path: &Path) -> Result<Option<String>, SyncError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.locsync.tmp", path.display()))
}

/// Replace `path` with `content`, never leaving a half-written file behind.
pub async fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    atomic_write_with_tmp(path, content, &tmp_path(path)).await
}

async fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    for dir in [path.parent(), tmp.parent()].into_iter().flatten() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| io_err(dir, e))?;
        }
    }

    tokio::fs::write(tmp, content)
        .await
        .map_err(|e| io_err(tmp, e))?;

    if let Err(e) = tokio::fs::rename(tmp, path).await {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_source_is_fatal_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = read_source(&dir.path().join("en.csv"), FormatTag::Csv)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::SourceRead {
                source: ReadError::NotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_target_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let records = read_target("French", &dir.path().join("fr.csv"), FormatTag::Csv)
            .await
            .expect("read");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn malformed_target_names_language() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("fr.js");
        fs::write(&path, "not a module").expect("write");
        let err = read_target("French", &path, FormatTag::Js).await.unwrap_err();
        match err {
            SyncError::TargetRead {
                language,
                source: ReadError::Format(_),
                ..
            } => assert_eq!(language, "French"),
            other => panic!("expected target read error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn atomic_write_creates_parents_and_cleans_tmp() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("dist").join("locales").join("fr.js");
        atomic_write(&path, "content").await.expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "content");
        assert!(!tmp_path(&path).exists(), ".locsync.tmp must be cleaned up");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().expect("tempdir");
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).expect("mkdir");
        let path = readonly_dir.join("fr.csv");
        fs::write(&path, "original").expect("write");

        let mut perms = fs::metadata(&readonly_dir).expect("meta").permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).expect("chmod");

        let tmp_dir = TempDir::new().expect("tempdir");
        let tmp = tmp_dir.path().join("fr.csv.locsync.tmp");
        let result = atomic_write_with_tmp(&path, "new content", &tmp).await;

        let mut perms = fs::metadata(&readonly_dir).expect("meta").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).expect("chmod");

        // Root can rename into a read-only directory; only check when it failed.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&path).expect("read"), "original");
            assert!(!tmp.exists(), ".locsync.tmp should be cleaned up");
        }
    }
}
