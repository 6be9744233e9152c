//! Atomic output writes.
//!
//! The PDF is written to a hidden temporary file in the output directory and
//! renamed over the target. Readers therefore see either the previous PDF or
//! the complete new one, never a truncated file, and a failed render leaves
//! any existing output untouched. The temp file lives in the same directory
//! so the rename never crosses filesystems.

use crate::error::PathError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEMP_PREFIX: &str = ".md2pdf-";

/// Write `bytes` to `target` atomically. Returns the number of bytes written.
pub async fn write_atomic(target: &Path, bytes: Vec<u8>) -> Result<u64, PathError> {
    let target = target.to_path_buf();
    let len = bytes.len() as u64;
    let task_target = target.clone();

    tokio::task::spawn_blocking(move || write_blocking(&task_target, &bytes))
        .await
        .map_err(|e| PathError::WriteFailed {
            path: target.clone(),
            source: std::io::Error::other(format!("write task panicked: {e}")),
        })??;

    debug!("Wrote {} bytes to {}", len, target.display());
    Ok(len)
}

fn write_blocking(target: &Path, bytes: &[u8]) -> Result<(), PathError> {
    let fail = |source: std::io::Error| PathError::WriteFailed {
        path: target.to_path_buf(),
        source,
    };
    let dir = parent_dir(target);

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(target).map_err(|e| fail(e.error))?;
    Ok(())
}

fn parent_dir(target: &Path) -> PathBuf {
    target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.pdf");

        assert_eq!(write_atomic(&target, b"first".to_vec()).await.unwrap(), 5);
        assert_eq!(std::fs::read(&target).unwrap(), b"first");

        write_atomic(&target, b"second!".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second!");
    }

    #[tokio::test]
    async fn leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_atomic(&dir.path().join("a.pdf"), b"x".to_vec()).await.unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf".to_string()]);
    }

    #[tokio::test]
    async fn missing_directory_is_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("no-such-dir").join("a.pdf");
        let err = write_atomic(&target, b"x".to_vec()).await.unwrap_err();
        assert!(matches!(err, PathError::WriteFailed { .. }), "got: {err:?}");
    }
}
