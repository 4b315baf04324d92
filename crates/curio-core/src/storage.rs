//! File-backed storage for datasets, caches, and reports.
//!
//! Single-writer only: there is no locking. Writes go to a sibling temp file
//! which is then renamed over the target, creating parent directories first.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CurioError, Result};

/// Read and decode a JSON file.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text(path).await?;
    serde_json::from_str(&content).map_err(|e| CurioError::Decode {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Encode a value as pretty-printed JSON and write it.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    write_text(path, &content).await
}

/// Read a UTF-8 text file.
pub async fn read_text(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(CurioError::NotFound(path.display().to_string()))
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => Err(CurioError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Write a UTF-8 text file, replacing any existing content.
pub async fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_sibling(path);
    tokio::fs::write(&tmp, content.as_bytes()).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    debug!(path = %path.display(), bytes = content.len(), "Wrote file");
    Ok(())
}

/// Whether a cache artifact is already present.
pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Per-record cache file path: `<dir>/<record_id>.<ext>`.
///
/// Path separators in the id are replaced so every record maps to a file
/// directly inside `dir`.
pub fn record_cache_path(dir: &Path, record_id: &str, ext: &str) -> PathBuf {
    let stem: String = record_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{}.{}", stem, ext))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("data.json");

        write_json(&path, &json!({"a": 1})).await.unwrap();
        let value: serde_json::Value = read_json(&path).await.unwrap();
        assert_eq!(value, json!({"a": 1}));
        assert!(!dir.path().join("nested/deep/.data.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_text(&dir.path().join("missing.md")).await.unwrap_err();
        assert!(matches!(err, CurioError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_malformed_json_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        write_text(&path, "{not json").await.unwrap();
        let err = read_json::<serde_json::Value>(&path).await.unwrap_err();
        assert!(matches!(err, CurioError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_write_text_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        write_text(&path, "first").await.unwrap();
        write_text(&path, "second").await.unwrap();
        assert_eq!(read_text(&path).await.unwrap(), "second");
        assert!(exists(&path).await);
    }

    #[test]
    fn test_record_cache_path() {
        let dir = Path::new("/cache");
        assert_eq!(
            record_cache_path(dir, "CL_0000001", "md"),
            PathBuf::from("/cache/CL_0000001.md")
        );
        assert_eq!(
            record_cache_path(dir, "a/b", "json"),
            PathBuf::from("/cache/a_b.json")
        );
    }
}
