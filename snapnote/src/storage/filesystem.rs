//! Filesystem storage backend
//!
//! Each key is one pretty-printed JSON file, `<data_dir>/<key>.json`. Writes go
//! to a uniquely named sibling temporary file first and are renamed into
//! place, so readers never observe a half-written value and concurrent
//! writers never collide on the temporary name.
//!
//! [`StorageBackend::lock_key`] takes an exclusive OS lock on
//! `<data_dir>/.<key>.lock`, which every process opening the directory
//! honors.

use super::{KeyLock, StorageBackend};
use crate::error::{ErrorContext, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const KEY_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Filesystem-based key/value storage
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    data_dir: PathBuf,
    quota_bytes: u64,
}

impl FileSystemStorage {
    /// Create storage rooted at `data_dir` with the given capacity
    pub fn new(data_dir: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            data_dir: data_dir.into(),
            quota_bytes,
        }
    }

    /// Directory holding the key files
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.{KEY_EXTENSION}"))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!(".{key}.{LOCK_EXTENSION}"))
    }

    async fn ensure_directory_exists(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("failed to create {}", self.data_dir.display()))
    }

    async fn key_files(&self) -> Result<Vec<PathBuf>> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.data_dir)
            .await
            .with_context(|| format!("failed to list {}", self.data_dir.display()))?;
        while let Some(entry) = entries.next_entry().await.context("failed to list keys")? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == KEY_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(crate::SnapNoteError::storage(format!("invalid key: {key:?}")))
    }
}

#[async_trait]
impl StorageBackend for FileSystemStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let path = self.key_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(crate::SnapNoteError::storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        validate_key(key)?;
        self.ensure_directory_exists().await?;

        let path = self.key_path(key);
        let dir = self.data_dir.clone();
        let prefix = format!(".{key}.");
        let content = serde_json::to_string_pretty(&value)?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".tmp")
                .tempfile_in(&dir)
                .with_context(|| format!("failed to create a file in {}", dir.display()))?;
            tmp.write_all(content.as_bytes())
                .with_context(|| format!("failed to write {}", tmp.path().display()))?;
            tmp.persist(&path)
                .with_context(|| format!("failed to replace {}", path.display()))?;
            Ok(())
        })
        .await
        .context("write task failed")?
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(crate::SnapNoteError::storage(format!(
                "failed to remove key '{key}': {e}"
            ))),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .key_files()
            .await?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|k| !k.starts_with('.'))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        let mut total = 0;
        for path in self.key_files().await? {
            let metadata = tokio::fs::metadata(&path)
                .await
                .with_context(|| format!("failed to stat {}", path.display()))?;
            total += metadata.len();
        }
        Ok(total)
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    async fn lock_key(&self, key: &str) -> Result<KeyLock> {
        validate_key(key)?;
        self.ensure_directory_exists().await?;

        let path = self.lock_path(key);
        let file = tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            file.lock()
                .with_context(|| format!("failed to lock {}", path.display()))?;
            Ok::<_, crate::SnapNoteError>(file)
        })
        .await
        .context("lock task failed")??;
        Ok(KeyLock::file(file))
    }
}
