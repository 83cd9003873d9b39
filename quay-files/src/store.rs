//! Flat-directory byte store: the hub's authoritative file directory.
//!
//! The directory itself is the source of truth; listings are derived on
//! demand and no per-file state is held in memory between requests. The
//! store knows nothing about the wire protocol — it reads and writes raw
//! bytes, and base64 transport encoding happens at the router boundary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quay_protocol::types::FileRecord;
use thiserror::Error;

/// Errors from file store operations.
///
/// `NotFound` and `InvalidName` are client-addressable conditions; `Io`
/// covers real storage failures (permissions, disk full).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("invalid filename: {0:?}")]
    InvalidName(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Directory-backed file store rooted at a single flat directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`, creating the directory if absent.
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create file directory: {}", root.display()))?;

        tracing::info!(root = %root.display(), "file store opened");

        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List the stored files, one record per regular file.
    ///
    /// Records carry the fixed placeholder version; see
    /// [`quay_protocol::types::FILE_VERSION`].
    pub async fn list(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => records.push(FileRecord::new(name)),
                Err(name) => {
                    tracing::warn!(name = ?name, "skipping non-UTF-8 filename in store");
                }
            }
        }
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(records)
    }

    /// Read a file's full content.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.entry_path(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create or overwrite a file with the given bytes (last-writer-wins).
    ///
    /// No atomicity beyond what the filesystem provides: a crash mid-write
    /// may leave a partial file.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.entry_path(filename)?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(file = %filename, size = bytes.len(), "file written");
        Ok(())
    }

    /// Whether a file with this name exists in the store.
    pub async fn contains(&self, filename: &str) -> Result<bool, StoreError> {
        let path = self.entry_path(filename)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// Resolve a client-supplied filename to a path confined to the root.
    ///
    /// Names with path separators, `..`/`.` components, NUL bytes, or
    /// nothing but whitespace never reach the filesystem.
    fn entry_path(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let invalid = filename.trim().is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains('\0');
        if invalid {
            return Err(StoreError::InvalidName(filename.to_string()));
        }
        Ok(self.root.join(filename))
    }
}
