//! Local directory blob store
//!
//! ## Security
//!
//! Paths containing ".." are rejected, and resolved paths are verified
//! to remain within the root directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{BlobStore, StorageError};

/// Blob store backed by a local directory
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`
    ///
    /// ```rust
    /// use olist_dw_core::storage::LocalBlobStore;
    ///
    /// let store = LocalBlobStore::new("./data");
    /// assert!(store.root().ends_with("data"));
    /// ```
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path below the root with traversal checks.
    fn resolve_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let normalized = path.trim_start_matches('/');

        if normalized.contains("..") {
            return Err(StorageError::PermissionDenied(
                "Path traversal (..) not allowed".to_string(),
            ));
        }

        let full = self.root.join(normalized);

        for component in full.components() {
            if matches!(component, Component::ParentDir) {
                return Err(StorageError::PermissionDenied(
                    "Path traversal not allowed".to_string(),
                ));
            }
        }

        if full.exists() {
            let canonical = full
                .canonicalize()
                .map_err(|e| StorageError::Io(format!("Failed to resolve path: {}", e)))?;
            let root_canonical = self
                .root
                .canonicalize()
                .unwrap_or_else(|_| self.root.clone());

            if !canonical.starts_with(&root_canonical) {
                return Err(StorageError::PermissionDenied(
                    "Path escapes root directory".to_string(),
                ));
            }
            return Ok(canonical);
        }

        Ok(full)
    }

    /// Convert an absolute file path back into an object path
    fn object_path(&self, file: &Path) -> Option<String> {
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let relative = file.strip_prefix(&root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str().map(str::to_string),
                _ => None,
            })
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait(?Send)]
impl BlobStore for LocalBlobStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve_path(path)?;

        fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_string())
            } else {
                StorageError::Io(format!("Failed to read {}: {}", path, e))
            }
        })
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve_path(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::Io(format!("Failed to create directory for {}: {}", path, e))
            })?;
        }

        debug!(path, bytes = content.len(), "Writing object");
        fs::write(&full_path, content)
            .await
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path, e)))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.resolve_path(path)?;
        Ok(fs::metadata(&full_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let start = self.resolve_path(prefix)?;
        let mut objects = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut read_dir = match fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StorageError::Io(format!(
                        "Failed to read directory {}: {}",
                        dir.display(),
                        e
                    )));
                }
            };

            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| StorageError::Io(format!("Failed to read directory entry: {}", e)))?
            {
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    let path = entry.path();
                    let path = path.canonicalize().unwrap_or(path);
                    if let Some(object) = self.object_path(&path) {
                        objects.push(object);
                    }
                }
            }
        }

        objects.sort();
        Ok(objects)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
