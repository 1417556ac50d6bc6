//! Blob storage abstraction
//!
//! Defines the BlobStore trait and its implementations:
//! - LocalBlobStore: a directory on the local file system
//! - S3BlobStore: an S3 bucket or an S3-compatible server such as MinIO

use async_trait::async_trait;

use crate::config::{StorageConfig, StorageLocation};

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

pub use local::LocalBlobStore;
#[cfg(feature = "s3")]
pub use s3::S3BlobStore;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StorageError::NotFound(path) => format!(
                "Object not found: {path}\n\nHint: Check that the raw extracts were uploaded under raw/."
            ),
            StorageError::Backend(msg) => format!(
                "Storage backend error: {msg}\n\nHint: Check the endpoint, bucket and credentials."
            ),
            _ => self.to_string(),
        }
    }
}

/// Path-addressed object store holding the raw and silver layers
///
/// Paths are relative and `/`-separated, e.g. `raw/olist_orders_dataset.csv`.
#[async_trait(?Send)]
pub trait BlobStore: Send + Sync {
    /// Read a whole object
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or replace an object
    async fn write(&self, path: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// List object paths under a prefix, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Human readable location, used in logs
    fn describe(&self) -> String;
}

/// Open the blob store described by the configuration
pub async fn open(config: &StorageConfig) -> Result<Box<dyn BlobStore>, StorageError> {
    match &config.location {
        StorageLocation::Local(root) => Ok(Box::new(LocalBlobStore::new(root))),
        #[cfg(feature = "s3")]
        StorageLocation::S3 { .. } => Ok(Box::new(S3BlobStore::connect(config).await?)),
        #[cfg(not(feature = "s3"))]
        StorageLocation::S3 { bucket } => Err(StorageError::Backend(format!(
            "s3://{bucket} requires the 's3' feature"
        ))),
    }
}

/// Join path segments with `/`, ignoring empty segments
pub fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("raw", "a.csv"), "raw/a.csv");
        assert_eq!(join_path("raw/", "/a.csv"), "raw/a.csv");
        assert_eq!(join_path("", "a.csv"), "a.csv");
    }

    #[test]
    fn test_user_message_has_hint() {
        let err = StorageError::NotFound("raw/x.csv".to_string());
        assert!(err.user_message().contains("Hint:"));
        assert!(err.user_message().contains("raw/x.csv"));
    }
}
