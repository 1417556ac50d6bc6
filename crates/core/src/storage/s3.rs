//! S3 blob store
//!
//! Works against AWS S3 and S3-compatible servers such as MinIO. A custom
//! endpoint switches the client to path-style addressing.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use super::{BlobStore, StorageError};
use crate::config::{StorageConfig, StorageLocation, redact_secret};

/// Blob store backed by one S3 bucket
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    /// Build a client from the storage configuration
    ///
    /// Static credentials are used when both keys are configured. Otherwise
    /// credentials come from the default AWS chain (environment variables,
    /// `~/.aws/credentials`, instance role).
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let StorageLocation::S3 { bucket } = &config.location else {
            return Err(StorageError::Backend(
                "S3 store requires an s3:// location".to_string(),
            ));
        };

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            info!(
                access_key = %redact_secret(access_key, 4),
                "Using static S3 credentials"
            );
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "olist-dw",
            ));
        }

        let sdk_config = loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint);
            s3_config = s3_config.force_path_style(true);
        }

        Ok(Self {
            client: S3Client::from_conf(s3_config.build()),
            bucket: bucket.clone(),
        })
    }

    fn display_key(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[async_trait(?Send)]
impl BlobStore for S3BlobStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(self.display_key(path))
                } else {
                    StorageError::Backend(format!(
                        "{}: {}",
                        self.display_key(path),
                        service_error
                    ))
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(bytes.into_bytes().to_vec())
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        debug!(key = path, bytes = content.len(), "Uploading object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(content.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("{}: {}", self.display_key(path), e)))?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(format!(
                        "{}: {}",
                        self.display_key(path),
                        service_error
                    )))
                }
            }
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::Backend(format!("{}: {}", self.display_key(prefix), e)))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            if response.is_truncated().unwrap_or(false) {
                continuation_token = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
