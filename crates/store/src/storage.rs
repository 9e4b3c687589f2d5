//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use common::error::StoreError;
use common::object::ObjectBackend;

use crate::error::{Result, StoreSetupError};

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage; each bucket is a directory below `path`
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO);
        /// AWS when unset
        endpoint: Option<String>,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// A bucket on one of the supported object storage backends.
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    bucket: String,
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStorage {
    /// Open `bucket` on the backend described by `config`.
    pub async fn new(config: ObjectStoreConfig, bucket: &str) -> Result<Self> {
        if bucket.is_empty() {
            return Err(StoreSetupError::InvalidConfig(
                "bucket name must not be empty".to_string(),
            ));
        }

        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::Local { path } => {
                let root = path.join(bucket);
                // Ensure directory exists
                tokio::fs::create_dir_all(&root).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(&root)
                        .map_err(|e| StoreSetupError::InvalidConfig(e.to_string()))?,
                )
            }

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                region,
            } => {
                let mut builder = AmazonS3Builder::new()
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"));
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| StoreSetupError::InvalidConfig(e.to_string()))?,
                );

                // Verify bucket exists by listing (empty prefix)
                // This will fail fast if the bucket doesn't exist
                {
                    use futures::TryStreamExt;
                    let prefix = ObjectPath::from("");
                    let mut stream = store.list(Some(&prefix));
                    match stream.try_next().await {
                        Ok(_) => {}
                        Err(object_store::Error::NotFound { .. }) => {
                            return Err(StoreSetupError::BucketNotFound(bucket.to_string()));
                        }
                        Err(e) => {
                            let msg = e.to_string();
                            if msg.contains("NoSuchBucket")
                                || msg.contains("bucket") && msg.contains("not")
                            {
                                return Err(StoreSetupError::BucketNotFound(bucket.to_string()));
                            }
                            return Err(e.into());
                        }
                    }
                }

                store
            }
        };

        tracing::info!(bucket = %bucket, "opened object storage");
        Ok(Self {
            bucket: bucket.to_string(),
            inner,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectBackend for ObjectStorage {
    async fn head(&self, key: &str) -> std::result::Result<(), StoreError> {
        match self.inner.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(()),
            Err(object_store::Error::NotFound { path, .. }) => Err(StoreError::NotFound(path)),
            Err(e) => Err(StoreError::service("ObjectStore", e)),
        }
    }

    async fn put(&self, key: &str, body: Bytes) -> std::result::Result<(), StoreError> {
        self.inner
            .put(&ObjectPath::from(key), body.into())
            .await
            .map_err(|e| StoreError::service("ObjectStore", e))?;
        Ok(())
    }
}

#[cfg(test)]
impl ObjectStorage {
    /// Read an object back (test-only).
    pub async fn get_data(&self, key: &str) -> std::result::Result<Option<Bytes>, StoreError> {
        match self.inner.get(&ObjectPath::from(key)).await {
            Ok(result) => Ok(Some(
                result
                    .bytes()
                    .await
                    .map_err(|e| StoreError::service("ObjectStore", e))?,
            )),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(StoreError::service("ObjectStore", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = ObjectStorage::new(ObjectStoreConfig::Memory, "files")
            .await
            .unwrap();

        let err = storage.head("alice/a.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        storage.put("alice/a.txt", Bytes::new()).await.unwrap();
        storage.head("alice/a.txt").await.unwrap();
        assert_eq!(
            storage.get_data("alice/a.txt").await.unwrap(),
            Some(Bytes::new())
        );
    }

    #[tokio::test]
    async fn test_local_storage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ObjectStoreConfig::Local {
            path: temp_dir.path().to_path_buf(),
        };

        let storage = ObjectStorage::new(config, "files").await.unwrap();
        assert_eq!(storage.bucket(), "files");

        storage
            .put("alice/docs/a.txt", Bytes::from("test data"))
            .await
            .unwrap();
        storage.head("alice/docs/a.txt").await.unwrap();

        // Verify file exists on disk, below the bucket directory
        let file_path = temp_dir
            .path()
            .join("files")
            .join("alice")
            .join("docs")
            .join("a.txt");
        assert!(file_path.exists());
    }

    #[tokio::test]
    async fn test_empty_bucket_name() {
        let err = ObjectStorage::new(ObjectStoreConfig::Memory, "")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreSetupError::InvalidConfig(_)));
    }
}
