//! Object store client.
//!
//! Objects are addressed by the normalized path of the file they back, in a
//! single bucket. The client only needs two primitives: a metadata probe
//! and a put of the (empty) placeholder body.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{FsError, StoreError};
use crate::path::PathIdentity;

pub mod memory;

pub use memory::{MemoryObjectBackend, ObjectFaults};

/// A bucket-bound object backend.
#[async_trait]
pub trait ObjectBackend: Send + Sync + Debug + 'static {
    /// Probe object metadata. Must fail with [`StoreError::NotFound`] when
    /// no object exists under `key`.
    async fn head(&self, key: &str) -> Result<(), StoreError>;

    /// Write `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    bucket: String,
    backend: Arc<dyn ObjectBackend>,
}

impl ObjectStoreClient {
    pub fn new(bucket: impl Into<String>, backend: Arc<dyn ObjectBackend>) -> Self {
        Self {
            bucket: bucket.into(),
            backend,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Whether an object backs `path`.
    ///
    /// Only a definitive not-found answers `false`; any other probe failure
    /// is an error.
    pub async fn exists(&self, path: &PathIdentity) -> Result<bool, FsError> {
        match self.backend.head(path.normalized_path()).await {
            Ok(()) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => {
                tracing::error!(
                    bucket = %self.bucket,
                    key = %path.normalized_path(),
                    "Object existence check failed with error: {}",
                    e
                );
                Err(FsError::server("Object store failure"))
            }
        }
    }

    /// Write the empty placeholder object for `path`.
    pub async fn put(&self, path: &PathIdentity) -> Result<(), FsError> {
        self.backend
            .put(path.normalized_path(), Bytes::new())
            .await
            .map_err(|e| {
                tracing::error!(
                    bucket = %self.bucket,
                    key = %path.normalized_path(),
                    "Object upload failed with error: {}",
                    e
                );
                FsError::server("Object store failure")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn client() -> (ObjectStoreClient, MemoryObjectBackend) {
        let backend = MemoryObjectBackend::new();
        (
            ObjectStoreClient::new("files", Arc::new(backend.clone())),
            backend,
        )
    }

    #[tokio::test]
    async fn test_put_then_exists() {
        let (client, backend) = client();
        let path = PathIdentity::from_absolute("/alice/a.txt").unwrap();

        assert!(!client.exists(&path).await.unwrap());
        client.put(&path).await.unwrap();
        assert!(client.exists(&path).await.unwrap());
        assert_eq!(backend.object("alice/a.txt"), Some(Bytes::new()));
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_absence() {
        let (client, backend) = client();
        backend.set_faults(ObjectFaults {
            fail_head: true,
            ..Default::default()
        });

        let path = PathIdentity::from_absolute("/alice/a.txt").unwrap();
        let err = client.exists(&path).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.message(), "Object store failure");
    }

    #[tokio::test]
    async fn test_put_failure() {
        let (client, backend) = client();
        backend.set_faults(ObjectFaults {
            fail_put: true,
            ..Default::default()
        });

        let path = PathIdentity::from_absolute("/alice/a.txt").unwrap();
        assert!(client.put(&path).await.is_err());
        assert!(backend.is_empty());
    }
}
