use std::sync::Arc;
use std::time::Duration;

use common::prelude::{FileCreator, MetadataStoreClient, ObjectStoreClient};
use store::{ObjectStorage, SqliteMetadataBackend, StoreSetupError};

use crate::ServiceConfig;

/// Main service state, shared by every request handler
#[derive(Debug, Clone)]
pub struct State {
    creator: FileCreator,
    request_timeout: Duration,
}

impl State {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        // 1. Setup metadata database
        let metadata = match config.sqlite_path {
            Some(ref path) => {
                tracing::info!("Metadata database: {}", path.display());
                SqliteMetadataBackend::new(path).await?
            }
            // otherwise just set up an in-memory database
            None => {
                tracing::warn!("no database path configured, metadata will not persist");
                SqliteMetadataBackend::in_memory().await?
            }
        };
        metadata.ensure_table(&config.table_name).await?;

        // 2. Setup object storage
        tracing::debug!("ServiceState::from_config - opening object storage");
        let objects = ObjectStorage::new(config.object_store.clone(), &config.bucket_name).await?;

        let creator = FileCreator::new(
            MetadataStoreClient::new(config.table_name.clone(), Arc::new(metadata)),
            ObjectStoreClient::new(config.bucket_name.clone(), Arc::new(objects)),
        );
        tracing::info!(
            table = %config.table_name,
            bucket = %config.bucket_name,
            "service state ready"
        );

        Ok(Self::new(creator, config.request_timeout))
    }

    pub fn new(creator: FileCreator, request_timeout: Duration) -> Self {
        Self {
            creator,
            request_timeout,
        }
    }

    pub fn creator(&self) -> &FileCreator {
        &self.creator
    }

    pub fn metadata(&self) -> &MetadataStoreClient {
        self.creator.metadata()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("store setup error: {0}")]
    Store(#[from] StoreSetupError),
}

#[cfg(test)]
mod tests {
    use store::ObjectStoreConfig;

    use super::*;

    fn config() -> ServiceConfig {
        ServiceConfig {
            table_name: "permfs-files".to_string(),
            bucket_name: "files".to_string(),
            sqlite_path: None,
            object_store: ObjectStoreConfig::Memory,
            api_port: 3000,
            request_timeout: Duration::from_secs(30),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }

    #[tokio::test]
    async fn test_from_config() {
        let state = State::from_config(&config()).await.unwrap();
        assert_eq!(state.metadata().table(), "permfs-files");
        assert_eq!(state.creator().objects().bucket(), "files");

        state
            .creator()
            .create_for("alice", "/alice/a.txt")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_table_name_is_fatal() {
        let mut config = config();
        config.table_name = "files; DROP".to_string();

        let err = State::from_config(&config).await.unwrap_err();
        assert!(matches!(
            err,
            StateSetupError::Store(StoreSetupError::InvalidTableName(_))
        ));
    }

    #[tokio::test]
    async fn test_on_disk_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.sqlite_path = Some(temp_dir.path().join("permfs.db"));
        config.object_store = ObjectStoreConfig::Local {
            path: temp_dir.path().join("objects"),
        };

        let state = State::from_config(&config).await.unwrap();
        state
            .creator()
            .create_for("alice", "/alice/a.txt")
            .await
            .unwrap();
        assert!(temp_dir
            .path()
            .join("objects")
            .join("files")
            .join("alice")
            .join("a.txt")
            .exists());
    }
}
