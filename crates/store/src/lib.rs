//! SQLite + Object Storage Backends
//!
//! Concrete implementations of the metadata and object backends used by the
//! permfs daemon: SQLite for the permission table and pluggable object
//! storage (S3/MinIO/local filesystem/memory) for file bodies.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use common::prelude::*;
//! use store::{ObjectStorage, ObjectStoreConfig, SqliteMetadataBackend};
//!
//! # async fn example() -> Result<(), store::StoreSetupError> {
//! let metadata = SqliteMetadataBackend::in_memory().await?;
//! metadata.ensure_table("permissions").await?;
//! let objects = ObjectStorage::new(ObjectStoreConfig::Memory, "files").await?;
//!
//! let creator = FileCreator::new(
//!     MetadataStoreClient::new("permissions", Arc::new(metadata)),
//!     ObjectStoreClient::new("files", Arc::new(objects)),
//! );
//! # Ok(())
//! # }
//! ```

mod error;
mod metadata;
mod storage;

pub use error::{Result, StoreSetupError};
pub use metadata::{validate_table_name, SqliteMetadataBackend};
pub use storage::{ObjectStorage, ObjectStoreConfig};
