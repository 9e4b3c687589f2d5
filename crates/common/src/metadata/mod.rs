//! Metadata store client.
//!
//! The metadata store holds one master entry per file, keyed by
//! `(user, path)`, plus one access record per user the file is shared with,
//! keyed the same way. The store is reached through a [`MetadataBackend`],
//! which offers the four primitives a key/value store with conditional
//! writes gives us: put-if-absent, point get, point delete and a size-capped
//! batch delete that may leave items unprocessed.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::{FsError, StoreError};
use crate::path::PathIdentity;

pub mod memory;

pub use memory::{MemoryMetadataBackend, MetadataFaults};

/// Maximum number of keys a single batch request may carry.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// Attributes fetched when reading a master entry.
const ENTRY_PROJECTION: [&str; 4] = ["read", "write", "users", "delete-time"];

/// A stored record: attribute name to value.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Primary key of a metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub user: String,
    pub path: String,
}

impl EntryKey {
    pub fn new(user: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            path: path.into(),
        }
    }

    /// Key of the master entry owning `path`.
    pub fn master(path: &PathIdentity) -> Self {
        Self::new(path.user_id(), path.normalized_path())
    }
}

/// The authoritative ownership and permission record of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterEntry {
    pub user: String,
    pub path: String,
    pub read: bool,
    pub write: bool,
    /// Every user with access to the file, the owner included
    pub users: BTreeSet<String>,
    /// Reserved for staged deletion; read back but never written
    #[serde(
        rename = "delete-time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub delete_time: Option<i64>,
}

impl MasterEntry {
    /// A fresh entry for a newly created file: owner only, full access.
    pub fn new_owned(path: &PathIdentity) -> Self {
        Self {
            user: path.user_id().to_string(),
            path: path.normalized_path().to_string(),
            read: true,
            write: true,
            users: BTreeSet::from([path.user_id().to_string()]),
            delete_time: None,
        }
    }
}

/// The projected part of a master entry, as read back from the store.
#[derive(Debug, Deserialize)]
struct StoredPermissions {
    read: bool,
    write: bool,
    users: BTreeSet<String>,
    #[serde(rename = "delete-time", default)]
    delete_time: Option<i64>,
}

#[async_trait]
pub trait MetadataBackend: Send + Sync + Debug + 'static {
    /// Write `item` under `key` unless a record with that key exists.
    ///
    /// Must fail with [`StoreError::ConditionalCheckFailed`] when the key is
    /// already taken.
    async fn put_if_absent(&self, table: &str, key: &EntryKey, item: Item)
        -> Result<(), StoreError>;

    /// Fetch the record under `key`, keeping only the `projection`
    /// attributes (all of them when `projection` is empty).
    async fn get(
        &self,
        table: &str,
        key: &EntryKey,
        projection: &[&str],
    ) -> Result<Option<Item>, StoreError>;

    /// Remove the record under `key`. Removing a missing record succeeds.
    async fn delete(&self, table: &str, key: &EntryKey) -> Result<(), StoreError>;

    /// Remove up to [`BATCH_WRITE_LIMIT`] records in one request.
    ///
    /// Returns the keys the store accepted but did not apply. A request
    /// level failure means none of the keys can be assumed processed.
    async fn batch_delete(
        &self,
        table: &str,
        keys: Vec<EntryKey>,
    ) -> Result<Vec<EntryKey>, StoreError>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Result of one batch delete partition.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Every key in the partition was removed
    Processed,
    /// The request went through but these keys were not removed
    Unprocessed(Vec<EntryKey>),
    /// The request itself failed
    Failed(StoreError),
}

impl From<Result<Vec<EntryKey>, StoreError>> for BatchOutcome {
    fn from(result: Result<Vec<EntryKey>, StoreError>) -> Self {
        match result {
            Ok(unprocessed) if unprocessed.is_empty() => BatchOutcome::Processed,
            Ok(unprocessed) => BatchOutcome::Unprocessed(unprocessed),
            Err(e) => BatchOutcome::Failed(e),
        }
    }
}

/// Client for the permission table.
#[derive(Debug, Clone)]
pub struct MetadataStoreClient {
    table: String,
    backend: Arc<dyn MetadataBackend>,
}

impl MetadataStoreClient {
    pub fn new(table: impl Into<String>, backend: Arc<dyn MetadataBackend>) -> Self {
        Self {
            table: table.into(),
            backend,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn backend(&self) -> &Arc<dyn MetadataBackend> {
        &self.backend
    }

    /// Create the master entry for `path`, failing with a conflict if one
    /// already exists.
    pub async fn create_entry(&self, path: &PathIdentity) -> Result<(), FsError> {
        let entry = MasterEntry::new_owned(path);
        let item = match serde_json::to_value(&entry) {
            Ok(serde_json::Value::Object(item)) => item,
            Ok(other) => {
                tracing::error!(
                    path = %path,
                    "Failed to create master entry, encoded as non-object: {}",
                    other
                );
                return Err(FsError::server("Failed to create master entry"));
            }
            Err(e) => {
                tracing::error!(path = %path, "Failed to create master entry with error: {}", e);
                return Err(FsError::server("Failed to create master entry"));
            }
        };

        match self
            .backend
            .put_if_absent(&self.table, &EntryKey::master(path), item)
            .await
        {
            Ok(()) => Ok(()),
            Err(StoreError::ConditionalCheckFailed) => {
                Err(FsError::conflict("File already exists"))
            }
            Err(e) => {
                tracing::error!(
                    table = %self.table,
                    path = %path,
                    "Failed to create master entry with error: {}",
                    e
                );
                Err(FsError::server("Failed to create master entry"))
            }
        }
    }

    /// Read the master entry for `path`.
    pub async fn get_entry(&self, path: &PathIdentity) -> Result<MasterEntry, FsError> {
        let item = self
            .backend
            .get(&self.table, &EntryKey::master(path), &ENTRY_PROJECTION)
            .await
            .map_err(|e| {
                tracing::error!(
                    table = %self.table,
                    path = %path,
                    "Retrieving master entry failed with error: {}",
                    e
                );
                FsError::server("Retrieving metadata failed")
            })?
            .ok_or_else(|| FsError::not_found("Master entry not found"))?;

        let stored: StoredPermissions =
            serde_json::from_value(serde_json::Value::Object(item)).map_err(|e| {
                tracing::error!(
                    table = %self.table,
                    path = %path,
                    "Failed to decode master entry with error: {}",
                    e
                );
                FsError::server("Corrupted file metadata")
            })?;

        Ok(MasterEntry {
            user: path.user_id().to_string(),
            path: path.normalized_path().to_string(),
            read: stored.read,
            write: stored.write,
            users: stored.users,
            delete_time: stored.delete_time,
        })
    }

    /// Delete the master entry for `path` together with the access record
    /// of every user it lists.
    ///
    /// The master row removal is attempted even when some access records
    /// could not be removed; the call still reports failure in that case.
    pub async fn delete_entry(&self, path: &PathIdentity) -> Result<(), FsError> {
        let entry = self.get_entry(path).await?;
        let user_entries = self.delete_user_entries(path, &entry.users).await;

        if let Err(e) = self
            .backend
            .delete(&self.table, &EntryKey::master(path))
            .await
        {
            tracing::error!(
                table = %self.table,
                path = %path,
                "Deleting master entry failed with error: {}",
                e
            );
            return Err(FsError::server("Changing file metadata failed"));
        }

        user_entries
    }

    /// Remove `(user, path)` for every `user`, one concurrent batch request
    /// per [`BATCH_WRITE_LIMIT`] keys.
    async fn delete_user_entries(
        &self,
        path: &PathIdentity,
        users: &BTreeSet<String>,
    ) -> Result<(), FsError> {
        let keys = users
            .iter()
            .map(|user| EntryKey::new(user.as_str(), path.normalized_path()))
            .collect::<Vec<_>>();

        let partitions = keys
            .chunks(BATCH_WRITE_LIMIT)
            .map(|chunk| {
                let backend = self.backend.clone();
                let table = self.table.clone();
                let chunk = chunk.to_vec();
                tokio::spawn(async move {
                    BatchOutcome::from(backend.batch_delete(&table, chunk).await)
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            path = %path,
            users = keys.len(),
            partitions = partitions.len(),
            "deleting user file entries"
        );

        let mut success = true;
        for outcome in join_all(partitions).await {
            match outcome {
                Ok(BatchOutcome::Processed) => {}
                Ok(BatchOutcome::Unprocessed(items)) => {
                    log_unprocessed_items(&self.table, &items);
                    success = false;
                }
                Ok(BatchOutcome::Failed(e)) => {
                    tracing::error!(
                        table = %self.table,
                        path = %path,
                        "Failed to delete user file entries with error: {}",
                        e
                    );
                    success = false;
                }
                Err(e) => {
                    tracing::error!(
                        table = %self.table,
                        path = %path,
                        "User file entry deletion task failed: {}",
                        e
                    );
                    success = false;
                }
            }
        }

        if !success {
            return Err(FsError::server("Failed to delete user file entries"));
        }
        Ok(())
    }
}

/// One line per record so operators can replay the deletes by hand.
fn log_unprocessed_items(table: &str, items: &[EntryKey]) {
    for item in items {
        tracing::error!(
            table = %table,
            user = %item.user,
            path = %item.path,
            "Failed to delete user file entry, left unprocessed by the store"
        );
    }
}
