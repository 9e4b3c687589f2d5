//! File creation saga.
//!
//! Creating a file touches two stores that share no transaction: the
//! metadata store, whose conditional write on the master entry decides
//! which of several racing requests owns a path, and the object store,
//! which holds the file body. Both are probed concurrently, the outcomes
//! reconciled, and a metadata entry that cannot be matched by an object is
//! removed again before an error is returned.

use crate::error::{ErrorKind, FsError};
use crate::metadata::MetadataStoreClient;
use crate::object::ObjectStoreClient;
use crate::path::PathIdentity;

const FILE_EXISTS: &str = "File already exists";
const CREATE_FAILED: &str = "Failed to create file";
const STILL_DELETING: &str =
    "File may still be in the process of being deleted, wait a few seconds and retry the request.";

/// Outcome of the conditional master entry write.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryCreation {
    Created,
    AlreadyExists,
    Failed(FsError),
}

impl From<Result<(), FsError>> for EntryCreation {
    fn from(result: Result<(), FsError>) -> Self {
        match result {
            Ok(()) => EntryCreation::Created,
            Err(e) if e.kind() == ErrorKind::Conflict => EntryCreation::AlreadyExists,
            Err(e) => EntryCreation::Failed(e),
        }
    }
}

/// What to do once both fan-out results are in.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Conflict,
    /// We created the entry but an object may already sit at the path
    Compensate,
    Propagate(FsError),
    Commit,
}

/// `object_present_or_unknown` is true when the object exists or the probe
/// failed.
fn reconcile(entry: EntryCreation, object_present_or_unknown: bool) -> Resolution {
    match (entry, object_present_or_unknown) {
        (EntryCreation::AlreadyExists, _) => Resolution::Conflict,
        (EntryCreation::Created, true) => Resolution::Compensate,
        (EntryCreation::Failed(e), _) => Resolution::Propagate(e),
        (EntryCreation::Created, false) => Resolution::Commit,
    }
}

/// Creates files across the metadata and object stores.
#[derive(Debug, Clone)]
pub struct FileCreator {
    metadata: MetadataStoreClient,
    objects: ObjectStoreClient,
}

impl FileCreator {
    pub fn new(metadata: MetadataStoreClient, objects: ObjectStoreClient) -> Self {
        Self { metadata, objects }
    }

    pub fn metadata(&self) -> &MetadataStoreClient {
        &self.metadata
    }

    pub fn objects(&self) -> &ObjectStoreClient {
        &self.objects
    }

    /// Parse and authorize a request from `user_id` for `file_path`, then
    /// create the file.
    ///
    /// Nothing is sent to either store unless `file_path` is owned by
    /// `user_id`.
    pub async fn create_for(
        &self,
        user_id: &str,
        file_path: &str,
    ) -> Result<PathIdentity, FsError> {
        let path = PathIdentity::from_absolute(file_path)?;
        path.authorize(user_id)?;
        self.create(&path).await?;
        Ok(path)
    }

    /// Create the master entry and the placeholder object for `path`.
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub async fn create(&self, path: &PathIdentity) -> Result<(), FsError> {
        let (created, present) = tokio::join!(
            self.metadata.create_entry(path),
            self.objects.exists(path)
        );
        // a failed probe counts as present
        let object_present_or_unknown = present.unwrap_or(true);

        match reconcile(EntryCreation::from(created), object_present_or_unknown) {
            Resolution::Conflict => Err(FsError::conflict(FILE_EXISTS)),
            Resolution::Compensate => {
                tracing::warn!("object present without master entry, rolling back entry");
                match self.metadata.delete_entry(path).await {
                    Ok(()) => Err(FsError::server(STILL_DELETING)),
                    Err(e) => {
                        tracing::error!(
                            "Failed to roll back master entry after finding an object: {}",
                            e
                        );
                        Err(FsError::server(CREATE_FAILED))
                    }
                }
            }
            Resolution::Propagate(e) => Err(e),
            Resolution::Commit => self.commit(path).await,
        }
    }

    async fn commit(&self, path: &PathIdentity) -> Result<(), FsError> {
        if self.objects.put(path).await.is_ok() {
            tracing::info!("file created");
            return Ok(());
        }

        if let Err(e) = self.metadata.delete_entry(path).await {
            tracing::error!(
                table = %self.metadata.table(),
                bucket = %self.objects.bucket(),
                "Inconsistent state, master entry without object requires manual repair: {}",
                e
            );
        }
        Err(FsError::server(CREATE_FAILED))
    }
}
