/**
 * File creation across both stores:
 *  a conditional metadata write raced against
 *  an object probe, with compensation.
 */
pub mod create;
/**
 * Caller-facing error taxonomy and the
 *  backend error it is derived from.
 */
pub mod error;
/**
 * Master entries and per-user access records,
 *  behind a pluggable key/value backend.
 */
pub mod metadata;
/**
 * File bodies, behind a pluggable
 *  bucket-bound object backend.
 */
pub mod object;
/**
 * Owner-qualified path parsing and
 *  ownership checks.
 */
pub mod path;

pub mod prelude {
    pub use crate::create::FileCreator;
    pub use crate::error::{ErrorKind, FsError, StoreError};
    pub use crate::metadata::{
        EntryKey, Item, MasterEntry, MetadataBackend, MetadataStoreClient, BATCH_WRITE_LIMIT,
    };
    pub use crate::object::{ObjectBackend, ObjectStoreClient};
    pub use crate::path::PathIdentity;
}
