//! Errors raised while opening the backends.

/// Errors that can occur when setting up a backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreSetupError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Table names double as SQL identifiers
    #[error("invalid table name '{0}': expected 3 to 255 characters of letters, digits, '_', '-' or '.'")]
    InvalidTableName(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the daemon.")]
    BucketNotFound(String),
}

/// Result type alias for backend setup.
pub type Result<T> = std::result::Result<T, StoreSetupError>;
