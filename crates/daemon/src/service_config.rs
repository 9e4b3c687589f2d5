use std::path::PathBuf;
use std::time::Duration;

use store::ObjectStoreConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // store configuration
    /// name of the permission table in the metadata store
    pub table_name: String,
    /// name of the bucket holding file bodies
    pub bucket_name: String,
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// Object storage backend configuration
    pub object_store: ObjectStoreConfig,

    // http server configuration
    /// Port for the API HTTP server.
    pub api_port: u16,
    /// How long a request waits for a file creation to finish.
    pub request_timeout: Duration,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
