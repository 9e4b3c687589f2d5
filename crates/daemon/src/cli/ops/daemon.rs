use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};

use permfs_daemon::{spawn_service, ServiceConfig};
use store::ObjectStoreConfig;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStoreKind {
    Memory,
    Local,
    S3,
}

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Name of the permission table
    #[arg(long, env = "TABLE_NAME")]
    pub table_name: String,

    /// Name of the bucket holding file bodies
    #[arg(long, env = "BUCKET_NAME")]
    pub bucket_name: String,

    /// SQLite database file (in-memory if not set)
    #[arg(long, env = "PERMFS_DATABASE")]
    pub database: Option<PathBuf>,

    /// Object storage backend
    #[arg(long, value_enum, default_value = "memory")]
    pub object_store: ObjectStoreKind,

    /// Root directory for the local object storage backend
    #[arg(long, env = "PERMFS_OBJECT_STORE_PATH")]
    pub object_store_path: Option<PathBuf>,

    /// S3 endpoint URL, e.g. http://localhost:9000 for MinIO (AWS if not set)
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub s3_access_key: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_key: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub s3_region: Option<String>,

    /// Port for the API server
    #[arg(long, default_value_t = 3000)]
    pub api_port: u16,

    /// Seconds a request waits for a file creation before timing out
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Daemon {
    fn object_store_config(&self) -> Result<ObjectStoreConfig, DaemonError> {
        match self.object_store {
            ObjectStoreKind::Memory => Ok(ObjectStoreConfig::Memory),
            ObjectStoreKind::Local => {
                let path = self.object_store_path.clone().ok_or_else(|| {
                    DaemonError::InvalidConfig(
                        "--object-store-path is required for the local object store".into(),
                    )
                })?;
                Ok(ObjectStoreConfig::Local { path })
            }
            ObjectStoreKind::S3 => {
                let (Some(access_key), Some(secret_key)) =
                    (self.s3_access_key.clone(), self.s3_secret_key.clone())
                else {
                    return Err(DaemonError::InvalidConfig(
                        "--s3-access-key and --s3-secret-key are required for the s3 object store"
                            .into(),
                    ));
                };
                Ok(ObjectStoreConfig::S3 {
                    endpoint: self.s3_endpoint.clone(),
                    access_key,
                    secret_key,
                    region: self.s3_region.clone(),
                })
            }
        }
    }

    pub fn service_config(&self) -> Result<ServiceConfig, DaemonError> {
        Ok(ServiceConfig {
            table_name: self.table_name.clone(),
            bucket_name: self.bucket_name.clone(),
            sqlite_path: self.database.clone(),
            object_store: self.object_store_config()?,
            api_port: self.api_port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            log_level: self.log_level,
            log_dir: self.log_dir.clone(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = self.service_config()?;
        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
