use std::convert::Infallible;
use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use common::prelude::MetadataStoreClient;

use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("metadata table {table} is unreachable: {reason}")]
    MetadataUnavailable { table: String, reason: String },
}

impl DataSourceError {
    /// Name of the dependency that failed, as reported to probes.
    pub fn dependency(&self) -> &'static str {
        match self {
            DataSourceError::MetadataUnavailable { .. } => "metadata",
        }
    }
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ready once the metadata backend answers a round trip.
struct MetadataSource {
    metadata: MetadataStoreClient,
}

#[async_trait]
impl DataSource for MetadataSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.metadata
            .backend()
            .ping()
            .await
            .map_err(|e| DataSourceError::MetadataUnavailable {
                table: self.metadata.table().to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(MetadataSource {
            metadata: state.metadata().clone(),
        })))
    }
}
