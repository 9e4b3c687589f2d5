use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::time::timeout;

use super::data_source::*;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a `/readyz` answer.
#[derive(Debug, Serialize)]
struct Readiness {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependency: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Readiness {
    fn ready() -> Self {
        Self {
            status: "ok",
            dependency: None,
            message: None,
        }
    }

    fn failed(dependency: Option<&'static str>, message: String) -> Self {
        Self {
            status: "failure",
            dependency,
            message: Some(message),
        }
    }
}

/// Ready once the metadata backend answers within [`HEALTH_CHECK_TIMEOUT`].
#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let readiness = match timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => return (StatusCode::OK, Json(Readiness::ready())).into_response(),
        Ok(Err(e)) => {
            tracing::warn!(dependency = e.dependency(), "not ready: {}", e);
            // store errors stay in the log
            Readiness::failed(Some(e.dependency()), "dependency unavailable".to_string())
        }
        Err(_) => {
            tracing::warn!("readiness check exceeded {:?}", HEALTH_CHECK_TIMEOUT);
            Readiness::failed(
                None,
                format!(
                    "health check timed out after {}s",
                    HEALTH_CHECK_TIMEOUT.as_secs()
                ),
            )
        }
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(readiness)).into_response()
}
