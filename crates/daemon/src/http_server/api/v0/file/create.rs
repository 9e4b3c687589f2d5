use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::{ErrorKind, FsError};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct CreateRequest {
    /// Id of the user creating the file
    #[arg(long, required = true)]
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Absolute path of the new file, starting with the user's id
    #[arg(long, required = true)]
    #[serde(rename = "filePath", default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    #[serde(rename = "filePath")]
    pub file_path: String,
}

/// Create a file for the requesting user.
///
/// The creation runs in its own task: when the request deadline passes the
/// caller gets a timeout, but the task still finishes, compensation included.
pub async fn handler(
    State(state): State<ServiceState>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CreateError> {
    let Json(req) = payload.map_err(|e| {
        tracing::warn!("CREATE FILE: rejected request body: {}", e);
        FsError::argument("Malformed request body")
    })?;
    let user_id = req
        .user_id
        .ok_or_else(|| FsError::argument("Missing userID argument"))?;
    let file_path = req
        .file_path
        .ok_or_else(|| FsError::argument("Missing filePath argument"))?;

    tracing::info!(user = %user_id, path = %file_path, "CREATE FILE: received request");

    let creator = state.creator().clone();
    let (task_user, task_path) = (user_id.clone(), file_path.clone());
    let creation =
        tokio::spawn(async move { creator.create_for(&task_user, &task_path).await });

    let deadline = state.request_timeout();
    match tokio::time::timeout(deadline, creation).await {
        Ok(Ok(Ok(path))) => {
            tracing::info!(user = %user_id, path = %path, "CREATE FILE: created");
            Ok((
                http::StatusCode::CREATED,
                Json(CreateResponse { file_path }),
            ))
        }
        Ok(Ok(Err(e))) => Err(e.into()),
        Ok(Err(e)) => {
            tracing::error!(user = %user_id, path = %file_path, "CREATE FILE: task failed: {}", e);
            Err(FsError::server("Unexpected error").into())
        }
        Err(_) => {
            tracing::warn!(
                user = %user_id,
                path = %file_path,
                "CREATE FILE: no result within {:?}, creation continues in the background",
                deadline
            );
            Err(CreateError::Timeout(deadline))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("file creation did not finish within {0:?}")]
    Timeout(Duration),
}

impl IntoResponse for CreateError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            CreateError::Fs(e) => {
                match e.kind() {
                    ErrorKind::Server => tracing::error!("CREATE FILE ERROR: {}", e),
                    _ => tracing::info!("CREATE FILE REJECTED: {}", e),
                }
                let status = http::StatusCode::from_u16(e.http_status_code())
                    .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
                let body = serde_json::json!({
                    "error": e.kind().as_str(),
                    "message": message,
                });
                (status, Json(body)).into_response()
            }
            CreateError::Timeout(_) => {
                let body = serde_json::json!({
                    "error": "timeout",
                    "message": message,
                });
                (http::StatusCode::GATEWAY_TIMEOUT, Json(body)).into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for CreateRequest {
    type Response = CreateResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/file")?;
        Ok(client.post(full_url).json(&self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_names() {
        let req: CreateRequest =
            serde_json::from_str(r#"{"userID": "alice", "filePath": "/alice/a"}"#).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("alice"));
        assert_eq!(req.file_path.as_deref(), Some("/alice/a"));

        let req: CreateRequest = serde_json::from_str(r#"{"filePath": "/alice/a"}"#).unwrap();
        assert!(req.user_id.is_none());
    }

    #[test]
    fn test_error_status() {
        let response = CreateError::from(FsError::forbidden("nope")).into_response();
        assert_eq!(response.status(), http::StatusCode::FORBIDDEN);

        let response = CreateError::from(FsError::conflict("File already exists")).into_response();
        assert_eq!(response.status(), http::StatusCode::CONFLICT);

        let response = CreateError::Timeout(Duration::from_secs(1)).into_response();
        assert_eq!(response.status(), http::StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_build_request() {
        let client = Client::new();
        let base = Url::parse("http://localhost:3000").unwrap();
        let request = CreateRequest {
            user_id: Some("alice".to_string()),
            file_path: Some("/alice/a".to_string()),
        }
        .build_request(&base, &client)
        .unwrap()
        .build()
        .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "http://localhost:3000/api/v0/file");
    }
}
