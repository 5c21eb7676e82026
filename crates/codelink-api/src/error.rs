use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use codelink_git::CloneError;
use codelink_store::StoreError;
use serde::Serialize;
use thiserror::Error;

pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";
pub const INVALID_QUERY_MESSAGE: &str = "Invalid query parameters";
pub const INVALID_URL_MESSAGE: &str = "Invalid repository URL";
pub const INVALID_PROJECT_MESSAGE: &str = "Invalid project name";
pub const CLONE_FAILED_MESSAGE: &str = "Unexpected error occurred during cloning.";

/// Every failure leaving the endpoint layer. The message is what the client
/// sees; causes are logged where the failure happened.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn conflict(project: impl std::fmt::Display) -> Self {
        Self::Conflict(format!("Project '{project}' already exists on disk."))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Read { document, .. } => {
                Self::Internal(format!("Could not read {}", document.file_name()))
            }
            StoreError::Write { document, .. } => {
                Self::Internal(format!("Could not write {}", document.file_name()))
            }
            StoreError::List { .. } => Self::Internal("Could not list projects".to_owned()),
        }
    }
}

impl From<CloneError> for ApiError {
    fn from(err: CloneError) -> Self {
        match err {
            CloneError::InvalidUrl(_) => Self::BadRequest(INVALID_URL_MESSAGE.to_owned()),
            CloneError::InvalidProjectName(_) => {
                Self::BadRequest(INVALID_PROJECT_MESSAGE.to_owned())
            }
            CloneError::ToolFailed { .. } => Self::Upstream(err.to_string()),
            CloneError::ToolUnavailable { .. }
            | CloneError::NotARepository { .. }
            | CloneError::Io { .. } => Self::Internal(CLONE_FAILED_MESSAGE.to_owned()),
        }
    }
}
