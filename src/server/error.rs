//! HTTP mapping of library errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::gateway::GatewayError;
use crate::identity::DirectoryError;

/// Error returned by any handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No live session accompanied an authenticated request.
    #[error("authentication required")]
    Unauthenticated,
    /// Request body could not be decoded.
    #[error("invalid payload: {0}")]
    InvalidBody(String),
    /// Marker ingestion or deletion failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Registration or login failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ApiError {
    /// Status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Gateway(GatewayError::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
            Self::Gateway(GatewayError::PermissionDenied { .. }) => StatusCode::FORBIDDEN,
            Self::Gateway(GatewayError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Directory(DirectoryError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Directory(DirectoryError::DuplicateIdentity(_)) => StatusCode::CONFLICT,
            Self::Directory(DirectoryError::InvalidIdentity(_)) => StatusCode::BAD_REQUEST,
            Self::Directory(DirectoryError::Hashing(_) | DirectoryError::Storage(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Gateway(GatewayError::PermissionDenied { .. }) => "Permission denied".to_owned(),
            Self::Gateway(GatewayError::Storage(_))
            | Self::Directory(DirectoryError::Hashing(_) | DirectoryError::Storage(_)) => {
                "Storage failure; the request was not applied".to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({ "status": "error", "message": self.public_message() });
        (status, Json(body)).into_response()
    }
}
