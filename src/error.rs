// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::identity::IdentityError;
use crate::store::StoreError;

/// Client-facing failures of the table API.
///
/// The display string is the exact message sent to the client. Upstream
/// failures carry their detail for logging only.
#[derive(Debug, Error)]
pub enum ApiError {
    // 403 Forbidden
    #[error("API key required")]
    MissingKey,

    #[error("Invalid API call. Should be /<username>/<project>/<table>")]
    MalformedPath,

    #[error("{0}")]
    MalformedBody(String),

    #[error("At least 1 filter required for patch")]
    FilterRequired,

    // 401 Unauthorized
    #[error("Invalid Key")]
    Unauthorized,

    // 404 Not Found
    #[error("{0}")]
    NotFound(String),

    // 405 Method Not Allowed
    #[error("Method not allowed")]
    MethodNotAllowed,

    // 500 Internal Server Error
    #[error("Internal Server Error")]
    Upstream(String),

    #[error("Unable to add data")]
    InsertFailed,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingKey
            | ApiError::MalformedPath
            | ApiError::MalformedBody(_)
            | ApiError::FilterRequired => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Upstream(_) | ApiError::InsertFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body_missing() -> Self {
        ApiError::MalformedBody("Body missing".to_string())
    }

    pub fn malformed_body(message: impl Into<String>) -> Self {
        ApiError::MalformedBody(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        ApiError::Upstream(detail.into())
    }

    /// Error envelope: `{ data: [], error: message }`
    pub fn to_json(&self) -> Value {
        json!({
            "data": [],
            "error": self.to_string(),
        })
    }
}

// Collaborator failures never reach the client in detail
impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        tracing::error!("Identity provider error: {}", err);
        ApiError::upstream(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Row store error: {}", err);
        ApiError::upstream(err.to_string())
    }
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
