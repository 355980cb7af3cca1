use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::models::GENERATION_FAILED;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Rejected request parameters.
    #[error("{0}")]
    Validation(String),

    /// The text or image service answered with something unusable.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed upstream payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid process configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// HTTP-layer wrapper that renders errors raised before streaming starts.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            RelayError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            RelayError::Upstream(_) | RelayError::Http(_) | RelayError::Json(_) => {
                (StatusCode::BAD_GATEWAY, GENERATION_FAILED.to_string())
            }
            RelayError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
