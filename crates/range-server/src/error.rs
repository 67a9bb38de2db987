use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::warn;

/// JSON body attached to feed endpoint failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Rejections produced by the update feed endpoint. All of them are client
/// errors: the feed contract is a fixed query-parameter triple.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("missing query parameter: {0}")]
    MissingParam(&'static str),

    #[error("invalid {name}: {value}")]
    InvalidParam { name: &'static str, value: String },
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        warn!("feed request rejected: {self}");
        let error = match &self {
            FeedError::MissingParam(_) => "missing_parameter",
            FeedError::InvalidParam { .. } => "invalid_parameter",
        };
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: error.to_owned(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Errors raised while building the server state from settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("served version is not a valid semantic version: {0}")]
    InvalidVersion(#[from] semver::Error),
}
