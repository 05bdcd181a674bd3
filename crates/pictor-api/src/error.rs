use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

use pictor_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Username already exists")]
    Conflict,
    #[error("Invalid username or password")]
    Auth,
    #[error("{0}")]
    NotFound(&'static str),
    /// The generation API or object storage failed. The message is shown to
    /// the client; the cause is logged where it happened.
    #[error("{0}")]
    Upstream(String),
    #[error("Failed to download generated image: {0}")]
    Download(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Conflict | ApiError::Auth => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_)
            | ApiError::Download(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = match &self {
            ApiError::Io(_) | ApiError::Internal(_) => {
                error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
