//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::info;

/// Errors raised while accepting prompts or running generation jobs.
#[derive(Debug)]
pub enum ImageGenError {
    /// The request body was not acceptable, the message goes back to the caller
    Validation(String),
    /// The generation API failed or returned nothing usable
    ExternalService(String),
    /// Fetching the generated image failed
    Download(String),
    /// Creating the output directory or writing the file failed
    Filesystem(std::io::Error),
    /// The job queue is no longer accepting work
    QueueClosed,
}

impl std::fmt::Display for ImageGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "Invalid request: {message}"),
            Self::ExternalService(message) => write!(f, "Image generation failed: {message}"),
            Self::Download(message) => write!(f, "Image download failed: {message}"),
            Self::Filesystem(err) => write!(f, "Filesystem error: {err}"),
            Self::QueueClosed => write!(f, "Job queue is closed"),
        }
    }
}

impl std::error::Error for ImageGenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filesystem(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImageGenError {
    fn from(err: std::io::Error) -> Self {
        ImageGenError::Filesystem(err)
    }
}

impl IntoResponse for ImageGenError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ImageGenError::Validation(message) => {
                info!("Bad request received: {message}");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            other => {
                tracing::error!("Internal server error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
