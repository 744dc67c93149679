use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Failures the user cannot fix by editing the form: the store, password
/// hashing, the disk, or a template. Form-level problems never take this
/// path; the routes turn those into a flash message and a redirect.
#[derive(Debug, Error)]
pub enum AppError {
    // anyhow arrives from both the store and password hashing, so the
    // label stays neutral and lets the inner context name the failure
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),

    #[error("photo could not be stored: {0}")]
    Upload(#[from] std::io::Error),

    #[error("malformed upload body: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Multipart(e) => {
                (StatusCode::BAD_REQUEST, format!("bad request: {}", e)).into_response()
            }
            other => {
                error!("request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong").into_response()
            }
        }
    }
}
