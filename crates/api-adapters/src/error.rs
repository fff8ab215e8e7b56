//! Maps `AppError` onto HTTP responses.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use domains::AppError;
use thiserror::Error;

use crate::render::error_markup;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    /// Malformed or oversized multipart body; axum picks the status.
    #[error(transparent)]
    Upload(#[from] MultipartError),
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(..) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::App(err) => err,
            ApiError::Upload(err) => {
                tracing::debug!(error = %err, "rejected upload");
                return err.into_response();
            }
        };

        let status = status_for(&err);
        // Storage details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %err, %status, "request failed");
            "the board is temporarily unavailable".to_string()
        } else {
            tracing::debug!(error = %err, %status, "request rejected");
            err.to_string()
        };

        (status, Html(error_markup(status, &message))).into_response()
    }
}
