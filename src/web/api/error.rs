use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::scan::ScanError;
use crate::tracker::TrackId;

/// Why a scan request was refused after authentication.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("no track with id {0}")]
    UnknownTrack(TrackId),
    #[error("scan engine is not running")]
    EngineStopped,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownTrack(_) => StatusCode::NOT_FOUND,
            ApiError::EngineStopped => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::UnknownTrack(_) => "track_not_found",
            ApiError::EngineStopped => "engine_stopped",
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::UnknownTrack(id) => ApiError::UnknownTrack(id),
            ScanError::InvalidCommand(msg) => ApiError::Validation(msg),
            other => {
                log::error!("Scan engine unavailable: {}", other);
                ApiError::EngineStopped
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::with_message(self.code(), &self.to_string());
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Stable machine readable code, e.g. `track_not_found`.
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}
