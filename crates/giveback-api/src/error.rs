use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use giveback_db::DbError;
use thiserror::Error;
use tracing::{error, warn};

use crate::validate::InvalidContent;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} does not exist.")]
    NotFound(String),

    #[error(transparent)]
    InvalidContent(#[from] InvalidContent),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Missing or invalid bearer token.")]
    Unauthorized,

    /// Some records of a cascade were deleted before the rest failed.
    #[error("{failed} of {attempted} records could not be deleted; {deleted} were deleted.")]
    PartialFailure {
        attempted: usize,
        deleted: usize,
        failed: usize,
    },

    #[error("Internal server error.")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidContent(InvalidContent::Empty) => StatusCode::BAD_REQUEST,
            ApiError::InvalidContent(InvalidContent::TooLong) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::PartialFailure { .. } => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => ApiError::NotFound(what),
            DbError::PartialFailure {
                attempted,
                deleted,
                failed,
            } => {
                warn!("Partial cascade delete, undeleted ids: {:?}", failed);
                ApiError::PartialFailure {
                    attempted,
                    deleted,
                    failed: failed.len(),
                }
            }
            other => {
                error!("Store error: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
