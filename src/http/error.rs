//! Handler errors and their HTTP mapping.
//!
//! Every error body is `{"detail": "..."}`. Upstream failures map to fixed
//! messages; the underlying error text goes to the log and the audit trail.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::IssueError;
use crate::generation::GenerationError;
use crate::store::StoreError;

/// A request field that failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("content type {0} not allowed")]
    UnsupportedMediaType(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] IssueError),

    #[error("not found")]
    NotFound,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit: 0 }
        } else {
            ApiError::MalformedBody(error.body_text())
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Generation(GenerationError::ProviderUnavailable) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Generation(GenerationError::ProviderError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Store(StoreError::NotFound(_)) | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Backend(_)) | ApiError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::MalformedBody(text) => text.clone(),
            ApiError::PayloadTooLarge { limit: 0 } => "Payload too large".to_string(),
            ApiError::PayloadTooLarge { limit } => {
                format!("File size exceeds {}MB limit", limit / (1024 * 1024))
            }
            ApiError::UnsupportedMediaType(content_type) => {
                format!("File type {} not allowed", content_type)
            }
            ApiError::Generation(GenerationError::ProviderUnavailable) => {
                "Generation service unavailable".to_string()
            }
            ApiError::Generation(GenerationError::ProviderError(_)) => {
                "Query processing failed".to_string()
            }
            ApiError::Store(StoreError::NotFound(_)) | ApiError::NotFound => {
                "Not found".to_string()
            }
            ApiError::Store(StoreError::Backend(_)) => "Storage operation failed".to_string(),
            ApiError::Token(_) => "Token issuance failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}
