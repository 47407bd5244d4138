//! Terminal gate rejections and their HTTP mapping.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GateError {
    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            GateError::Authentication(e) => {
                let detail = match e {
                    AuthError::ExpiredToken => "Token has expired",
                    AuthError::MalformedToken | AuthError::InvalidSignature => {
                        "Invalid authentication credentials"
                    }
                };
                let mut response =
                    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            GateError::RateLimitExceeded { retry_after_secs } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "detail": RATE_LIMIT_MESSAGE })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
        }
    }
}
