//! Cross-origin policy for browser clients.

use std::time::Duration;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use crate::config::CorsConfig;

/// Build the CORS layer from an explicit origin allow-list.
///
/// Origins that are not valid header values are skipped with a warning;
/// the list is never widened to a wildcard.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.max_age_secs))
}
