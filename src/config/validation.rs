//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! Every problem is collected so operators can fix a file in one pass.

use std::fmt;
use std::time::Duration;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::generation::retry::retry_budget;

/// Minimum accepted HS256 secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }

    for origin in &config.cors.allowed_origins {
        if Url::parse(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("not a valid origin: {}", origin),
            ));
        }
    }

    if config.auth.secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::new(
            "auth.secret",
            format!("must be at least {} bytes", MIN_SECRET_LEN),
        ));
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.token_ttl_secs", "must be > 0"));
    }

    if config.rate_limit.quota == 0 {
        errors.push(ValidationError::new("rate_limit.quota", "must be > 0"));
    }
    if config.rate_limit.period_secs == 0 {
        errors.push(ValidationError::new("rate_limit.period_secs", "must be > 0"));
    }

    if Url::parse(&config.generation.base_url).is_err() {
        errors.push(ValidationError::new(
            "generation.base_url",
            format!("not a valid URL: {}", config.generation.base_url),
        ));
    }
    if config.generation.max_attempts == 0 {
        errors.push(ValidationError::new("generation.max_attempts", "must be > 0"));
    }

    if config.uploads.max_file_bytes == 0 {
        errors.push(ValidationError::new("uploads.max_file_bytes", "must be > 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    } else {
        // A request cut off mid-generation cannot report the provider's outcome.
        let budget = retry_budget(&config.generation);
        if budget > Duration::from_secs(config.timeouts.request_secs) {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!(
                    "must cover the generation retry budget of {:.1}s",
                    budget.as_secs_f64()
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
