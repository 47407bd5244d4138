//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides and validate configuration.
///
/// With no path the built-in defaults are used as the base.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without environment overrides or validation.
pub fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay well-known environment variables onto `config`.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origins) = lookup("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(secret) = lookup("API_SECRET_KEY") {
        config.auth.secret = secret;
    }

    if let Some(key) = lookup("GEMINI_API_KEY") {
        if !key.is_empty() {
            config.generation.api_key = Some(key);
        }
    }

    if let Some(value) = lookup("RATE_LIMIT_CALLS") {
        config.rate_limit.quota = value.parse().map_err(|_| ConfigError::Env {
            var: "RATE_LIMIT_CALLS",
            value,
        })?;
    }

    if let Some(value) = lookup("RATE_LIMIT_PERIOD_SECS") {
        config.rate_limit.period_secs = value.parse().map_err(|_| ConfigError::Env {
            var: "RATE_LIMIT_PERIOD_SECS",
            value,
        })?;
    }

    if let Some(bind) = lookup("RAG_GATEWAY_BIND") {
        config.listener.bind_address = bind;
    }

    Ok(())
}
