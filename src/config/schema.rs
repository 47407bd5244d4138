//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Cross-origin policy for browser clients.
    pub cors: CorsConfig,

    /// Bearer token verification settings.
    pub auth: AuthConfig,

    /// Per-identity rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Audit trail sinks.
    pub audit: AuditConfig,

    /// Upstream generation provider.
    pub generation: GenerationConfig,

    /// Document upload constraints.
    pub uploads: UploadConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API with credentials.
    pub allowed_origins: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
            max_age_secs: 600,
        }
    }
}

/// Shipped default secret; startup warns when it is still in use.
pub const PLACEHOLDER_SECRET: &str = "CHANGE_ME_IN_PRODUCTION_min_32_chars!!";

/// Bearer token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 signing secret.
    pub secret: String,

    /// Lifetime of tokens minted by the gateway.
    pub token_ttl_secs: u64,

    /// Expose `POST /auth/demo-token`. Never enable in production.
    pub demo_tokens_enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: PLACEHOLDER_SECRET.to_string(),
            token_ttl_secs: 3600,
            demo_tokens_enabled: false,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted calls per identity within one period.
    pub quota: usize,

    /// Length of the trailing window in seconds.
    pub period_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: 10,
            period_secs: 60,
        }
    }
}

/// Audit trail configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// Append JSON lines to this file in addition to the `audit` log target.
    pub file_path: Option<String>,
}

/// Generation provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider API key. Generation is disabled when unset.
    pub api_key: Option<String>,

    /// Provider base URL.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,

    /// Total attempts including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            request_timeout_secs: 15,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Upload constraints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes.
    pub max_file_bytes: usize,

    /// Accepted `Content-Type` values for the uploaded file part.
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024, // 10MB
            allowed_content_types: vec![
                "application/pdf".to_string(),
                "text/plain".to_string(),
                "application/json".to_string(),
            ],
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.rate_limit.quota, 10);
        assert_eq!(config.rate_limit.period_secs, 60);
        assert_eq!(config.cors.allowed_origins.len(), 2);
        assert!(!config.auth.demo_tokens_enabled);
        assert!(config.generation.api_key.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limit]
            quota = 3

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.rate_limit.quota, 3);
        assert_eq!(config.rate_limit.period_secs, 60);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
