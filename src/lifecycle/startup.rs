//! Startup orchestration.
//!
//! Builds the gate's collaborators from a validated configuration. Any
//! failure here is fatal: the process never serves traffic half-wired.

use std::sync::Arc;
use thiserror::Error;

use crate::audit::{AuditError, AuditRecorder};
use crate::auth::{JwtVerifier, TokenVerifier};
use crate::config::GatewayConfig;
use crate::generation::{self, GenerationService};
use crate::security::{RateLimiter, RatePolicy};
use crate::store::{DocumentStore, PlaceholderStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open audit sink: {0}")]
    Audit(#[from] AuditError),

    #[error("failed to build generation client: {0}")]
    Generation(#[from] reqwest::Error),
}

/// Everything the router needs besides configuration.
#[derive(Clone)]
pub struct Components {
    pub verifier: Arc<dyn TokenVerifier>,
    pub limiter: Arc<RateLimiter>,
    pub audit: AuditRecorder,
    pub generation: Arc<dyn GenerationService>,
    pub store: Arc<dyn DocumentStore>,
}

impl Components {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, StartupError> {
        let audit = AuditRecorder::from_config(&config.audit)?;
        let generation = generation::from_config(&config.generation)?;
        let policy = RatePolicy::from(&config.rate_limit);

        tracing::info!(
            quota = policy.quota,
            period_secs = policy.period.as_secs(),
            audit_file = ?config.audit.file_path,
            "Gate components initialized"
        );

        Ok(Self {
            verifier: Arc::new(JwtVerifier::new(&config.auth.secret)),
            limiter: Arc::new(RateLimiter::new(policy)),
            audit,
            generation,
            store: Arc::new(PlaceholderStore),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_from_default_config() {
        let components = Components::from_config(&GatewayConfig::default()).unwrap();
        assert!(!components.generation.is_configured());
        assert!(!components.store.is_persistent());
        assert_eq!(components.limiter.policy().quota, 10);
    }

    #[test]
    fn test_unwritable_audit_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GatewayConfig::default();
        config.audit.file_path = Some(dir.path().join("missing/audit.jsonl").display().to_string());
        assert!(matches!(
            Components::from_config(&config),
            Err(StartupError::Audit(_))
        ));
    }
}
