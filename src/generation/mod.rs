//! Generation provider collaborator.
//!
//! Handlers see only [`GenerationService`]; every failure is one of two
//! typed variants so callers must decide how to surface each.

pub mod client;
pub mod retry;

use std::sync::Arc;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::GenerationConfig;

pub use client::GeminiClient;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Provider missing, unreachable, or shedding load.
    #[error("generation provider unavailable")]
    ProviderUnavailable,

    /// Provider answered but the call failed.
    #[error("generation provider error: {0}")]
    ProviderError(String),
}

/// Prompt in, text out.
pub trait GenerationService: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, GenerationError>>;

    fn model(&self) -> &str;

    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in used when no provider key is configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledGeneration;

impl GenerationService for DisabledGeneration {
    fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, GenerationError>> {
        Box::pin(async { Err(GenerationError::ProviderUnavailable) })
    }

    fn model(&self) -> &str {
        "none"
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Pick the provider implementation for this configuration.
pub fn from_config(config: &GenerationConfig) -> Result<Arc<dyn GenerationService>, reqwest::Error> {
    match &config.api_key {
        Some(key) => {
            let client = GeminiClient::new(config, key.clone())?;
            tracing::info!(model = %config.model, "Generation provider configured");
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("No generation API key configured; chat queries will return 503");
            Ok(Arc::new(DisabledGeneration))
        }
    }
}
