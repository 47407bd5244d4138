//! Structured logging setup.
//!
//! `RUST_LOG` wins over the configured level. Audit records share the
//! subscriber and can be split out with a `audit=info` style filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Default directives when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    format!("rag_gateway={level},audit=info,tower_http={level}")
}

/// Initialize the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        let directives = default_directives("debug");
        assert!(directives.contains("rag_gateway=debug"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
