//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared with subsystems at startup
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → rate limit policy swapped atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Environment variables win over the file
//! - Only the rate limit policy is hot-reloadable; everything else needs a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use watcher::ConfigWatcher;
pub use schema::{
    AuditConfig, AuthConfig, CorsConfig, GatewayConfig, GenerationConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RateLimitConfig, TimeoutConfig, TlsConfig, UploadConfig,
    PLACEHOLDER_SECRET,
};
