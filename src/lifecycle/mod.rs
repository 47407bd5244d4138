//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build gate components → Bind listener
//!
//! Shutdown (signals.rs):
//!     SIGTERM/SIGINT → broadcast → stop accepting → drain in-flight requests
//! ```

pub mod signals;
pub mod startup;

pub use signals::Shutdown;
pub use startup::{Components, StartupError};
