//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (request ID, tracing, CORS, timeout)
//!     → gate (protected routes only)
//!     → handlers.rs (types.rs validation, collaborator call)
//!     → error.rs (failure → {"detail": ...})
//! ```

pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

pub use error::{ApiError, ValidationError};
pub use server::{AppState, HttpServer};
