//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin allow-list, preflight)
//!     → gate (bearer token, then rate_limit.rs keyed by identity)
//!     → handlers (sanitize.rs on free-text input)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input
//! - Limiter state is explicit and injected, never a process global

pub mod clock;
pub mod cors;
pub mod rate_limit;
pub mod sanitize;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limit::{RateLimiter, RatePolicy};
pub use sanitize::escape_html;
