//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → verifier.rs (signature, then expiry)
//!     → claims.rs (Claims → Principal)
//!     → gate (identity used as rate limit key)
//!
//! issuer.rs mints tokens with the same secret (demo endpoint, CLI).
//! ```

pub mod claims;
pub mod issuer;
pub mod verifier;

pub use claims::{Claims, Principal};
pub use issuer::{IssueError, IssuedToken, TokenIssuer};
pub use verifier::{AuthError, JwtVerifier, TokenVerifier};
