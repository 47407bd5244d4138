//! Decoded token payloads and the principal derived from them.

use serde::{Deserialize, Serialize};

/// Role assumed when a token carries none.
pub const DEFAULT_ROLE: &str = "user";

/// Email assumed when a token carries none.
pub const UNKNOWN_EMAIL: &str = "unknown";

/// Verified payload of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject; the identity used for rate limiting and audit.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Expiry (seconds since epoch).
    pub exp: u64,

    /// Issued at (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// The caller of a gated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.unwrap_or_else(|| UNKNOWN_EMAIL.to_string()),
            role: claims.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        }
    }
}
