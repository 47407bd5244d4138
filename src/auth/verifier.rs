//! Bearer token verification.
//!
//! # Responsibilities
//! - Check signature integrity against the shared secret
//! - Check the expiry claim against the current time
//! - Classify every failure as malformed, expired or bad signature
//!
//! # Design Decisions
//! - Signature is checked before expiry, so a forged token never reports `ExpiredToken`
//! - Expiry is strict: a token whose `exp` equals the current second is expired
//! - No network calls; an external identity provider can implement [`TokenVerifier`]

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::auth::claims::Claims;
use crate::util::unix_now;

/// Why a credential was refused.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    MalformedToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("invalid token signature")]
    InvalidSignature,
}

impl AuthError {
    /// Stable label for metrics and audit details.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed",
            AuthError::ExpiredToken => "expired",
            AuthError::InvalidSignature => "invalid_signature",
        }
    }
}

/// Credential in, claims or typed failure out.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<Claims, AuthError>;
}

/// HS256 verifier backed by a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify against an explicit clock reading.
    pub fn verify_at(&self, credential: &str, now: u64) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(credential, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::MalformedToken,
            }
        })?;

        if data.claims.exp <= now {
            return Err(AuthError::ExpiredToken);
        }

        Ok(data.claims)
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<Claims, AuthError> {
        self.verify_at(credential, unix_now())
    }
}
