//! Token minting for development and the management CLI.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use thiserror::Error;

use crate::auth::claims::Claims;
use crate::util::unix_now;

#[derive(Debug, Error)]
#[error("token signing failed: {0}")]
pub struct IssueError(#[from] jsonwebtoken::errors::Error);

/// A freshly signed bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// HS256 token issuer sharing the verifier's secret.
pub struct TokenIssuer {
    key: EncodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(
        &self,
        subject: &str,
        email: Option<&str>,
        role: Option<&str>,
    ) -> Result<IssuedToken, IssueError> {
        let now = unix_now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.map(String::from),
            role: role.map(String::from),
            exp: now + self.ttl_secs,
            iat: Some(now),
        };

        Ok(IssuedToken {
            access_token: self.sign(&claims)?,
            token_type: "bearer",
            expires_in: self.ttl_secs,
        })
    }

    /// Sign arbitrary claims, including ones that are already expired.
    pub fn sign(&self, claims: &Claims) -> Result<String, IssueError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.key)?)
    }
}
