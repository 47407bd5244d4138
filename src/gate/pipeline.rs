//! The request gate: bearer extraction, verification and admission as
//! named stages, each short-circuiting the rest on failure.
//!
//! ```text
//! Unauthenticated ──extract_bearer/authenticate──▶ Authenticated ──admit──▶ Admitted ──handler──▶ Completed
//!        │                                              │
//!        └──▶ Rejected(401)                             └──▶ Rejected(429)
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{header, HeaderMap, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::audit::{AuditRecord, AuditRecorder, RequestOrigin};
use crate::auth::{AuthError, Principal, TokenVerifier};
use crate::gate::context::{GateContext, PendingAudit};
use crate::gate::error::GateError;
use crate::observability::metrics;
use crate::security::RateLimiter;

/// Identity recorded for requests that never authenticated.
pub const ANONYMOUS: &str = "anonymous";

pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Routes that perform a sensitive action, keyed by method and route template.
#[derive(Clone, Default)]
pub struct AuditedRoutes {
    routes: Arc<[(Method, &'static str, &'static str)]>,
}

impl AuditedRoutes {
    pub fn new(routes: impl IntoIterator<Item = (Method, &'static str, &'static str)>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
        }
    }

    pub fn action(&self, method: &Method, route: &str) -> Option<&'static str> {
        self.routes
            .iter()
            .find(|(m, r, _)| m == method && *r == route)
            .map(|(_, _, action)| *action)
    }
}

/// Composes verifier, limiter and audit recorder. Cheap to clone.
#[derive(Clone)]
pub struct RequestGate {
    verifier: Arc<dyn TokenVerifier>,
    limiter: Arc<RateLimiter>,
    audit: AuditRecorder,
    routes: AuditedRoutes,
}

impl RequestGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>, limiter: Arc<RateLimiter>, audit: AuditRecorder) -> Self {
        Self {
            verifier,
            limiter,
            audit,
            routes: AuditedRoutes::default(),
        }
    }

    /// Owe exactly one audit record for every admitted request to these routes.
    pub fn with_audited_routes(mut self, routes: AuditedRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    /// Stage 1: pull the credential out of `Authorization: Bearer <token>`.
    pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, GateError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(GateError::Authentication(AuthError::MalformedToken))?;

        let (scheme, token) = value
            .split_once(' ')
            .ok_or(GateError::Authentication(AuthError::MalformedToken))?;
        let token = token.trim();

        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return Err(GateError::Authentication(AuthError::MalformedToken));
        }
        Ok(token)
    }

    /// Stage 2: verify the credential. The subject used for unauthenticated
    /// records is reserved.
    pub fn authenticate(&self, credential: &str) -> Result<Principal, GateError> {
        let principal: Principal = self.verifier.verify(credential)?.into();
        if principal.user_id.eq_ignore_ascii_case(ANONYMOUS) {
            return Err(GateError::Authentication(AuthError::MalformedToken));
        }
        Ok(principal)
    }

    /// Stage 3: charge one call against the identity's window.
    pub fn admit(&self, principal: &Principal) -> Result<(), GateError> {
        if self.limiter.admit(&principal.user_id) {
            Ok(())
        } else {
            Err(GateError::RateLimitExceeded {
                retry_after_secs: self.limiter.policy().period.as_secs(),
            })
        }
    }

    /// Run all stages. Rejections are audited and counted here, after the
    /// limiter has released its lock.
    pub fn check(
        &self,
        headers: &HeaderMap,
        origin: &RequestOrigin,
        resource: &str,
    ) -> Result<Principal, GateError> {
        let credential = match Self::extract_bearer(headers) {
            Ok(credential) => credential,
            Err(e) => return Err(self.reject_anonymous(e, origin, resource)),
        };

        let principal = match self.authenticate(credential) {
            Ok(principal) => principal,
            Err(e) => return Err(self.reject_anonymous(e, origin, resource)),
        };

        if let Err(e) = self.admit(&principal) {
            metrics::record_rate_limited();
            metrics::record_gate_outcome("rate_limited");
            tracing::warn!(identity = %principal.user_id, path = %resource, "Rate limit exceeded");
            let policy = self.limiter.policy();
            self.audit.record(AuditRecord::new(
                principal.user_id.clone(),
                "rate_limit.admit",
                resource,
                json!({ "quota": policy.quota, "period_secs": policy.period.as_secs() }),
                origin,
                false,
            ));
            return Err(e);
        }

        metrics::record_gate_outcome("admitted");
        Ok(principal)
    }

    fn reject_anonymous(&self, error: GateError, origin: &RequestOrigin, resource: &str) -> GateError {
        let reason = match error {
            GateError::Authentication(e) => e.reason(),
            GateError::RateLimitExceeded { .. } => "rate_limited",
        };
        metrics::record_auth_failure(reason);
        metrics::record_gate_outcome("unauthenticated");
        tracing::warn!(reason, path = %resource, ip = %origin.address, "Authentication failed");
        self.audit.record(AuditRecord::new(
            ANONYMOUS,
            "auth.verify",
            resource,
            json!({ "reason": reason }),
            origin,
            false,
        ));
        error
    }
}

/// Capture request id, peer address and user agent.
pub fn request_origin(request: &Request<Body>) -> RequestOrigin {
    let header_or_unknown = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    };

    RequestOrigin {
        request_id: header_or_unknown("x-request-id"),
        address: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        user_agent: header_or_unknown(header::USER_AGENT.as_str()),
    }
}

/// Axum middleware wrapping every protected route.
pub async fn gate_middleware(
    State(gate): State<RequestGate>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request_origin(&request);
    let resource = request.uri().path().to_string();

    let principal = match gate.check(request.headers(), &origin, &resource) {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    let remaining = gate.limiter.remaining(&principal.user_id);
    let action = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|route| gate.routes.action(request.method(), route.as_str()));
    let context = GateContext::new(principal, origin, resource, action, gate.audit.clone());
    request.extensions_mut().insert(context.clone());

    // Records a failure if this future is dropped before the handler returns.
    let pending = action.map(|action| PendingAudit::new(context, action));

    let mut response = next.run(request).await;

    if let Some(pending) = pending {
        pending.settle(&mut response);
    }

    response
        .headers_mut()
        .insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    response
}
