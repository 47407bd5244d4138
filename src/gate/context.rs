//! Per-request context handed from the gate to handlers, the audit entry
//! handed back, and the pending record that guarantees one outcome per
//! sensitive action.

use std::sync::{Arc, Mutex, PoisonError};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

use crate::audit::{AuditRecord, AuditRecorder, RequestOrigin};
use crate::auth::Principal;

/// A failure described by the handler, picked up by the gate.
#[derive(Debug, Clone)]
struct FailureNote {
    resource: String,
    details: Value,
}

/// Inserted into request extensions once a request is admitted.
///
/// Clones share the failure note, so what a handler notes is visible to
/// the gate's copy.
#[derive(Clone)]
pub struct GateContext {
    pub principal: Principal,
    pub origin: RequestOrigin,
    path: String,
    action: Option<&'static str>,
    audit: AuditRecorder,
    failure: Arc<Mutex<Option<FailureNote>>>,
}

impl GateContext {
    pub fn new(
        principal: Principal,
        origin: RequestOrigin,
        path: impl Into<String>,
        action: Option<&'static str>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            principal,
            origin,
            path: path.into(),
            action,
            audit,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.principal.user_id
    }

    /// Request path, the resource of last resort.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sensitive action this route performs, if any.
    pub fn action(&self) -> Option<&'static str> {
        self.action
    }

    /// Describe why the action failed. The gate writes the record once the
    /// response is known; a later note replaces an earlier one.
    pub fn note_failure(&self, resource: &str, details: Value) {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        *failure = Some(FailureNote {
            resource: resource.to_string(),
            details,
        });
    }

    fn take_failure(&self) -> Option<FailureNote> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn record(&self, action: &str, resource: &str, details: Value, success: bool) {
        self.audit.record(AuditRecord::new(
            self.principal.user_id.clone(),
            action,
            resource,
            details,
            &self.origin,
            success,
        ));
    }
}

impl<S: Send + Sync> FromRequestParts<S> for GateContext {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<GateContext>().cloned().ok_or_else(|| {
            tracing::error!(path = %parts.uri.path(), "Handler reached without gate context");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }
}

/// What a completed sensitive action did; recorded by the gate on the way out.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: &'static str,
    pub resource: String,
    pub details: Value,
}

/// A successful response that carries its audit entry.
pub struct Audited<R> {
    entry: AuditEntry,
    response: R,
}

impl<R> Audited<R> {
    pub fn new(action: &'static str, resource: impl Into<String>, details: Value, response: R) -> Self {
        Self {
            entry: AuditEntry {
                action,
                resource: resource.into(),
                details,
            },
            response,
        }
    }
}

impl<R: IntoResponse> IntoResponse for Audited<R> {
    fn into_response(self) -> Response {
        let mut response = self.response.into_response();
        response.extensions_mut().insert(self.entry);
        response
    }
}

/// The one audit record owed by an admitted sensitive action.
///
/// Settled from the response when the handler returns. Dropped unsettled,
/// because the request timed out or the connection went away, it records a
/// failure.
pub(crate) struct PendingAudit {
    context: GateContext,
    action: &'static str,
    settled: bool,
}

impl PendingAudit {
    pub(crate) fn new(context: GateContext, action: &'static str) -> Self {
        Self {
            context,
            action,
            settled: false,
        }
    }

    /// Success when the response carries an [`AuditEntry`], failure otherwise.
    pub(crate) fn settle(mut self, response: &mut Response) {
        self.settled = true;

        if let Some(entry) = response.extensions_mut().remove::<AuditEntry>() {
            if response.status().is_success() {
                self.context
                    .record(entry.action, &entry.resource, entry.details, true);
                return;
            }
        }

        let note = self.context.take_failure().unwrap_or_else(|| FailureNote {
            resource: self.context.path().to_string(),
            details: json!({ "status": response.status().as_u16() }),
        });
        self.context
            .record(self.action, &note.resource, note.details, false);
    }
}

impl Drop for PendingAudit {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        tracing::warn!(
            action = self.action,
            user_id = %self.context.user_id(),
            path = %self.context.path(),
            "Sensitive action did not complete"
        );
        let note = self.context.take_failure().unwrap_or_else(|| FailureNote {
            resource: self.context.path().to_string(),
            details: json!({ "error": "request did not complete" }),
        });
        self.context
            .record(self.action, &note.resource, note.details, false);
    }
}
