//! Immutable audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a request came from, captured once by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestOrigin {
    pub request_id: String,
    pub address: String,
    pub user_agent: String,
}

impl RequestOrigin {
    pub fn unknown() -> Self {
        Self {
            request_id: "unknown".into(),
            address: "unknown".into(),
            user_agent: "unknown".into(),
        }
    }
}

/// Who did what, when, from where, and whether it worked.
///
/// Fields are fixed at construction; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    timestamp: DateTime<Utc>,
    request_id: String,
    identity: String,
    action: String,
    resource: String,
    details: Value,
    origin_address: String,
    user_agent: String,
    success: bool,
}

impl AuditRecord {
    pub fn new(
        identity: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        details: Value,
        origin: &RequestOrigin,
        success: bool,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: origin.request_id.clone(),
            identity: identity.into(),
            action: action.into(),
            resource: resource.into(),
            details,
            origin_address: origin.address.clone(),
            user_agent: origin.user_agent.clone(),
            success,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn details(&self) -> &Value {
        &self.details
    }

    pub fn origin_address(&self) -> &str {
        &self.origin_address
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn success(&self) -> bool {
        self.success
    }
}
