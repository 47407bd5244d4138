//! Request gate subsystem.
//!
//! # Data Flow
//! ```text
//! request
//!     → pipeline.rs (extract_bearer → authenticate → admit)
//!     → context.rs (GateContext inserted, PendingAudit held for audited routes)
//!     → handler (Audited on success, note_failure on error)
//!     → context.rs (PendingAudit settled from the response → one record)
//! ```
//!
//! # Design Decisions
//! - Stages are plain functions returning `Result`; the first error ends the request
//! - An admitted request to an audited route owes exactly one record, written
//!   by the gate even when the handler errors early or is cancelled

pub mod context;
pub mod error;
pub mod pipeline;

pub use context::{AuditEntry, Audited, GateContext};
pub use error::GateError;
pub use pipeline::{gate_middleware, request_origin, AuditedRoutes, RequestGate};
