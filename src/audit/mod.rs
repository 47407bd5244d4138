//! Audit trail for security-relevant actions.
//!
//! # Data Flow
//! ```text
//! gate / handlers
//!     → record.rs (AuditRecord, write-once)
//!     → recorder.rs (fan-out, failures swallowed)
//!     → sink.rs (tracing target "audit", JSON-lines file, memory)
//! ```
//!
//! # Design Decisions
//! - Records are append-only and never mutated after emission
//! - A sink failure never fails the request that produced the record
//! - Per-identity order is the call order; no global ordering is promised

pub mod record;
pub mod recorder;
pub mod sink;

pub use record::{AuditRecord, RequestOrigin};
pub use recorder::AuditRecorder;
pub use sink::{AuditError, AuditSink, FileAuditSink, MemoryAuditSink, TracingAuditSink};
