//! Fan-out of audit records to sinks.

use std::path::Path;
use std::sync::Arc;

use crate::audit::record::AuditRecord;
use crate::audit::sink::{AuditError, AuditSink, FileAuditSink, TracingAuditSink};
use crate::config::AuditConfig;
use crate::observability::metrics;

/// Writes each record to every sink, in call order.
///
/// `record` never fails: sink errors go to the operational log and a
/// counter, and the caller carries on.
#[derive(Clone)]
pub struct AuditRecorder {
    sinks: Arc<Vec<Arc<dyn AuditSink>>>,
}

impl AuditRecorder {
    pub fn with_sinks(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self {
            sinks: Arc::new(sinks),
        }
    }

    /// Tracing sink always; file sink when configured.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        let mut sinks: Vec<Arc<dyn AuditSink>> = vec![Arc::new(TracingAuditSink)];
        if let Some(path) = &config.file_path {
            sinks.push(Arc::new(FileAuditSink::open(Path::new(path))?));
            tracing::info!(path = %path, "Audit file sink enabled");
        }
        Ok(Self::with_sinks(sinks))
    }

    pub fn record(&self, record: AuditRecord) {
        metrics::record_audit(record.success());
        for sink in self.sinks.iter() {
            if let Err(e) = sink.write(&record) {
                metrics::record_audit_sink_error(sink.name());
                tracing::error!(
                    sink = sink.name(),
                    action = record.action(),
                    identity = record.identity(),
                    error = %e,
                    "Audit sink write failed"
                );
            }
        }
    }
}
