//! Destinations for audit records.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{info, warn};

use crate::audit::record::AuditRecord;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// An append-only destination for audit records.
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn write(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Emits each record on the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let details = serde_json::to_string(record.details())?;
        if record.success() {
            info!(
                target: "audit",
                timestamp = %record.timestamp().to_rfc3339(),
                request_id = record.request_id(),
                identity = record.identity(),
                action = record.action(),
                resource = record.resource(),
                details = %details,
                ip = record.origin_address(),
                user_agent = record.user_agent(),
                success = true,
            );
        } else {
            warn!(
                target: "audit",
                timestamp = %record.timestamp().to_rfc3339(),
                request_id = record.request_id(),
                identity = record.identity(),
                action = record.action(),
                resource = record.resource(),
                details = %details,
                ip = record.origin_address(),
                user_agent = record.user_agent(),
                success = false,
            );
        }
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
pub struct FileAuditSink {
    file: Mutex<File>,
}

impl FileAuditSink {
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)?;
        Ok(())
    }
}

/// Keeps records in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::record::RequestOrigin;
    use serde_json::json;
    use std::io::{BufRead, BufReader};

    #[test]
    fn test_file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileAuditSink::open(&path).unwrap();
        let origin = RequestOrigin::unknown();

        sink.write(&AuditRecord::new("u1", "workspace.create", "ws_1", json!({"name": "a"}), &origin, true))
            .unwrap();
        sink.write(&AuditRecord::new("u1", "document.delete", "doc_1", json!({}), &origin, false))
            .unwrap();

        let lines: Vec<String> = BufReader::new(File::open(&path).unwrap())
            .lines()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines.len(), 2);

        let second: AuditRecord = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second.action(), "document.delete");
        assert!(!second.success());
    }
}
