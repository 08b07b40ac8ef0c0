//! Audit sinks.
//!
//! A sink accepts one record at a time and either persists all of it or
//! reports failure. Sink failures are distinct from policy errors: by the
//! time a record exists, a decision has already been computed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, error};

use crate::record::AuditRecord;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to write audit record to `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

impl AuditError {
    /// Stable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        "audit_write_failed"
    }

    /// Operator-facing description including the underlying cause.
    pub fn hint(&self) -> String {
        match self {
            Self::Write { source, .. } => format!("{self}: {source}"),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Persists one record. All-or-nothing.
    fn write(&self, record: &AuditRecord) -> Result<()>;
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Append-only file sink writing one compact JSON object per line.
///
/// Each record is encoded in full before the file is touched and written
/// with a single `write_all`, so a failed encode never leaves a partial line.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn write_err(&self, source: std::io::Error) -> AuditError {
        error!(path = %self.path.display(), error = %source, "audit write failed");
        AuditError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn write(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_err(e))?;
        file.write_all(&line).map_err(|e| self.write_err(e))?;
        file.flush().map_err(|e| self.write_err(e))?;

        debug!(
            decision_id = %record.decision_id,
            path = %self.path.display(),
            "audit record written"
        );
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Keeps records in memory. Useful when embedding and in tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far, in write order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, record: &AuditRecord) -> Result<()> {
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
    use chrono::Utc;
    use palisade_policy::{AuthorizationRequest, Policy, Resource, Subject, evaluate};
    use tempfile::tempdir;

    fn record(decision_id: &str) -> AuditRecord {
        let policy = Policy::new("p", "1");
        let request =
            AuthorizationRequest::new(Subject::new("u1"), "read", Resource::new("report"));
        let decision = evaluate(&request, &policy);
        AuditRecord::for_decision(&request, &decision, &policy, decision_id, "corr", Utc::now())
    }

    #[test]
    fn test_jsonl_appends_one_line_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/audit/decisions.jsonl");
        let sink = JsonlAuditSink::new(&path);

        sink.write(&record("d-1")).unwrap();
        sink.write(&record("d-2")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(contents.ends_with('\n'));

        let first: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        let second: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.decision_id, "d-1");
        assert_eq!(second.decision_id, "d-2");
        assert_eq!(first.reason.as_str(), "deny_by_default");
    }

    #[test]
    fn test_jsonl_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending.
        let sink = JsonlAuditSink::new(dir.path());

        let err = sink.write(&record("d-1")).unwrap_err();
        assert_eq!(err.kind(), "audit_write_failed");
        assert!(matches!(err, AuditError::Write { .. }));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());

        sink.write(&record("a")).unwrap();
        sink.write(&record("b")).unwrap();

        let ids: Vec<String> = sink.records().into_iter().map(|r| r.decision_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
