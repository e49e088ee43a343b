//! Per-call audit trail.
//!
//! Every upstream call produces one [`AuditRecord`]. Records are written
//! through an [`AuditStore`]; the default store appends JSON lines to a file
//! and refuses a second record with the same id. Writes are best-effort: the
//! [`AuditLogger`] runs them on a detached blocking task and only reports
//! failures to the operator log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Upstream base URL, not the classified provider tag.
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    /// Serialized outbound payload.
    pub request: String,
    /// Raw upstream body, empty when no response arrived.
    pub response: String,
    /// 0 when no response arrived.
    pub status_code: u16,
    pub error_message: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl AuditRecord {
    /// Start a record for a call to `endpoint`; outcome fields are filled in
    /// by the caller.
    pub fn new(
        provider: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        request: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            provider: provider.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            request: request.into(),
            response: String::new(),
            status_code: 0,
            error_message: String::new(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }
}

pub trait AuditStore: Send + Sync {
    /// Persist one record. Inserting an id that already exists is an error.
    fn insert(&self, record: &AuditRecord) -> Result<()>;
}

/// Append-only JSON-lines file, one record per line.
///
/// Ids are unique across the whole file, so every id ever written is kept in
/// memory and the file is scanned once on open. That is roughly 100 bytes per
/// record; rotate the file (point `audit_path` elsewhere) when it grows large.
pub struct JsonlAuditStore {
    path: PathBuf,
    inner: Mutex<JsonlInner>,
}

struct JsonlInner {
    ids: HashSet<String>,
    writer: BufWriter<File>,
}

impl JsonlAuditStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let ids = if path.exists() {
            Self::read_all(&path)?.into_iter().map(|r| r.id).collect()
        } else {
            HashSet::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            inner: Mutex::new(JsonlInner {
                ids,
                writer: BufWriter::new(file),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back. Lines that do not parse are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if let Ok(record) = serde_json::from_str::<AuditRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl AuditStore for JsonlAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| BridgeError::audit("audit store lock poisoned"))?;

        if inner.ids.contains(&record.id) {
            return Err(BridgeError::audit(format!(
                "duplicate audit record id {}",
                record.id
            )));
        }

        let json = serde_json::to_string(record)?;
        writeln!(inner.writer, "{json}")?;
        inner.writer.flush()?;
        inner.ids.insert(record.id.clone());
        Ok(())
    }
}

/// Cloneable handle that submits records without blocking the caller.
#[derive(Clone)]
pub struct AuditLogger(Arc<dyn AuditStore>);

impl AuditLogger {
    pub fn new(store: impl AuditStore + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// Hand `record` to a blocking task. The returned handle may be dropped;
    /// the write still runs to completion.
    pub fn submit(&self, record: AuditRecord) -> JoinHandle<()> {
        let store = Arc::clone(&self.0);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.insert(&record) {
                tracing::warn!(audit_id = %record.id, error = %e, "Failed to persist audit record");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> AuditRecord {
        let mut record = AuditRecord::new(
            "https://api.openai.com/v1",
            "https://api.openai.com/v1/chat/completions",
            "gpt-4o",
            "{}",
        );
        record.status_code = 200;
        record.response = r#"{"choices":[]}"#.to_string();
        record.prompt_tokens = 5;
        record.completion_tokens = 3;
        record
    }

    #[test]
    fn test_insert_appends_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit").join("calls.jsonl");
        let store = JsonlAuditStore::open(&path).unwrap();

        let first = record();
        let second = record();
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        let records = JsonlAuditStore::read_all(store.path()).unwrap();
        assert_eq!(records, vec![first, second]);
    }

    #[test]
    fn test_duplicate_id_is_rejected_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.jsonl");
        let rec = record();

        JsonlAuditStore::open(&path).unwrap().insert(&rec).unwrap();

        let reopened = JsonlAuditStore::open(&path).unwrap();
        let err = reopened.insert(&rec).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert_eq!(JsonlAuditStore::read_all(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_record_schema_field_names() {
        let wire = serde_json::to_value(record()).unwrap();
        let mut keys: Vec<&str> = wire.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "completion_tokens",
                "endpoint",
                "error_message",
                "id",
                "model",
                "prompt_tokens",
                "provider",
                "request",
                "response",
                "status_code",
                "timestamp",
            ]
        );
    }

    #[tokio::test]
    async fn test_logger_swallows_store_failures() {
        struct Rejecting;
        impl AuditStore for Rejecting {
            fn insert(&self, _record: &AuditRecord) -> Result<()> {
                Err(BridgeError::audit("disk full"))
            }
        }

        let logger = AuditLogger::new(Rejecting);
        logger.submit(record()).await.unwrap();
    }
}
