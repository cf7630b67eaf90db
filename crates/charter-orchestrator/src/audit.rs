//! Append-only audit trail of run events.
//!
//! Entries are kept in memory and, when a path is configured, appended to a
//! JSONL file as they are recorded. A failing audit write is logged and never
//! fails the run.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use charter_utils::redaction::redact_error_message;
use charter_utils::types::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RunCreated,
    PrivacyScanned,
    PrivacyApproved,
    PrivacyDenied,
    ResearchCall,
    GenerationCall,
    DocumentsGenerated,
    OutputWritten,
    PhaseChanged,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub run_id: RunId,
    pub details: serde_json::Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditEntry {
    #[must_use]
    pub fn ok(action: AuditAction, run_id: &RunId, details: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            run_id: run_id.clone(),
            details,
            success: true,
            error_message: None,
        }
    }

    #[must_use]
    pub fn failed(
        action: AuditAction,
        run_id: &RunId,
        details: serde_json::Value,
        error: impl AsRef<str>,
    ) -> Self {
        Self {
            success: false,
            error_message: Some(redact_error_message(error.as_ref())),
            ..Self::ok(action, run_id, details)
        }
    }
}

#[derive(Debug, Default)]
pub struct AuditLog {
    path: Option<Utf8PathBuf>,
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn to_file(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            entries: Mutex::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        self.path.as_ref()
    }

    pub fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = &self.path
            && let Err(e) = append_line(path, &entry)
        {
            warn!(path = %path, error = %e, "Failed to append audit entry");
        }
        entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn entries_for(&self, run_id: &RunId) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| &e.run_id == run_id)
            .cloned()
            .collect()
    }
}

fn append_line(path: &Utf8PathBuf, entry: &AuditEntry) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
