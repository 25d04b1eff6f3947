// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive vault operations.
//!
//! Every encryption, decryption attempt, and history mutation is appended
//! to a daily JSONL file. Audit failures are reported to the caller but
//! must never fail the user operation itself; the gateway logs and moves
//! on.

use std::fs::{self, OpenOptions};
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StoragePaths;

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Vault events
    SecretEncrypted,
    SecretDecrypted,
    DecryptDenied,

    // History events
    HistoryEntryRemoved,
    HistoryCleared,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Resource affected (history entry id, policy reference).
    pub resource_id: Option<String>,
    /// Additional details as JSON. Never contains plaintext or key
    /// material.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            resource_id: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the resource.
    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Errors raised by the audit log.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Append-only JSONL audit log, one file per day.
pub struct AuditLog {
    paths: StoragePaths,
}

impl AuditLog {
    /// Create a new audit log rooted at the given storage paths.
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Append an audit event to today's log file.
    pub fn log(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.paths.audit_events_file(&date);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    /// Read all events logged on a specific date (YYYY-MM-DD).
    ///
    /// Unparseable lines are skipped rather than failing the whole read.
    pub fn events_for_date(&self, date: &str) -> Result<Vec<AuditEvent>, AuditError> {
        let path = self.paths.audit_events_file(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_log() -> (TempDir, AuditLog) {
        let dir = TempDir::new().expect("tempdir");
        let log = AuditLog::new(StoragePaths::new(dir.path()));
        (dir, log)
    }

    #[test]
    fn log_appends_jsonl_events() {
        let (_dir, log) = test_log();

        let first = AuditEvent::new(AuditEventType::SecretEncrypted).with_resource("1");
        let second = AuditEvent::new(AuditEventType::DecryptDenied)
            .with_resource("1")
            .failed("policy not satisfied");

        log.log(&first).unwrap();
        log.log(&second).unwrap();

        let date = first.timestamp.format("%Y-%m-%d").to_string();
        let events = log.events_for_date(&date).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::SecretEncrypted);
        assert!(events[0].success);
        assert_eq!(events[1].event_type, AuditEventType::DecryptDenied);
        assert!(!events[1].success);
        assert_eq!(
            events[1].error.as_deref(),
            Some("policy not satisfied")
        );
    }

    #[test]
    fn events_for_missing_date_is_empty() {
        let (_dir, log) = test_log();
        assert!(log.events_for_date("1999-01-01").unwrap().is_empty());
    }
}
