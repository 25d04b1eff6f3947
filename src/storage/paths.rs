// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the local persistence layout.

use std::path::{Path, PathBuf};

/// Base directory for all persistent gateway data.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities for the gateway's data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persistent data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== History Paths ==========

    /// Path to the embedded history database file.
    pub fn history_db(&self) -> PathBuf {
        self.root.join("history.redb")
    }

    // ========== Audit Paths ==========

    /// Directory containing all audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Path to the audit events file for a specific date (YYYY-MM-DD).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date).join("events.jsonl")
    }
}
