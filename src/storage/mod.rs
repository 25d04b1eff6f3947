// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Persistence Module
//!
//! Durable local state for the gateway, rooted at the configured data
//! directory:
//!
//! ```text
//! {DATA_DIR}/
//!   history.redb            # Embedded ACID history store (sealed records)
//!   audit/
//!     {date}/events.jsonl   # Daily audit logs
//! ```
//!
//! The history store holds metadata and opaque ciphertext only. Plaintext
//! secrets and key material are never persisted.

pub mod audit;
pub mod history;
pub mod paths;

pub use audit::{AuditError, AuditEvent, AuditEventType, AuditLog};
pub use history::{HistoryEntry, HistoryError, HistoryResult, HistoryStore, SealedRecord};
pub use paths::StoragePaths;
