// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded history store backed by redb (pure Rust, ACID).
//!
//! Append-only record of sealed secrets. Entries are keyed by a monotonic
//! id assigned at append time, so a forward scan returns insertion order.
//! The id counter lives in the meta table and never moves backwards, which
//! keeps ids unique across removals.
//!
//! The store holds metadata and opaque ciphertext only; it is not part of
//! the cryptographic trust boundary. Removing an entry does not revoke
//! anything; the ciphertext remains decryptable by anyone holding a copy
//! and a satisfying credential.
//!
//! ## Table Layout
//!
//! - `history`: id (u64) → serialized HistoryEntry (JSON bytes)
//! - `meta`: key → u64 (`schema_version`, `next_id`)

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Current on-disk schema version. Bump when the entry layout changes.
pub const SCHEMA_VERSION: u64 = 1;

/// Primary table: monotonic id → serialized HistoryEntry (JSON bytes).
const HISTORY: TableDefinition<u64, &[u8]> = TableDefinition::new("history");

/// Meta table: `schema_version` and `next_id` counters.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const META_SCHEMA_VERSION: &str = "schema_version";
const META_NEXT_ID: &str = "next_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("history database schema v{found} is newer than supported v{supported}")]
    UnsupportedSchema { found: u64, supported: u64 },
}

pub type HistoryResult<T> = Result<T, HistoryError>;

// =============================================================================
// Records
// =============================================================================

/// The persisted result of an encryption operation.
///
/// `ciphertext` and `integrity_hash` together are sufficient for a future
/// decryption; the original plaintext is never stored. `policy_reference`
/// is metadata only: it names the policy used at encryption time but does
/// not cryptographically bind the record to it, so decryption still
/// requires the caller to supply the matching policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SealedRecord {
    /// Monotonic identifier assigned by the history store.
    pub id: u64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Opaque descriptor of the access policy used at encryption time.
    pub policy_reference: String,
    /// Opaque ciphertext blob (base64).
    pub ciphertext: String,
    /// Hex SHA-256 of the pre-encryption plaintext. Required for decryption.
    pub integrity_hash: String,
}

/// A history store row: a sealed record plus its listing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// Same monotonic id as `record.id`.
    pub id: u64,
    /// Same creation time as `record.created_at`.
    pub timestamp: DateTime<Utc>,
    /// Same policy descriptor as `record.policy_reference`.
    pub policy_reference: String,
    /// The sealed record itself.
    pub record: SealedRecord,
}

// =============================================================================
// HistoryStore
// =============================================================================

/// Embedded ACID history store.
///
/// redb serializes writers, so concurrent appenders and removers are safe
/// without any additional locking here.
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    /// Open (or create) the store at the given path.
    ///
    /// Stamps a fresh database with [`SCHEMA_VERSION`] and refuses to open
    /// a database stamped with a newer version.
    pub fn open(path: &Path) -> HistoryResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(HISTORY)?;
            let mut meta = write_txn.open_table(META)?;

            let stamped = meta.get(META_SCHEMA_VERSION)?.map(|v| v.value());
            match stamped {
                None => {
                    meta.insert(META_SCHEMA_VERSION, SCHEMA_VERSION)?;
                }
                Some(found) if found > SCHEMA_VERSION => {
                    return Err(HistoryError::UnsupportedSchema {
                        found,
                        supported: SCHEMA_VERSION,
                    });
                }
                Some(_) => {}
            }
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Append a new sealed record, assigning the next monotonic id.
    ///
    /// The id counter and the entry commit in one transaction; `list` never
    /// sees an entry that is not durably flushed.
    pub fn append(
        &self,
        policy_reference: &str,
        ciphertext: &str,
        integrity_hash: &str,
    ) -> HistoryResult<HistoryEntry> {
        let created_at = Utc::now();

        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut meta = write_txn.open_table(META)?;
            let id = meta.get(META_NEXT_ID)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(META_NEXT_ID, id + 1)?;

            let entry = HistoryEntry {
                id,
                timestamp: created_at,
                policy_reference: policy_reference.to_string(),
                record: SealedRecord {
                    id,
                    created_at,
                    policy_reference: policy_reference.to_string(),
                    ciphertext: ciphertext.to_string(),
                    integrity_hash: integrity_hash.to_string(),
                },
            };

            let json = serde_json::to_vec(&entry)?;
            let mut table = write_txn.open_table(HISTORY)?;
            table.insert(id, json.as_slice())?;
            entry
        };
        write_txn.commit()?;

        Ok(entry)
    }

    /// List all entries in insertion (id) order.
    pub fn list(&self) -> HistoryResult<Vec<HistoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY)?;

        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let entry: HistoryEntry = serde_json::from_slice(value.value())?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Look up a single entry by id.
    pub fn get(&self, id: u64) -> HistoryResult<Option<HistoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Remove an entry by id. Idempotent: returns `false` (not an error)
    /// when the id does not exist.
    pub fn remove(&self, id: u64) -> HistoryResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(HISTORY)?;
            let existed = table.remove(id)?.is_some();
            existed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Remove all entries. Idempotent. The id counter is not reset.
    pub fn clear(&self) -> HistoryResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(HISTORY)?;
            let ids: Vec<u64> = table
                .iter()?
                .map(|item| item.map(|(k, _)| k.value()))
                .collect::<Result<_, _>>()?;
            for id in ids {
                table.remove(id)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Number of stored entries.
    pub fn len(&self) -> HistoryResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY)?;

        let mut count = 0;
        for item in table.iter()? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> HistoryResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, HistoryStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = HistoryStore::open(&dir.path().join("history.redb")).expect("open store");
        (dir, store)
    }

    #[test]
    fn append_assigns_monotonic_ids_in_insertion_order() {
        let (_dir, store) = test_store();

        let first = store.append("policy-a", "cipher-1", "hash-1").unwrap();
        let second = store.append("policy-a", "cipher-2", "hash-2").unwrap();
        let third = store.append("policy-b", "cipher-3", "hash-3").unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(third.id, 3);
        assert_eq!(first.record.id, first.id);
        assert_eq!(first.record.policy_reference, "policy-a");

        let listed = store.list().unwrap();
        assert_eq!(
            listed.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(listed[2].record.ciphertext, "cipher-3");
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, store) = test_store();
        let entry = store.append("p", "c", "h").unwrap();

        assert!(store.remove(entry.id).unwrap());
        assert!(!store.remove(entry.id).unwrap());
        assert!(!store.remove(9999).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let (_dir, store) = test_store();

        let first = store.append("p", "c1", "h1").unwrap();
        store.remove(first.id).unwrap();
        let second = store.append("p", "c2", "h2").unwrap();

        assert!(second.id > first.id);
    }

    #[test]
    fn clear_is_idempotent_and_preserves_counter() {
        let (_dir, store) = test_store();

        store.append("p", "c1", "h1").unwrap();
        store.append("p", "c2", "h2").unwrap();

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());

        let next = store.append("p", "c3", "h3").unwrap();
        assert_eq!(next.id, 3);
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.redb");

        {
            let store = HistoryStore::open(&path).unwrap();
            store.append("p", "cipher", "hash").unwrap();
        }

        let store = HistoryStore::open(&path).unwrap();
        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.ciphertext, "cipher");
    }

    #[test]
    fn get_returns_none_for_unknown_id() {
        let (_dir, store) = test_store();
        assert!(store.get(42).unwrap().is_none());

        let entry = store.append("p", "c", "h").unwrap();
        let loaded = store.get(entry.id).unwrap().unwrap();
        assert_eq!(loaded, entry);
    }
}
