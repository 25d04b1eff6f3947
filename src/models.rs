// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response data structures for the REST API. All types
//! derive `Serialize`/`Deserialize` and `ToSchema` for automatic JSON
//! handling and OpenAPI documentation.
//!
//! Policy conditions ([`AccessPolicyCondition`]) and persisted records
//! ([`SealedRecord`], [`HistoryEntry`]) are defined next to their owning
//! modules and reused here.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::policy::AccessPolicyCondition;
use crate::storage::{HistoryEntry, SealedRecord};

// =============================================================================
// Secret Models
// =============================================================================

/// Request to encrypt a secret under an access policy.
///
/// Exactly one of `conditions` (non-empty) or `use_permissive_policy:
/// true` must be supplied. There is no silent default policy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncryptSecretRequest {
    /// The secret text to encrypt. Must be non-empty.
    pub secret: String,
    /// Access-control conditions gating future decryption.
    #[serde(default)]
    pub conditions: Option<Vec<AccessPolicyCondition>>,
    /// Explicit opt-in to the permissive "balance >= 0" policy, which any
    /// wallet satisfies.
    #[serde(default)]
    pub use_permissive_policy: bool,
}

/// A freshly sealed secret.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncryptSecretResponse {
    /// The persisted sealed record. Its `ciphertext` and `integrity_hash`
    /// are everything a future decryption needs besides the policy.
    pub record: SealedRecord,
}

/// Request to decrypt a sealed secret.
///
/// The policy must match the one used at encryption time; the gateway
/// stores only a non-binding policy reference, so it cannot derive the
/// policy on the caller's behalf.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecryptSecretRequest {
    /// Opaque ciphertext blob from the sealed record.
    pub ciphertext: String,
    /// Integrity hash from the sealed record. Decryption is refused
    /// without it.
    pub integrity_hash: String,
    /// Access-control conditions used at encryption time.
    #[serde(default)]
    pub conditions: Option<Vec<AccessPolicyCondition>>,
    /// Explicit opt-in to the permissive "balance >= 0" policy.
    #[serde(default)]
    pub use_permissive_policy: bool,
}

/// A decrypted secret.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecryptSecretResponse {
    /// The recovered plaintext.
    pub plaintext: String,
}

// =============================================================================
// History Models
// =============================================================================

/// The stored history of sealed secrets, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryEntry>,
    pub count: usize,
}
