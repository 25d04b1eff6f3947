// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract with the external threshold network.
//!
//! The network is an opaque collaborator: it performs the actual threshold
//! encryption and decryption, mints capacity credits, and issues session
//! authorizations. This module defines the operation set and wire types;
//! [`super::client::NodeClient`] is the HTTP implementation and the test
//! suite substitutes an in-process fake honoring the same contract.
//!
//! Every operation runs inside a [`NetworkSession`] obtained from
//! `connect` and released with `disconnect`. Sessions are owned, per-call
//! values; nothing here is shared mutable state.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::AccessPolicyCondition;

use super::session::SessionAuthenticator;

/// Errors surfaced by threshold network operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("network configuration missing: {0}")]
    MissingConfig(String),

    #[error("network connect failed: {0}")]
    Connect(String),

    #[error("network request failed: {0}")]
    Request(String),

    #[error("network response was invalid: {0}")]
    InvalidResponse(String),

    #[error("challenge signing failed: {0}")]
    ChallengeSigning(String),

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("session authorization expired: {0}")]
    SessionExpired(String),

    #[error("sandbox execution failed: {0}")]
    Execution(String),
}

/// An open session against the network coordinator.
///
/// Owned by exactly one gateway operation and consumed by `disconnect`.
#[derive(Debug, Clone)]
pub struct NetworkSession {
    /// Coordinator-assigned session identifier.
    pub session_id: String,
    /// Latest blockhash reported in the handshake; doubles as the nonce
    /// for session challenges.
    pub nonce: String,
}

/// Result of the network's encryption primitive.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedPayload {
    /// Opaque ciphertext blob (base64).
    pub ciphertext: String,
    /// Hex SHA-256 of the plaintext, computed network-side.
    pub integrity_hash: String,
}

/// Fixed parameters for a capacity mint.
#[derive(Debug, Clone, Serialize)]
pub struct MintParams {
    pub requests_per_kilosecond: u64,
    pub days_until_expiration: u64,
}

/// A usage-capacity credential (rate-limit token).
#[derive(Debug, Clone, Deserialize)]
pub struct CapacityCredential {
    /// Token id identifying the credit on the network.
    pub token_id: String,
    /// Best-effort hint of remaining quota, if the network reports one.
    pub remaining_quota_hint: Option<u64>,
}

/// Request for a capacity delegation authorization: permits `delegatee
/// addresses` to spend capacity from `token_id` owned by `owner_address`.
#[derive(Debug, Clone, Serialize)]
pub struct DelegationRequest {
    pub owner_address: String,
    pub token_id: String,
    pub delegatee_addresses: Vec<String>,
    pub uses: u64,
}

/// An issued delegation authorization, opaque to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationAuth {
    pub auth_sig: String,
}

/// Ability a session authorization grants over a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    ConditionDecryption,
    SandboxExecution,
}

/// One resource/ability pair in a session authorization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Resource descriptor (see [`crate::policy::resource_string`]), or
    /// `*` for any resource.
    pub resource: String,
    pub ability: Ability,
}

/// Request for short-lived session signatures.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAuthRequest {
    /// Chain the gated conditions are evaluated on.
    pub chain: String,
    /// Requested validity limit.
    pub expiration: DateTime<Utc>,
    /// Resources the session may touch.
    pub resources: Vec<ResourceRequest>,
    /// Capacity delegation backing this session.
    pub delegation: DelegationAuth,
}

/// A challenge the network poses before issuing session signatures.
///
/// Answered by signing a wallet-style sign-in message over these fields.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthChallenge {
    pub uri: String,
    pub nonce: String,
    pub expiration: DateTime<Utc>,
    pub resources: Vec<String>,
}

/// The signed answer to an [`AuthChallenge`].
#[derive(Debug, Clone, Serialize)]
pub struct AuthSignature {
    /// Address of the signing credential.
    pub address: String,
    /// The exact message that was signed.
    pub signed_message: String,
    /// Hex-encoded signature.
    pub signature: String,
}

/// Short-lived signatures authorizing operations against specific nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAuthorization {
    /// Node URL → signature blob.
    pub session_signatures: BTreeMap<String, String>,
    /// Hard validity limit; must not be used past this instant.
    pub expires_at: DateTime<Utc>,
}

impl SessionAuthorization {
    /// Whether the authorization is past its validity window.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// A program dispatch for the remote decryption sandbox.
#[derive(Debug, Clone, Serialize)]
pub struct SandboxRequest {
    /// Source of the program the sandbox executes.
    pub program: String,
    /// Named parameters passed to the program.
    pub parameters: serde_json::Value,
}

/// Result of a sandbox execution.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxResponse {
    pub response: String,
}

/// The threshold network operation set.
///
/// Implementations must not retain sessions across calls; the gateway owns
/// each session's lifecycle. Futures are `Send` so gateway calls can run
/// on the multi-threaded runtime.
pub trait ThresholdNetwork: Send + Sync {
    /// Open a session with the network coordinator.
    fn connect(&self) -> impl Future<Output = Result<NetworkSession, NetworkError>> + Send;

    /// Encrypt plaintext under a condition set, returning the opaque
    /// ciphertext and its integrity hash.
    fn encrypt(
        &self,
        session: &NetworkSession,
        conditions: &[AccessPolicyCondition],
        plaintext: &str,
    ) -> impl Future<Output = Result<EncryptedPayload, NetworkError>> + Send;

    /// Mint a fresh capacity credential.
    fn mint_capacity(
        &self,
        session: &NetworkSession,
        params: &MintParams,
    ) -> impl Future<Output = Result<CapacityCredential, NetworkError>> + Send;

    /// Create a capacity delegation authorization.
    fn delegation_auth(
        &self,
        session: &NetworkSession,
        request: &DelegationRequest,
    ) -> impl Future<Output = Result<DelegationAuth, NetworkError>> + Send;

    /// Obtain session signatures for the requested resources.
    ///
    /// When the network demands a fresh wallet signature it poses a
    /// challenge; the implementation answers it through `authenticator`
    /// on demand. Callers that hold a valid cached authorization never
    /// reach this method.
    fn session_authorizations(
        &self,
        session: &NetworkSession,
        request: &SessionAuthRequest,
        authenticator: &SessionAuthenticator,
    ) -> impl Future<Output = Result<SessionAuthorization, NetworkError>> + Send;

    /// Execute a program in the remote decryption sandbox.
    ///
    /// The sandbox re-verifies the access policy before releasing key
    /// material; a failed check surfaces as [`NetworkError::Denied`] with
    /// only the opaque message the network returned.
    fn execute(
        &self,
        session: &NetworkSession,
        authorization: &SessionAuthorization,
        request: &SandboxRequest,
    ) -> impl Future<Output = Result<SandboxResponse, NetworkError>> + Send;

    /// Release a session. Always called on the way out of a gateway
    /// operation, success or failure.
    fn disconnect(
        &self,
        session: NetworkSession,
    ) -> impl Future<Output = Result<(), NetworkError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_authorization_expiry() {
        let mut auth = SessionAuthorization {
            session_signatures: BTreeMap::new(),
            expires_at: Utc::now() + chrono::Duration::seconds(60),
        };
        assert!(!auth.is_expired());

        auth.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(auth.is_expired());
    }

    #[test]
    fn ability_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Ability::ConditionDecryption).unwrap(),
            "\"condition_decryption\""
        );
        assert_eq!(
            serde_json::to_string(&Ability::SandboxExecution).unwrap(),
            "\"sandbox_execution\""
        );
    }
}
