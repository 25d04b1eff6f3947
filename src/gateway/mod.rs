// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Gateway
//!
//! Orchestrates encryption and decryption of secrets against the external
//! threshold network:
//!
//! - `encrypt` validates input and policy, obtains capacity, submits the
//!   plaintext to the network's encryption primitive, and appends the
//!   resulting sealed record to the local history store.
//! - `decrypt` validates the opaque pair, optionally preflights balance
//!   conditions locally, obtains capacity and a delegated session
//!   authorization, and dispatches the decryption program to the remote
//!   sandbox, which re-verifies the policy before releasing key material.
//!
//! Every operation owns its network session and releases it on every exit
//! path. The gateway performs no cryptography itself; it marshals
//! parameters and enforces the calling contract.

pub mod capacity;
pub mod client;
pub mod network;
pub mod sandbox;
pub mod session;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::chain::ChainClient;
use crate::config::SESSION_TTL_SECS;
use crate::policy::{self, AccessPolicyCondition, PolicyError, PolicyRef};
use crate::signer::KeyMaterial;
use crate::storage::{AuditEvent, AuditEventType, AuditLog, HistoryError, HistoryStore, SealedRecord};

use capacity::CapacityManager;
use network::{
    Ability, DelegationRequest, NetworkError, NetworkSession, ResourceRequest, SessionAuthRequest,
    ThresholdNetwork,
};
use session::SessionAuthenticator;

/// Errors surfaced by gateway operations.
///
/// The full taxonomy of the service: every failure a caller can see is one
/// of these, and none are retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("capacity unavailable: {0}")]
    Quota(String),

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("sandbox execution failed: {0}")]
    Sandbox(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("storage failure: {0}")]
    Storage(#[from] HistoryError),
}

impl From<NetworkError> for GatewayError {
    fn from(error: NetworkError) -> Self {
        match error {
            NetworkError::Denied(message) => GatewayError::Auth(message),
            NetworkError::SessionExpired(message) => GatewayError::Auth(message),
            NetworkError::ChallengeSigning(message) => GatewayError::Auth(message),
            NetworkError::Execution(message) => GatewayError::Sandbox(message),
            other => GatewayError::Network(other.to_string()),
        }
    }
}

/// The vault gateway.
///
/// Generic over the network implementation so the orchestration logic is
/// testable against an in-process fake.
pub struct VaultGateway<N: ThresholdNetwork> {
    network: N,
    signer: Arc<KeyMaterial>,
    capacity: CapacityManager,
    sessions: SessionAuthenticator,
    history: Arc<HistoryStore>,
    audit: Option<Arc<AuditLog>>,
    preflight: Option<ChainClient>,
}

impl<N: ThresholdNetwork> VaultGateway<N> {
    /// Create a gateway over a network client, signing credential,
    /// capacity manager and history store.
    pub fn new(
        network: N,
        signer: Arc<KeyMaterial>,
        capacity: CapacityManager,
        history: Arc<HistoryStore>,
    ) -> Self {
        let sessions = SessionAuthenticator::new(signer.clone());
        Self {
            network,
            signer,
            capacity,
            sessions,
            history,
            audit: None,
            preflight: None,
        }
    }

    /// Attach an audit log.
    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Attach a chain client for the local policy preflight.
    pub fn with_preflight(mut self, chain: ChainClient) -> Self {
        self.preflight = Some(chain);
        self
    }

    /// Address of the gateway's signing credential.
    pub fn signer_address(&self) -> String {
        self.signer.address_string()
    }

    /// Encrypt a secret under an access policy.
    ///
    /// On success the returned [`SealedRecord`] is already persisted to
    /// the history store and its `ciphertext`/`integrity_hash` pair is
    /// sufficient for a future decryption.
    pub async fn encrypt(
        &self,
        plaintext: &str,
        conditions: &[AccessPolicyCondition],
    ) -> Result<SealedRecord, GatewayError> {
        if plaintext.is_empty() {
            return Err(GatewayError::Input("secret must not be empty".to_string()));
        }
        let policy_ref = policy::validate(conditions)?;

        let session = self.network.connect().await?;
        let result = self
            .encrypt_in_session(&session, &policy_ref, conditions, plaintext)
            .await;
        self.release(session).await;

        let record = result?;
        info!(record_id = record.id, "Secret sealed");
        self.audit(
            AuditEvent::new(AuditEventType::SecretEncrypted)
                .with_resource(record.id.to_string())
                .with_details(json!({ "policy_reference": record.policy_reference })),
        );
        Ok(record)
    }

    async fn encrypt_in_session(
        &self,
        session: &NetworkSession,
        policy_ref: &PolicyRef,
        conditions: &[AccessPolicyCondition],
        plaintext: &str,
    ) -> Result<SealedRecord, GatewayError> {
        self.capacity.ensure(&self.network, session).await?;

        let payload = self.network.encrypt(session, conditions, plaintext).await?;
        let entry = self
            .history
            .append(&policy_ref.0, &payload.ciphertext, &payload.integrity_hash)?;
        Ok(entry.record)
    }

    /// Decrypt a sealed secret.
    ///
    /// The caller must supply the same policy that was used at encryption
    /// time; the stored `policy_reference` is metadata, not an enforced
    /// binding, and the remote sandbox is the authority on whether the
    /// policy holds.
    pub async fn decrypt(
        &self,
        ciphertext: &str,
        integrity_hash: &str,
        conditions: &[AccessPolicyCondition],
    ) -> Result<String, GatewayError> {
        if ciphertext.is_empty() || integrity_hash.is_empty() {
            return Err(GatewayError::Input(
                "ciphertext and integrity hash are both required".to_string(),
            ));
        }
        let policy_ref = policy::validate(conditions)?;

        if let Some(chain) = &self.preflight {
            match chain
                .preflight(conditions, &self.signer.address_string())
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    let error = GatewayError::Auth(
                        "balance condition not satisfied for the service credential".to_string(),
                    );
                    self.audit_denial(&policy_ref, integrity_hash, &error);
                    return Err(error);
                }
                Err(e) => {
                    warn!(error = %e, "Policy preflight unavailable; deferring to the network");
                }
            }
        }

        let session = self.network.connect().await?;
        let result = self
            .decrypt_in_session(&session, conditions, ciphertext, integrity_hash)
            .await;
        self.release(session).await;

        match &result {
            Ok(_) => self.audit(
                AuditEvent::new(AuditEventType::SecretDecrypted)
                    .with_resource(integrity_hash.to_string())
                    .with_details(json!({ "policy_reference": policy_ref.0 })),
            ),
            Err(error @ (GatewayError::Auth(_) | GatewayError::Sandbox(_))) => {
                self.audit_denial(&policy_ref, integrity_hash, error);
            }
            Err(_) => {}
        }

        result
    }

    async fn decrypt_in_session(
        &self,
        session: &NetworkSession,
        conditions: &[AccessPolicyCondition],
        ciphertext: &str,
        integrity_hash: &str,
    ) -> Result<String, GatewayError> {
        let credential = self.capacity.ensure(&self.network, session).await?;

        let resource = policy::resource_string(conditions, integrity_hash);
        let authorization = match self.sessions.cached(&resource) {
            Some(authorization) => authorization,
            None => {
                let delegation = self
                    .network
                    .delegation_auth(
                        session,
                        &DelegationRequest {
                            owner_address: self.signer.address_string(),
                            token_id: credential.token_id.clone(),
                            delegatee_addresses: vec![self.signer.address_string()],
                            uses: 1,
                        },
                    )
                    .await?;

                let request = SessionAuthRequest {
                    chain: conditions
                        .first()
                        .map(|condition| condition.chain.clone())
                        .unwrap_or_default(),
                    expiration: Utc::now() + Duration::seconds(SESSION_TTL_SECS),
                    resources: vec![
                        ResourceRequest {
                            resource: resource.clone(),
                            ability: Ability::ConditionDecryption,
                        },
                        ResourceRequest {
                            resource: "*".to_string(),
                            ability: Ability::SandboxExecution,
                        },
                    ],
                    delegation,
                };

                let authorization = self
                    .network
                    .session_authorizations(session, &request, &self.sessions)
                    .await?;
                self.sessions.store(&resource, authorization.clone());
                authorization
            }
        };

        let dispatch = sandbox::decrypt_request(conditions, ciphertext, integrity_hash);
        let response = self
            .network
            .execute(session, &authorization, &dispatch)
            .await?;
        Ok(response.response)
    }

    /// Release a network session, logging (never propagating) failures.
    async fn release(&self, session: NetworkSession) {
        if let Err(e) = self.network.disconnect(session).await {
            warn!(error = %e, "Failed to release network session");
        }
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(log) = &self.audit {
            if let Err(e) = log.log(&event) {
                warn!(error = %e, "Audit write failed");
            }
        }
    }

    fn audit_denial(&self, policy_ref: &PolicyRef, integrity_hash: &str, error: &GatewayError) {
        self.audit(
            AuditEvent::new(AuditEventType::DecryptDenied)
                .with_resource(integrity_hash.to_string())
                .with_details(json!({ "policy_reference": policy_ref.0 }))
                .failed(error.to_string()),
        );
    }
}
