// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process fake threshold network for the test suite.
//!
//! Honors the same contract as the real coordinator: round-trips sealed
//! secrets, refuses mismatched integrity hashes, re-checks the access
//! policy at decrypt time against a configurable credential balance, and
//! demands a signed challenge before issuing session authorizations.
//! "Encryption" here is plain base64; the fake tests orchestration, not
//! cryptography.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use alloy::primitives::U256;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

use crate::policy::{self, AccessPolicyCondition};

use super::network::{
    AuthChallenge, CapacityCredential, DelegationAuth, DelegationRequest, EncryptedPayload,
    MintParams, NetworkError, NetworkSession, SandboxRequest, SandboxResponse, SessionAuthRequest,
    SessionAuthorization, ThresholdNetwork,
};
use super::session::SessionAuthenticator;

struct StoredSecret {
    plaintext: String,
    policy_hash: String,
}

#[derive(Default)]
struct FakeState {
    connects: u32,
    open_sessions: u32,
    mints: u32,
    encrypts: u32,
    session_issues: u32,
    executes: u32,
    secrets: HashMap<String, StoredSecret>,
}

/// Configurable fake network.
pub struct FakeNetwork {
    state: Mutex<FakeState>,
    balance: U256,
    fail_connect: bool,
    fail_mint: bool,
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            balance: U256::ZERO,
            fail_connect: false,
            fail_mint: false,
        }
    }

    /// Set the balance of the decrypting credential, used when evaluating
    /// `eth_getBalance` conditions.
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn with_mint_failure(mut self) -> Self {
        self.fail_mint = true;
        self
    }

    pub fn connect_count(&self) -> u32 {
        self.state.lock().unwrap().connects
    }

    pub fn open_session_count(&self) -> u32 {
        self.state.lock().unwrap().open_sessions
    }

    pub fn mint_count(&self) -> u32 {
        self.state.lock().unwrap().mints
    }

    pub fn encrypt_count(&self) -> u32 {
        self.state.lock().unwrap().encrypts
    }

    pub fn session_issue_count(&self) -> u32 {
        self.state.lock().unwrap().session_issues
    }

    pub fn execute_count(&self) -> u32 {
        self.state.lock().unwrap().executes
    }

    fn check_conditions(&self, conditions: &[AccessPolicyCondition]) -> Result<(), NetworkError> {
        for condition in conditions {
            if condition.method != "eth_getBalance" {
                continue;
            }
            let satisfied = condition
                .return_value_test
                .comparator
                .evaluate_u256(self.balance, &condition.return_value_test.value)
                .map_err(|e| NetworkError::Denied(e.to_string()))?;
            if !satisfied {
                return Err(NetworkError::Denied(
                    "access policy not satisfied".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl ThresholdNetwork for FakeNetwork {
    async fn connect(&self) -> Result<NetworkSession, NetworkError> {
        if self.fail_connect {
            return Err(NetworkError::Connect("coordinator unreachable".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        state.open_sessions += 1;
        Ok(NetworkSession {
            session_id: format!("fake-session-{}", state.connects),
            nonce: "0xfakeblockhash".to_string(),
        })
    }

    async fn encrypt(
        &self,
        _session: &NetworkSession,
        conditions: &[AccessPolicyCondition],
        plaintext: &str,
    ) -> Result<EncryptedPayload, NetworkError> {
        let ciphertext = BASE64.encode(plaintext.as_bytes());
        let integrity_hash = alloy::hex::encode(Sha256::digest(plaintext.as_bytes()));

        let mut state = self.state.lock().unwrap();
        state.encrypts += 1;
        state.secrets.insert(
            ciphertext.clone(),
            StoredSecret {
                plaintext: plaintext.to_string(),
                policy_hash: policy::policy_hash(conditions),
            },
        );

        Ok(EncryptedPayload {
            ciphertext,
            integrity_hash,
        })
    }

    async fn mint_capacity(
        &self,
        _session: &NetworkSession,
        _params: &MintParams,
    ) -> Result<CapacityCredential, NetworkError> {
        if self.fail_mint {
            return Err(NetworkError::Request("mint rejected".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.mints += 1;
        Ok(CapacityCredential {
            token_id: format!("fake-capacity-{}", state.mints),
            remaining_quota_hint: Some(1000),
        })
    }

    async fn delegation_auth(
        &self,
        _session: &NetworkSession,
        request: &DelegationRequest,
    ) -> Result<DelegationAuth, NetworkError> {
        Ok(DelegationAuth {
            auth_sig: format!(
                "delegation:{}:{}:{}",
                request.owner_address, request.token_id, request.uses
            ),
        })
    }

    async fn session_authorizations(
        &self,
        session: &NetworkSession,
        request: &SessionAuthRequest,
        authenticator: &SessionAuthenticator,
    ) -> Result<SessionAuthorization, NetworkError> {
        // Always demand a fresh signature, exercising the lazy callback.
        let challenge = AuthChallenge {
            uri: "fake://sessions".to_string(),
            nonce: session.nonce.clone(),
            expiration: request.expiration,
            resources: request
                .resources
                .iter()
                .map(|resource| resource.resource.clone())
                .collect(),
        };
        let answer = authenticator.answer_challenge(&challenge).await?;
        if answer.signature.is_empty() || answer.address != authenticator.address() {
            return Err(NetworkError::Denied("bad challenge answer".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        state.session_issues += 1;
        Ok(SessionAuthorization {
            session_signatures: BTreeMap::from([(
                "fake://node-1".to_string(),
                format!("session-sig-{}", state.session_issues),
            )]),
            expires_at: request.expiration,
        })
    }

    async fn execute(
        &self,
        _session: &NetworkSession,
        authorization: &SessionAuthorization,
        request: &SandboxRequest,
    ) -> Result<SandboxResponse, NetworkError> {
        if authorization.is_expired() {
            return Err(NetworkError::SessionExpired(
                "session signatures expired".to_string(),
            ));
        }

        self.state.lock().unwrap().executes += 1;

        let parameters = &request.parameters;
        let ciphertext = parameters["ciphertext"].as_str().unwrap_or_default();
        let provided_hash = parameters["dataToEncryptHash"].as_str().unwrap_or_default();
        let conditions: Vec<AccessPolicyCondition> =
            serde_json::from_value(parameters["accessControlConditions"].clone())
                .map_err(|e| NetworkError::Execution(format!("bad conditions: {e}")))?;

        let state = self.state.lock().unwrap();
        let stored = state
            .secrets
            .get(ciphertext)
            .ok_or_else(|| NetworkError::Execution("unknown ciphertext".to_string()))?;

        if policy::policy_hash(&conditions) != stored.policy_hash {
            return Err(NetworkError::Denied(
                "access conditions do not match the sealed policy".to_string(),
            ));
        }

        let actual_hash = alloy::hex::encode(Sha256::digest(stored.plaintext.as_bytes()));
        if actual_hash != provided_hash {
            return Err(NetworkError::Execution(
                "integrity check failed".to_string(),
            ));
        }

        self.check_conditions(&conditions)?;

        Ok(SandboxResponse {
            response: stored.plaintext.clone(),
        })
    }

    async fn disconnect(&self, _session: NetworkSession) -> Result<(), NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.open_sessions = state.open_sessions.saturating_sub(1);
        Ok(())
    }
}
