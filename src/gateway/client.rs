// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the threshold network coordinator.
//!
//! Implements [`ThresholdNetwork`] over the coordinator's REST surface.
//! The connect handshake applies a bounded, jittered retry. Every other
//! operation is single-shot: decrypt failures are non-retryable at this
//! layer and retry policy for them belongs to the caller.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{
    CONNECT_ATTEMPTS, CONNECT_BACKOFF_MS, DEFAULT_NETWORK_NAME, NETWORK_HTTP_TIMEOUT_SECS,
    NETWORK_NAME_ENV, NETWORK_URL_ENV,
};
use crate::policy::AccessPolicyCondition;

use super::network::{
    AuthChallenge, AuthSignature, CapacityCredential, DelegationAuth, DelegationRequest,
    EncryptedPayload, MintParams, NetworkError, NetworkSession, SandboxRequest, SandboxResponse,
    SessionAuthRequest, SessionAuthorization, ThresholdNetwork,
};
use super::session::SessionAuthenticator;

/// HTTP implementation of the threshold network contract.
#[derive(Debug, Clone)]
pub struct NodeClient {
    base_url: String,
    network_name: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    session_id: String,
    latest_blockhash: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    status: String,
    challenge: Option<AuthChallenge>,
    authorization: Option<SessionAuthorization>,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    response: Option<String>,
    error: Option<String>,
}

impl NodeClient {
    /// Create a client for the given coordinator base URL.
    pub fn new(
        base_url: impl Into<String>,
        network_name: impl Into<String>,
    ) -> Result<Self, NetworkError> {
        let base_url = base_url.into();
        let _: url::Url = base_url
            .parse()
            .map_err(|e: url::ParseError| NetworkError::MissingConfig(format!(
                "invalid {NETWORK_URL_ENV}: {e}"
            )))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(NETWORK_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| NetworkError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            network_name: network_name.into(),
            http,
        })
    }

    /// Create a client from `NETWORK_URL` / `NETWORK_NAME`.
    pub fn from_env() -> Result<Self, NetworkError> {
        let base_url = std::env::var(NETWORK_URL_ENV)
            .map_err(|_| NetworkError::MissingConfig(NETWORK_URL_ENV.to_string()))?;
        let network_name = std::env::var(NETWORK_NAME_ENV)
            .unwrap_or_else(|_| DEFAULT_NETWORK_NAME.to_string());
        Self::new(base_url, network_name)
    }

    /// The network identifier sent in the connect handshake.
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON payload and return the decoded body.
    ///
    /// 401/403 map to [`NetworkError::Denied`] with the server's opaque
    /// message; other non-2xx statuses map to [`NetworkError::Request`].
    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, NetworkError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(payload)
            .send()
            .await
            .map_err(|e| NetworkError::Request(format!("{path}: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(format!("{path}: {e}")))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(NetworkError::Denied(error_message(&body)));
        }
        if !status.is_success() {
            return Err(NetworkError::Request(format!(
                "{path} returned {status}: {}",
                error_message(&body)
            )));
        }

        Ok(body)
    }

    async fn try_connect(&self) -> Result<NetworkSession, NetworkError> {
        let payload = json!({ "network": self.network_name });
        let body = self.post_json("/v1/connect", &payload).await?;
        let connect: ConnectResponse = decode("/v1/connect", body)?;

        Ok(NetworkSession {
            session_id: connect.session_id,
            nonce: connect.latest_blockhash,
        })
    }
}

impl ThresholdNetwork for NodeClient {
    /// Connect with a bounded retry: `CONNECT_ATTEMPTS` tries with a
    /// jittered linear backoff between them.
    async fn connect(&self) -> Result<NetworkSession, NetworkError> {
        let mut last_error = NetworkError::Connect("no attempts made".to_string());

        for attempt in 1..=CONNECT_ATTEMPTS {
            match self.try_connect().await {
                Ok(session) => {
                    debug!(session_id = %session.session_id, attempt, "Network session opened");
                    return Ok(session);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Network connect attempt failed");
                    last_error = NetworkError::Connect(e.to_string());
                }
            }

            if attempt < CONNECT_ATTEMPTS {
                let jitter_ms = (uuid::Uuid::new_v4().as_u128() % 100) as u64;
                let backoff = CONNECT_BACKOFF_MS * u64::from(attempt) + jitter_ms;
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }

        Err(last_error)
    }

    async fn encrypt(
        &self,
        session: &NetworkSession,
        conditions: &[AccessPolicyCondition],
        plaintext: &str,
    ) -> Result<EncryptedPayload, NetworkError> {
        let payload = json!({
            "session_id": session.session_id,
            "access_control_conditions": conditions,
            "data_to_encrypt": plaintext,
        });
        let body = self.post_json("/v1/encrypt", &payload).await?;
        decode("/v1/encrypt", body)
    }

    async fn mint_capacity(
        &self,
        session: &NetworkSession,
        params: &MintParams,
    ) -> Result<CapacityCredential, NetworkError> {
        let payload = json!({
            "session_id": session.session_id,
            "requests_per_kilosecond": params.requests_per_kilosecond,
            "days_until_expiration": params.days_until_expiration,
        });
        let body = self.post_json("/v1/capacity/mint", &payload).await?;
        decode("/v1/capacity/mint", body)
    }

    async fn delegation_auth(
        &self,
        session: &NetworkSession,
        request: &DelegationRequest,
    ) -> Result<DelegationAuth, NetworkError> {
        let payload = json!({
            "session_id": session.session_id,
            "owner_address": request.owner_address,
            "token_id": request.token_id,
            "delegatee_addresses": request.delegatee_addresses,
            "uses": request.uses,
        });
        let body = self.post_json("/v1/capacity/delegate", &payload).await?;
        decode("/v1/capacity/delegate", body)
    }

    /// Drives the challenge-response: the first request carries no
    /// signature; if the coordinator answers with a challenge, the
    /// authenticator signs it and the request is repeated once with the
    /// signature attached.
    async fn session_authorizations(
        &self,
        session: &NetworkSession,
        request: &SessionAuthRequest,
        authenticator: &SessionAuthenticator,
    ) -> Result<SessionAuthorization, NetworkError> {
        let mut auth_signature: Option<AuthSignature> = None;

        for _ in 0..2 {
            let payload = json!({
                "session_id": session.session_id,
                "chain": request.chain,
                "expiration": request.expiration,
                "resources": request.resources,
                "delegation": request.delegation,
                "auth_signature": auth_signature,
            });
            let body = self.post_json("/v1/sessions", &payload).await?;
            let decoded: SessionResponse = decode("/v1/sessions", body)?;

            match decoded.status.as_str() {
                "ok" => {
                    return decoded.authorization.ok_or_else(|| {
                        NetworkError::InvalidResponse(
                            "/v1/sessions: missing authorization".to_string(),
                        )
                    });
                }
                "challenge" => {
                    if auth_signature.is_some() {
                        // second challenge after answering one: give up
                        return Err(NetworkError::Denied(
                            "challenge signature was not accepted".to_string(),
                        ));
                    }
                    let challenge = decoded.challenge.ok_or_else(|| {
                        NetworkError::InvalidResponse("/v1/sessions: missing challenge".to_string())
                    })?;
                    auth_signature = Some(authenticator.answer_challenge(&challenge).await?);
                }
                "expired" => {
                    return Err(NetworkError::SessionExpired(
                        "coordinator rejected the requested validity window".to_string(),
                    ));
                }
                other => {
                    return Err(NetworkError::InvalidResponse(format!(
                        "/v1/sessions: unknown status {other:?}"
                    )));
                }
            }
        }

        Err(NetworkError::Denied(
            "session authorization was not issued".to_string(),
        ))
    }

    async fn execute(
        &self,
        session: &NetworkSession,
        authorization: &SessionAuthorization,
        request: &SandboxRequest,
    ) -> Result<SandboxResponse, NetworkError> {
        if authorization.is_expired() {
            return Err(NetworkError::SessionExpired(
                "session authorization expired before dispatch".to_string(),
            ));
        }

        let payload = json!({
            "session_id": session.session_id,
            "session_signatures": authorization.session_signatures,
            "program": request.program,
            "parameters": request.parameters,
        });
        let body = self.post_json("/v1/execute", &payload).await?;
        let decoded: ExecuteResponse = decode("/v1/execute", body)?;

        if let Some(error) = decoded.error {
            return Err(NetworkError::Execution(error));
        }
        match decoded.response {
            Some(response) => Ok(SandboxResponse { response }),
            None => Err(NetworkError::InvalidResponse(
                "/v1/execute: neither response nor error present".to_string(),
            )),
        }
    }

    async fn disconnect(&self, session: NetworkSession) -> Result<(), NetworkError> {
        let payload = json!({ "session_id": session.session_id });
        self.post_json("/v1/disconnect", &payload).await?;
        debug!(session_id = %session.session_id, "Network session released");
        Ok(())
    }
}

/// Decode a JSON body into a typed response.
fn decode<T: serde::de::DeserializeOwned>(path: &str, body: Value) -> Result<T, NetworkError> {
    serde_json::from_value(body)
        .map_err(|e| NetworkError::InvalidResponse(format!("{path}: {e}")))
}

/// Extract the coordinator's error message from a response body.
fn error_message(body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .unwrap_or("no error message")
        .to_string()
}
