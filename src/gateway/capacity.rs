// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Quota/capacity management for threshold network usage.
//!
//! Every gateway operation must hold a capacity credential before it may
//! proceed. A credential configured via `CAPACITY_TOKEN_ID` is reused
//! as-is with no network calls; otherwise one is minted lazily with fixed
//! parameters and cached for the remainder of the process lifetime.
//!
//! Concurrent `ensure` calls are serialized behind a mutex, so two
//! overlapping operations on a fresh process still produce at most one
//! mint. Mint failure is fatal to the enclosing operation and is not
//! retried here.

use tokio::sync::Mutex;

use crate::config::{CAPACITY_TOKEN_ID_ENV, MINT_EXPIRATION_DAYS, MINT_REQUESTS_PER_KILOSECOND};

use super::network::{CapacityCredential, MintParams, NetworkSession, ThresholdNetwork};
use super::GatewayError;

/// Ensures a capacity credential exists before an operation proceeds.
pub struct CapacityManager {
    /// Externally configured token id, if any. Takes precedence; never
    /// replaced by a mint.
    configured: Option<String>,
    /// Credential minted by this process, if any.
    minted: Mutex<Option<CapacityCredential>>,
    params: MintParams,
}

impl CapacityManager {
    /// Create a manager, optionally seeded with a configured token id.
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured: configured.filter(|token| !token.trim().is_empty()),
            minted: Mutex::new(None),
            params: MintParams {
                requests_per_kilosecond: MINT_REQUESTS_PER_KILOSECOND,
                days_until_expiration: MINT_EXPIRATION_DAYS,
            },
        }
    }

    /// Create a manager seeded from the `CAPACITY_TOKEN_ID` environment
    /// variable.
    pub fn from_env() -> Self {
        Self::new(std::env::var(CAPACITY_TOKEN_ID_ENV).ok())
    }

    /// Return the capacity credential, minting one on first use.
    ///
    /// Idempotent: a configured or previously minted credential is
    /// returned without any network call.
    pub async fn ensure<N: ThresholdNetwork>(
        &self,
        network: &N,
        session: &NetworkSession,
    ) -> Result<CapacityCredential, GatewayError> {
        if let Some(token_id) = &self.configured {
            return Ok(CapacityCredential {
                token_id: token_id.clone(),
                remaining_quota_hint: None,
            });
        }

        let mut minted = self.minted.lock().await;
        if let Some(credential) = minted.as_ref() {
            return Ok(credential.clone());
        }

        tracing::info!(
            requests_per_kilosecond = self.params.requests_per_kilosecond,
            days_until_expiration = self.params.days_until_expiration,
            "No capacity credential configured; minting a new one"
        );

        let credential = network
            .mint_capacity(session, &self.params)
            .await
            .map_err(|e| GatewayError::Quota(e.to_string()))?;

        *minted = Some(credential.clone());
        Ok(credential)
    }
}
