// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only EVM chain client for the local policy preflight.
//!
//! Before a decrypt is dispatched, balance conditions can be evaluated
//! locally against chain state so an obviously unsatisfiable request
//! fails fast with a clear denial instead of a network round-trip. The
//! preflight is best-effort: it is enabled only when an RPC endpoint is
//! configured, it skips condition types it cannot evaluate, and the
//! remote sandbox remains the authority on the policy.

use std::str::FromStr;

use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};
use tracing::warn;

use crate::config::CHAIN_RPC_URL_ENV;
use crate::policy::{resolve_parameter, AccessPolicyCondition, USER_ADDRESS_PLACEHOLDER};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Errors that can occur during chain reads.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    RpcError(String),
}

/// Read-only EVM chain client.
#[derive(Debug)]
pub struct ChainClient {
    provider: HttpProvider,
}

impl ChainClient {
    /// Create a new client for the given RPC endpoint.
    pub fn new(rpc_url: &str) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self { provider })
    }

    /// Create a client from `CHAIN_RPC_URL`, or `None` when unset.
    pub fn from_env() -> Result<Option<Self>, ChainError> {
        match std::env::var(CHAIN_RPC_URL_ENV) {
            Ok(rpc_url) if !rpc_url.trim().is_empty() => Ok(Some(Self::new(rpc_url.trim())?)),
            _ => Ok(None),
        }
    }

    /// Get the native balance of an address.
    pub async fn native_balance(&self, address: &str) -> Result<U256, ChainError> {
        let addr =
            Address::from_str(address).map_err(|e| ChainError::InvalidAddress(e.to_string()))?;

        self.provider
            .get_balance(addr)
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    /// Evaluate the balance conditions of a policy against chain state.
    ///
    /// Returns `false` as soon as one `eth_getBalance` condition is
    /// definitively unsatisfied for `user_address`. Conditions this client
    /// cannot evaluate (contract calls, unparseable values) are skipped.
    pub async fn preflight(
        &self,
        conditions: &[AccessPolicyCondition],
        user_address: &str,
    ) -> Result<bool, ChainError> {
        for condition in conditions {
            if condition.method != "eth_getBalance" || !condition.contract_address.is_empty() {
                continue;
            }

            let target = condition
                .parameters
                .first()
                .map(String::as_str)
                .unwrap_or(USER_ADDRESS_PLACEHOLDER);
            let target = resolve_parameter(target, user_address);

            let balance = self.native_balance(&target).await?;
            let test = &condition.return_value_test;
            match test.comparator.evaluate_u256(balance, &test.value) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(e) => {
                    warn!(error = %e, "Skipping unevaluable balance condition in preflight");
                }
            }
        }
        Ok(true)
    }
}
