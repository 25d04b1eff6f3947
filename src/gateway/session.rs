// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session authentication: challenge signing and authorization caching.
//!
//! The network issues session signatures only after the gateway proves
//! control of its signing credential by answering a wallet-style sign-in
//! challenge. The [`SessionAuthenticator`] builds and signs that message
//! on demand. It is invoked lazily by the network client, never as a
//! blocking precondition.
//!
//! Issued authorizations are cached in a small LRU keyed by resource
//! descriptor so repeated decrypts of the same record within the validity
//! window reuse one signature. Expired entries are evicted on lookup and
//! never returned.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use lru::LruCache;

use crate::config::SESSION_CACHE_CAPACITY;
use crate::signer::KeyMaterial;

use super::network::{AuthChallenge, AuthSignature, NetworkError, SessionAuthorization};

/// Answers session challenges and caches issued authorizations.
pub struct SessionAuthenticator {
    key: Arc<KeyMaterial>,
    cache: Mutex<LruCache<String, SessionAuthorization>>,
}

impl SessionAuthenticator {
    /// Create an authenticator over the service signing credential.
    pub fn new(key: Arc<KeyMaterial>) -> Self {
        Self {
            key,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(SESSION_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Address of the underlying signing credential.
    pub fn address(&self) -> String {
        self.key.address_string()
    }

    /// Sign an authorization challenge with the service credential.
    pub async fn answer_challenge(
        &self,
        challenge: &AuthChallenge,
    ) -> Result<AuthSignature, NetworkError> {
        let address = self.key.address_string();
        let message = build_auth_message(challenge, &address);
        let signature = self
            .key
            .sign_text(&message)
            .await
            .map_err(|e| NetworkError::ChallengeSigning(e.to_string()))?;

        Ok(AuthSignature {
            address,
            signed_message: message,
            signature,
        })
    }

    /// Look up a cached authorization for a resource descriptor.
    ///
    /// Returns `None` when absent or expired; expired entries are removed.
    pub fn cached(&self, resource: &str) -> Option<SessionAuthorization> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(authorization) = cache.get(resource) {
            if !authorization.is_expired() {
                return Some(authorization.clone());
            }
            cache.pop(resource);
        }
        None
    }

    /// Cache an issued authorization under its resource descriptor.
    pub fn store(&self, resource: &str, authorization: SessionAuthorization) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(resource.to_string(), authorization);
        }
    }
}

/// Render the sign-in message for a challenge.
///
/// Wallet-style layout: identity line, statement, then one field per
/// line. The network re-derives this exact text to verify the signature,
/// so the format is part of the wire contract.
fn build_auth_message(challenge: &AuthChallenge, address: &str) -> String {
    let mut message = format!(
        "{uri} wants you to sign in with your account:\n{address}\n\n\
         Authorize a scoped vault session.\n\n\
         URI: {uri}\n\
         Version: 1\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}\n\
         Expiration Time: {expiration}",
        uri = challenge.uri,
        address = address,
        nonce = challenge.nonce,
        issued_at = Utc::now().to_rfc3339(),
        expiration = challenge.expiration.to_rfc3339(),
    );
    if !challenge.resources.is_empty() {
        message.push_str("\nResources:");
        for resource in &challenge.resources {
            message.push_str("\n- ");
            message.push_str(resource);
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use alloy::signers::local::PrivateKeySigner;
    use chrono::Duration;

    fn test_authenticator() -> SessionAuthenticator {
        SessionAuthenticator::new(Arc::new(KeyMaterial::from_signer(PrivateKeySigner::random())))
    }

    fn authorization(ttl_secs: i64) -> SessionAuthorization {
        SessionAuthorization {
            session_signatures: BTreeMap::from([(
                "https://node-1.example".to_string(),
                "sig".to_string(),
            )]),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        }
    }

    #[test]
    fn cache_returns_unexpired_entries_only() {
        let authenticator = test_authenticator();

        authenticator.store("resource-a", authorization(60));
        assert!(authenticator.cached("resource-a").is_some());

        authenticator.store("resource-b", authorization(-1));
        assert!(authenticator.cached("resource-b").is_none());
        // expired entry was evicted, not just skipped
        assert!(authenticator.cached("resource-b").is_none());

        assert!(authenticator.cached("never-stored").is_none());
    }

    #[tokio::test]
    async fn answer_challenge_signs_the_rendered_message() {
        let authenticator = test_authenticator();
        let challenge = AuthChallenge {
            uri: "https://network.example/session".to_string(),
            nonce: "0xblockhash".to_string(),
            expiration: Utc::now() + Duration::seconds(600),
            resources: vec!["abc/def".to_string()],
        };

        let answer = authenticator.answer_challenge(&challenge).await.unwrap();

        assert_eq!(answer.address, authenticator.address());
        assert!(answer.signed_message.contains(&answer.address));
        assert!(answer.signed_message.contains("Nonce: 0xblockhash"));
        assert!(answer.signed_message.contains("- abc/def"));
        assert_eq!(answer.signature.len(), 130);
    }
}
