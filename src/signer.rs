// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key-material provider for the gateway's service signing credential.
//!
//! The signing key authenticates the gateway to the threshold network: it
//! pays for capacity credits, signs delegation authorizations, and answers
//! session challenges. Keys load from the environment, either as a raw hex
//! scalar or as a PEM file (SEC1 or PKCS#8, the formats wallet tooling
//! produces). The key never leaves the process and is never logged.

use alloy::{
    primitives::Address,
    signers::{local::PrivateKeySigner, Signer},
};
use k256::SecretKey;

use crate::config::{SIGNER_KEY_ENV, SIGNER_KEY_PATH_ENV};

/// Errors raised while loading or using the signing credential.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("no signing key configured: set {SIGNER_KEY_ENV} or {SIGNER_KEY_PATH_ENV}")]
    Missing,

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// The gateway's signing credential.
///
/// Wraps a local secp256k1 signer and exposes only the operations the
/// gateway needs: the EVM address and EIP-191 message signing for session
/// challenges.
pub struct KeyMaterial {
    signer: PrivateKeySigner,
}

impl KeyMaterial {
    /// Load the signing key from the environment.
    ///
    /// `SIGNER_KEY` (hex, no 0x prefix) takes precedence; otherwise
    /// `SIGNER_KEY_PATH` names a PEM file.
    pub fn from_env() -> Result<Self, SignerError> {
        if let Ok(hex_key) = std::env::var(SIGNER_KEY_ENV) {
            return Self::from_hex(hex_key.trim());
        }
        if let Ok(path) = std::env::var(SIGNER_KEY_PATH_ENV) {
            let pem_bytes = std::fs::read(&path)
                .map_err(|e| SignerError::InvalidKey(format!("cannot read {path}: {e}")))?;
            return Self::from_pem(&pem_bytes);
        }
        Err(SignerError::Missing)
    }

    /// Build from a hex-encoded private key (64 characters, 0x prefix
    /// tolerated).
    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let key_bytes = alloy::hex::decode(hex_key)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Build from a PEM-encoded private key (SEC1 `EC PRIVATE KEY` or
    /// PKCS#8 `PRIVATE KEY`).
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, SignerError> {
        let pem_str = std::str::from_utf8(pem_bytes)
            .map_err(|e| SignerError::InvalidKey(format!("invalid UTF-8: {e}")))?;

        let pem = pem::parse(pem_str)
            .map_err(|e| SignerError::InvalidKey(format!("invalid PEM: {e}")))?;

        let secret_key = SecretKey::from_sec1_der(pem.contents())
            .or_else(|_| parse_pkcs8(pem.contents()))
            .map_err(|e| SignerError::InvalidKey(format!("unsupported key format: {e}")))?;

        Self::from_hex(&alloy::hex::encode(secret_key.to_bytes()))
    }

    /// Wrap an existing signer (used by tests).
    pub fn from_signer(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// The EVM address of the signing key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Checksummed address string, the identity presented to the network.
    pub fn address_string(&self) -> String {
        self.signer.address().to_string()
    }

    /// Sign a text message (EIP-191 personal-sign), returning the
    /// hex-encoded 65-byte signature.
    pub async fn sign_text(&self, message: &str) -> Result<String, SignerError> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(alloy::hex::encode(signature.as_bytes()))
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

/// Parse PKCS#8 DER to extract the secret key.
fn parse_pkcs8(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test vector: scalar 1 maps to this address.
    const KEY_ONE_HEX: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const KEY_ONE_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

    #[test]
    fn from_hex_derives_known_address() {
        let key = KeyMaterial::from_hex(KEY_ONE_HEX).unwrap();
        assert_eq!(key.address_string(), KEY_ONE_ADDRESS);

        // 0x prefix is tolerated
        let prefixed = KeyMaterial::from_hex(&format!("0x{KEY_ONE_HEX}")).unwrap();
        assert_eq!(prefixed.address(), key.address());
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            KeyMaterial::from_hex("zz"),
            Err(SignerError::InvalidKey(_))
        ));
        assert!(matches!(
            KeyMaterial::from_hex("abcd"),
            Err(SignerError::InvalidKey(_))
        ));
    }

    #[test]
    fn from_pem_parses_pkcs8() {
        use k256::pkcs8::EncodePrivateKey;

        let secret = SecretKey::from_slice(&alloy::hex::decode(KEY_ONE_HEX).unwrap()).unwrap();
        let der = secret.to_pkcs8_der().unwrap();
        let pem_text = pem::encode(&pem::Pem::new("PRIVATE KEY", der.as_bytes().to_vec()));

        let key = KeyMaterial::from_pem(pem_text.as_bytes()).unwrap();
        assert_eq!(key.address_string(), KEY_ONE_ADDRESS);
    }

    #[tokio::test]
    async fn sign_text_produces_65_byte_signature() {
        let key = KeyMaterial::from_signer(PrivateKeySigner::random());
        let signature = key.sign_text("challenge").await.unwrap();
        assert_eq!(signature.len(), 130);
        assert!(alloy::hex::decode(&signature).is_ok());
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let key = KeyMaterial::from_hex(KEY_ONE_HEX).unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("address"));
        assert!(!rendered.contains(KEY_ONE_HEX));
    }
}
