// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote decryption sandbox dispatch.
//!
//! Decryption never happens locally: the gateway ships a small program to
//! the network's verifiable execution sandbox, which re-checks the access
//! policy against the caller's credential and only then combines the key
//! shares. The program source below is the entire interface: the sandbox
//! receives it together with named parameters and returns whatever the
//! program sets as its response.

use serde_json::json;

use crate::policy::AccessPolicyCondition;

use super::network::SandboxRequest;

/// Program executed by the sandbox for a decryption.
///
/// `decryptToString` verifies the supplied conditions against the session
/// credential before combining key shares; on failure the sandbox reports
/// the (opaque) denial message instead of plaintext.
pub const DECRYPT_PROGRAM: &str = r#"(async () => {
  try {
    const plaintext = await Vault.Runtime.decryptToString({
      accessControlConditions,
      ciphertext,
      dataToEncryptHash,
      chain,
    });
    Vault.Runtime.setResponse({ response: plaintext });
  } catch (e) {
    Vault.Runtime.setResponse({ error: e.message });
  }
})();"#;

/// Build the sandbox dispatch for one decryption.
pub fn decrypt_request(
    conditions: &[AccessPolicyCondition],
    ciphertext: &str,
    integrity_hash: &str,
) -> SandboxRequest {
    let chain = conditions
        .first()
        .map(|condition| condition.chain.clone())
        .unwrap_or_default();

    SandboxRequest {
        program: DECRYPT_PROGRAM.to_string(),
        parameters: json!({
            "accessControlConditions": conditions,
            "ciphertext": ciphertext,
            "dataToEncryptHash": integrity_hash,
            "chain": chain,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::permissive_balance_check;

    #[test]
    fn decrypt_request_carries_conditions_and_opaque_pair() {
        let conditions = permissive_balance_check();
        let request = decrypt_request(&conditions, "cipher-blob", "hash-hex");

        assert_eq!(request.program, DECRYPT_PROGRAM);
        assert_eq!(request.parameters["ciphertext"], "cipher-blob");
        assert_eq!(request.parameters["dataToEncryptHash"], "hash-hex");
        assert_eq!(request.parameters["chain"], "ethereum");
        assert_eq!(
            request.parameters["accessControlConditions"][0]["method"],
            "eth_getBalance"
        );
    }
}
