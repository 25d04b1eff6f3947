// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access-Policy Descriptor
//!
//! Data types and validation for access-control conditions: predicates over
//! on-chain or wallet state that gate decryption. Conditions are created by
//! the caller, validated here, and submitted unchanged to the threshold
//! network, which re-verifies them before releasing key material.
//!
//! Conditions combine as logical AND. The wire format uses camelCase field
//! names so a condition set serializes to exactly what the network nodes
//! expect.
//!
//! There is no implicit default policy. The permissive "balance >= 0"
//! condition set exists only behind the explicitly named
//! [`permissive_balance_check`] constructor, and callers must opt in to it.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use alloy::primitives::U256;
use sha2::{Digest, Sha256};

/// Placeholder substituted with the requesting signer's address when a
/// condition is evaluated.
pub const USER_ADDRESS_PLACEHOLDER: &str = ":userAddress";

/// Chain name used by [`permissive_balance_check`].
pub const DEFAULT_CHAIN: &str = "ethereum";

/// Comparison operator of a [`ReturnValueTest`].
///
/// Closed set; anything else is rejected at deserialization time rather
/// than surfacing as a network-side failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Comparator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "contains")]
    Contains,
}

impl Comparator {
    /// Evaluate `actual <comparator> expected` where `actual` is a 256-bit
    /// unsigned chain value and `expected` is the condition's value string.
    ///
    /// Numeric comparators parse `expected` as a decimal (or 0x-prefixed)
    /// integer. `contains` matches on the decimal rendering of `actual`.
    pub fn evaluate_u256(&self, actual: U256, expected: &str) -> Result<bool, PolicyError> {
        if *self == Comparator::Contains {
            return Ok(actual.to_string().contains(expected.trim()));
        }

        let expected: U256 = expected
            .trim()
            .parse()
            .map_err(|_| PolicyError::InvalidValue(expected.to_string()))?;

        Ok(match self {
            Comparator::Equal => actual == expected,
            Comparator::NotEqual => actual != expected,
            Comparator::GreaterThan => actual > expected,
            Comparator::GreaterOrEqual => actual >= expected,
            Comparator::LessThan => actual < expected,
            Comparator::LessOrEqual => actual <= expected,
            Comparator::Contains => unreachable!(),
        })
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Comparator::Equal => "=",
            Comparator::NotEqual => "!=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterOrEqual => ">=",
            Comparator::LessThan => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::Contains => "contains",
        };
        write!(f, "{symbol}")
    }
}

/// The comparison applied to a condition's method return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReturnValueTest {
    /// Comparison operator.
    pub comparator: Comparator,
    /// Right-hand side of the comparison, as a string.
    pub value: String,
}

/// A single access-control condition.
///
/// Describes one predicate the threshold network checks before releasing
/// key material: call `method` (or query `standard_contract_type` state on
/// `contract_address`) on `chain`, then apply `return_value_test` to the
/// result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyCondition {
    /// Contract to query. Empty for chain-native methods like
    /// `eth_getBalance`.
    #[serde(default)]
    pub contract_address: String,
    /// Standard contract interface (e.g. `ERC20`), empty for native methods.
    #[serde(default)]
    pub standard_contract_type: String,
    /// Chain the condition is evaluated on. Required.
    pub chain: String,
    /// RPC method or contract function to call.
    #[serde(default)]
    pub method: String,
    /// Ordered call parameters. [`USER_ADDRESS_PLACEHOLDER`] is substituted
    /// with the requesting signer's address at evaluation time.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Test applied to the call's return value.
    pub return_value_test: ReturnValueTest,
}

/// Opaque descriptor of a validated condition set.
///
/// The hex SHA-256 of the canonical condition JSON. Stored alongside sealed
/// records as metadata. Note this is metadata only: the gateway does not
/// cryptographically bind a sealed record to the policy used at encryption
/// time, and decryption requires the caller to supply the policy again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PolicyRef(pub String);

impl std::fmt::Display for PolicyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors produced by policy validation and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("condition set is empty; pass conditions or opt in to the permissive policy")]
    Empty,

    #[error("condition {0} has no chain")]
    MissingChain(usize),

    #[error("condition {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("return value test has an unparseable value: {0}")]
    InvalidValue(String),
}

/// Validate a condition set and derive its [`PolicyRef`].
///
/// Every condition must be independently well-formed: non-empty chain, a
/// method or a contract address to evaluate against, and a non-empty
/// comparison value. Pure; performs no I/O.
pub fn validate(conditions: &[AccessPolicyCondition]) -> Result<PolicyRef, PolicyError> {
    if conditions.is_empty() {
        return Err(PolicyError::Empty);
    }

    for (index, condition) in conditions.iter().enumerate() {
        if condition.chain.trim().is_empty() {
            return Err(PolicyError::MissingChain(index));
        }
        if condition.method.trim().is_empty() && condition.contract_address.trim().is_empty() {
            return Err(PolicyError::Malformed {
                index,
                reason: "neither a method nor a contract address is set".to_string(),
            });
        }
        if condition.return_value_test.value.trim().is_empty() {
            return Err(PolicyError::Malformed {
                index,
                reason: "return value test has an empty value".to_string(),
            });
        }
    }

    Ok(PolicyRef(policy_hash(conditions)))
}

/// The permissive "any funded or unfunded address" condition set: balance of
/// the requesting address >= 0 on ethereum.
///
/// Effectively unrestricted, since any wallet satisfies it. Callers must
/// request it explicitly; it is never applied as a silent default.
pub fn permissive_balance_check() -> Vec<AccessPolicyCondition> {
    vec![AccessPolicyCondition {
        contract_address: String::new(),
        standard_contract_type: String::new(),
        chain: DEFAULT_CHAIN.to_string(),
        method: "eth_getBalance".to_string(),
        parameters: vec![USER_ADDRESS_PLACEHOLDER.to_string(), "latest".to_string()],
        return_value_test: ReturnValueTest {
            comparator: Comparator::GreaterOrEqual,
            value: "0".to_string(),
        },
    }]
}

/// Canonical JSON rendering of a condition set.
///
/// Field order is fixed by the struct definitions, so equal condition sets
/// always produce byte-identical JSON.
pub fn canonical_json(conditions: &[AccessPolicyCondition]) -> String {
    serde_json::to_string(conditions).expect("condition serialization is infallible")
}

/// Hex SHA-256 of the canonical condition JSON.
pub fn policy_hash(conditions: &[AccessPolicyCondition]) -> String {
    let digest = Sha256::digest(canonical_json(conditions).as_bytes());
    alloy::hex::encode(digest)
}

/// Resource descriptor binding a condition set to an integrity hash.
///
/// Scopes a session authorization to exactly one (policy, ciphertext) pair.
pub fn resource_string(conditions: &[AccessPolicyCondition], integrity_hash: &str) -> String {
    format!("{}/{}", policy_hash(conditions), integrity_hash)
}

/// Substitute the user-address placeholder in a condition parameter.
pub fn resolve_parameter(parameter: &str, user_address: &str) -> String {
    if parameter == USER_ADDRESS_PLACEHOLDER {
        user_address.to_string()
    } else {
        parameter.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance_condition(value: &str) -> AccessPolicyCondition {
        let mut condition = permissive_balance_check().remove(0);
        condition.return_value_test.value = value.to_string();
        condition
    }

    #[test]
    fn validate_rejects_empty_set() {
        assert_eq!(validate(&[]), Err(PolicyError::Empty));
    }

    #[test]
    fn validate_rejects_missing_chain() {
        let mut condition = balance_condition("0");
        condition.chain = "  ".to_string();
        assert_eq!(validate(&[condition]), Err(PolicyError::MissingChain(0)));
    }

    #[test]
    fn validate_rejects_condition_without_target() {
        let mut condition = balance_condition("0");
        condition.method = String::new();
        condition.contract_address = String::new();
        assert!(matches!(
            validate(&[condition]),
            Err(PolicyError::Malformed { index: 0, .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_test_value() {
        let condition = balance_condition("");
        assert!(matches!(
            validate(&[condition]),
            Err(PolicyError::Malformed { index: 0, .. })
        ));
    }

    #[test]
    fn validate_accepts_permissive_policy() {
        let conditions = permissive_balance_check();
        let reference = validate(&conditions).unwrap();
        assert_eq!(reference.0, policy_hash(&conditions));
    }

    #[test]
    fn policy_hash_is_stable_and_distinguishes_policies() {
        let a = permissive_balance_check();
        assert_eq!(policy_hash(&a), policy_hash(&a.clone()));

        let b = vec![balance_condition("1000000")];
        assert_ne!(policy_hash(&a), policy_hash(&b));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = canonical_json(&permissive_balance_check());
        assert!(json.contains("\"contractAddress\""));
        assert!(json.contains("\"standardContractType\""));
        assert!(json.contains("\"returnValueTest\""));
        assert!(json.contains("\"comparator\":\">=\""));
        assert!(json.contains(":userAddress"));
    }

    #[test]
    fn comparator_round_trips_through_wire_spelling() {
        for (symbol, comparator) in [
            ("=", Comparator::Equal),
            ("!=", Comparator::NotEqual),
            (">", Comparator::GreaterThan),
            (">=", Comparator::GreaterOrEqual),
            ("<", Comparator::LessThan),
            ("<=", Comparator::LessOrEqual),
            ("contains", Comparator::Contains),
        ] {
            let json = format!("\"{symbol}\"");
            let parsed: Comparator = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, comparator);
            assert_eq!(serde_json::to_string(&comparator).unwrap(), json);
        }

        assert!(serde_json::from_str::<Comparator>("\"~=\"").is_err());
    }

    #[test]
    fn comparator_evaluates_balances() {
        let one_eth = U256::from(1_000_000_000_000_000_000u64);

        assert!(Comparator::GreaterOrEqual
            .evaluate_u256(one_eth, "0")
            .unwrap());
        assert!(Comparator::GreaterOrEqual
            .evaluate_u256(U256::ZERO, "0")
            .unwrap());
        assert!(!Comparator::GreaterOrEqual
            .evaluate_u256(U256::ZERO, "1000000")
            .unwrap());
        assert!(Comparator::LessThan.evaluate_u256(U256::ZERO, "1").unwrap());
        assert!(Comparator::Contains
            .evaluate_u256(U256::from(12345u64), "234")
            .unwrap());

        assert_eq!(
            Comparator::Equal.evaluate_u256(U256::ZERO, "not-a-number"),
            Err(PolicyError::InvalidValue("not-a-number".to_string()))
        );
    }

    #[test]
    fn resource_string_binds_policy_and_hash() {
        let conditions = permissive_balance_check();
        let resource = resource_string(&conditions, "abc123");
        assert_eq!(resource, format!("{}/abc123", policy_hash(&conditions)));
    }

    #[test]
    fn resolve_parameter_substitutes_user_address() {
        assert_eq!(
            resolve_parameter(USER_ADDRESS_PLACEHOLDER, "0xabc"),
            "0xabc"
        );
        assert_eq!(resolve_parameter("latest", "0xabc"), "latest");
    }
}
