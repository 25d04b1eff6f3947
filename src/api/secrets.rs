// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::ApiError,
    models::{
        DecryptSecretRequest, DecryptSecretResponse, EncryptSecretRequest, EncryptSecretResponse,
    },
    policy::{permissive_balance_check, AccessPolicyCondition},
    state::AppState,
};

/// Resolve the condition set of a request.
///
/// Callers must either supply non-empty conditions or explicitly opt in
/// to the permissive policy; supplying neither (or both) is an error, so
/// unrestricted access is never granted silently.
fn resolve_conditions(
    conditions: Option<Vec<AccessPolicyCondition>>,
    use_permissive_policy: bool,
) -> Result<Vec<AccessPolicyCondition>, ApiError> {
    match conditions {
        Some(conditions) if !conditions.is_empty() => {
            if use_permissive_policy {
                Err(ApiError::bad_request(
                    "pass either conditions or use_permissive_policy, not both",
                ))
            } else {
                Ok(conditions)
            }
        }
        _ if use_permissive_policy => Ok(permissive_balance_check()),
        _ => Err(ApiError::bad_request(
            "no access conditions supplied; set conditions or opt in with use_permissive_policy",
        )),
    }
}

#[utoipa::path(
    post,
    path = "/v1/secrets/encrypt",
    request_body = EncryptSecretRequest,
    tag = "Secrets",
    responses(
        (status = 201, body = EncryptSecretResponse),
        (status = 400, description = "Empty secret or missing policy opt-in"),
        (status = 422, description = "Malformed access conditions"),
        (status = 502, description = "Threshold network failure"),
        (status = 503, description = "Capacity unavailable")
    )
)]
pub async fn encrypt_secret(
    State(state): State<AppState>,
    Json(request): Json<EncryptSecretRequest>,
) -> Result<(StatusCode, Json<EncryptSecretResponse>), ApiError> {
    let conditions = resolve_conditions(request.conditions, request.use_permissive_policy)?;
    let record = state.gateway.encrypt(&request.secret, &conditions).await?;
    Ok((StatusCode::CREATED, Json(EncryptSecretResponse { record })))
}

#[utoipa::path(
    post,
    path = "/v1/secrets/decrypt",
    request_body = DecryptSecretRequest,
    tag = "Secrets",
    responses(
        (status = 200, body = DecryptSecretResponse),
        (status = 400, description = "Missing ciphertext or integrity hash"),
        (status = 403, description = "Access policy not satisfied"),
        (status = 422, description = "Malformed access conditions"),
        (status = 502, description = "Sandbox or network failure"),
        (status = 503, description = "Capacity unavailable")
    )
)]
pub async fn decrypt_secret(
    State(state): State<AppState>,
    Json(request): Json<DecryptSecretRequest>,
) -> Result<Json<DecryptSecretResponse>, ApiError> {
    let conditions = resolve_conditions(request.conditions, request.use_permissive_policy)?;
    let plaintext = state
        .gateway
        .decrypt(&request.ciphertext, &request.integrity_hash, &conditions)
        .await?;
    Ok(Json(DecryptSecretResponse { plaintext }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn explicit_conditions_are_used_verbatim() {
        let conditions = permissive_balance_check();
        let resolved = resolve_conditions(Some(conditions.clone()), false).unwrap();
        assert_eq!(resolved, conditions);
    }

    #[test]
    fn permissive_policy_requires_opt_in() {
        let error = resolve_conditions(None, false).unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);

        let error = resolve_conditions(Some(Vec::new()), false).unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);

        let resolved = resolve_conditions(None, true).unwrap();
        assert_eq!(resolved, permissive_balance_check());

        let resolved = resolve_conditions(Some(Vec::new()), true).unwrap();
        assert_eq!(resolved, permissive_balance_check());
    }

    #[test]
    fn conditions_and_opt_in_together_are_rejected() {
        let error = resolve_conditions(Some(permissive_balance_check()), true).unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }
}
