// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        DecryptSecretRequest, DecryptSecretResponse, EncryptSecretRequest, EncryptSecretResponse,
        HistoryResponse,
    },
    policy::{AccessPolicyCondition, Comparator, ReturnValueTest},
    state::AppState,
    storage::{HistoryEntry, SealedRecord},
};

pub mod health;
pub mod history;
pub mod secrets;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/secrets/encrypt", post(secrets::encrypt_secret))
        .route("/secrets/decrypt", post(secrets::decrypt_secret))
        .route(
            "/history",
            get(history::list_history).delete(history::clear_history),
        )
        .route("/history/{entry_id}", delete(history::remove_history_entry))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        secrets::encrypt_secret,
        secrets::decrypt_secret,
        history::list_history,
        history::remove_history_entry,
        history::clear_history,
        health::health,
        health::ready
    ),
    components(
        schemas(
            EncryptSecretRequest,
            EncryptSecretResponse,
            DecryptSecretRequest,
            DecryptSecretResponse,
            HistoryResponse,
            AccessPolicyCondition,
            ReturnValueTest,
            Comparator,
            SealedRecord,
            HistoryEntry,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Secrets", description = "Encrypt and decrypt secrets under access policies"),
        (name = "History", description = "Sealed record history"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
