// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use crate::{
    error::ApiError,
    models::HistoryResponse,
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

#[utoipa::path(
    get,
    path = "/v1/history",
    tag = "History",
    responses((status = 200, body = HistoryResponse))
)]
pub async fn list_history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ApiError> {
    let entries = state.history.list()?;
    let count = entries.len();
    Ok(Json(HistoryResponse { entries, count }))
}

#[utoipa::path(
    delete,
    path = "/v1/history/{entry_id}",
    params(("entry_id" = u64, Path, description = "History entry id")),
    tag = "History",
    responses((status = 204, description = "Removed (idempotent)"))
)]
pub async fn remove_history_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let removed = state.history.remove(entry_id)?;
    if removed {
        audit(
            &state,
            AuditEvent::new(AuditEventType::HistoryEntryRemoved)
                .with_resource(entry_id.to_string()),
        );
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/history",
    tag = "History",
    responses((status = 204, description = "Cleared (idempotent)"))
)]
pub async fn clear_history(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.history.clear()?;
    audit(&state, AuditEvent::new(AuditEventType::HistoryCleared));
    Ok(StatusCode::NO_CONTENT)
}

fn audit(state: &AppState, event: AuditEvent) {
    if let Err(e) = state.audit.log(&event) {
        warn!(error = %e, "Audit write failed");
    }
}
