use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use siteline_ledger::{Assignment, Shift};
use siteline_protocol::{
    EndShiftRequest, GrantAssignmentRequest, HealthResponse, InfoResponse, ResolveConflictRequest,
    StartShiftRequest, SyncRequest, SyncResponse, PROTOCOL_VERSION,
};
use siteline_sync::{Conflict, ConflictStatus};
use siteline_types::{ConflictId, DeviceId, ShiftId};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Build and protocol info.
pub async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "siteline-server".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        protocol_version: PROTOCOL_VERSION,
    })
}

/// `POST /v1/sync` — reconcile a device's queued mutations and return
/// its new baseline snapshot.
pub async fn sync(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let device = DeviceId::new(request.device_id)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state.coordinator.sync(
        identity.user,
        device,
        request.cursor,
        request.full_sync,
        request.mutations,
    )?;

    Ok(Json(SyncResponse {
        applied: outcome.applied,
        conflicts: outcome.conflicts,
        errors: outcome.errors,
        snapshot: outcome.snapshot,
    }))
}

/// `POST /v1/shifts/start`.
pub async fn start_shift(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<StartShiftRequest>,
) -> Result<Json<Shift>, ApiError> {
    let shift = state
        .shifts
        .start_shift(identity.user, request.site_id, request.location)?;
    Ok(Json(shift))
}

/// `POST /v1/shifts/{id}/end`.
pub async fn end_shift(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<uuid::Uuid>,
    Json(request): Json<EndShiftRequest>,
) -> Result<Json<Shift>, ApiError> {
    let shift = state
        .shifts
        .end_shift(identity.user, ShiftId::from_uuid(id), request.location)?;
    Ok(Json(shift))
}

#[derive(Debug, Deserialize)]
pub struct ConflictsQuery {
    #[serde(default)]
    pub status: Option<ConflictStatus>,
}

/// `GET /v1/conflicts` — the operator queue.
pub async fn list_conflicts(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ConflictsQuery>,
) -> Result<Json<Vec<Conflict>>, ApiError> {
    identity.require_operator()?;
    let conflicts = state.coordinator.list_conflicts(query.status)?;
    Ok(Json(conflicts))
}

/// `POST /v1/conflicts/{id}/resolve`.
pub async fn resolve_conflict(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<uuid::Uuid>,
    Json(request): Json<ResolveConflictRequest>,
) -> Result<Json<Conflict>, ApiError> {
    identity.require_operator()?;
    let conflict = state.coordinator.resolve_conflict(
        ConflictId::from_uuid(id),
        request.resolution,
        identity.user,
        request.merged,
    )?;
    Ok(Json(conflict))
}

/// `POST /v1/assignments` — authorize a worker for a site.
pub async fn grant_assignment(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<GrantAssignmentRequest>,
) -> Result<Json<Assignment>, ApiError> {
    identity.require_operator()?;
    let assignment = state.assignments.grant(
        request.worker,
        request.site_id,
        request.valid_from,
        request.valid_to,
    )?;
    Ok(Json(assignment))
}

/// `DELETE /v1/assignments/{id}`.
pub async fn revoke_assignment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<Assignment>, ApiError> {
    identity.require_operator()?;
    let assignment = state
        .assignments
        .revoke(&siteline_types::AssignmentId::from_uuid(id))?;
    Ok(Json(assignment))
}
