use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use siteline_sync::{
    AppliedMutation, Conflict, DeviceMutation, MutationRejection, Resolution, ServerSnapshot,
};
use siteline_types::{DomainEvent, GeoPoint, SiteId};

pub const PROTOCOL_VERSION: u32 = 1;

/// Body of `POST /v1/sync`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Opaque, device-chosen identifier keying the sync cursor.
    pub device_id: String,
    /// The timestamp of the last snapshot this device received.
    #[serde(default)]
    pub cursor: Option<DateTime<Utc>>,
    /// Ask for the full entity set instead of the delta since `cursor`.
    #[serde(default)]
    pub full_sync: bool,
    /// Locally-queued mutations, oldest first.
    #[serde(default)]
    pub mutations: Vec<DeviceMutation>,
}

/// Response of `POST /v1/sync`. The device stores
/// `snapshot.meta.timestamp` as its new cursor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub applied: Vec<AppliedMutation>,
    pub conflicts: Vec<Conflict>,
    pub errors: Vec<MutationRejection>,
    pub snapshot: ServerSnapshot,
}

/// Body of `POST /v1/shifts/start`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartShiftRequest {
    pub site_id: SiteId,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Body of `POST /v1/shifts/{id}/end`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EndShiftRequest {
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Body of `POST /v1/conflicts/{id}/resolve`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolveConflictRequest {
    pub resolution: Resolution,
    /// Required when `resolution` is `merge`.
    #[serde(default)]
    pub merged: Option<serde_json::Value>,
}

/// Body of `POST /v1/assignments`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrantAssignmentRequest {
    pub worker: siteline_types::UserId,
    pub site_id: SiteId,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
}

/// One server→client frame on the realtime channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealtimeFrame {
    /// Wire name of the event (`shift_started`, `shift_ended`,
    /// `new_assignment`, `force_sync_required`).
    pub event: String,
    pub entity_id: uuid::Uuid,
    pub timestamp: DateTime<Utc>,
}

impl From<&DomainEvent> for RealtimeFrame {
    fn from(event: &DomainEvent) -> Self {
        Self {
            event: event.kind.as_str().to_string(),
            entity_id: event.entity_id,
            timestamp: event.timestamp,
        }
    }
}

/// JSON error body every failed request returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Structured rejection detail where one exists (e.g. measured
    /// distance vs required radius on a geofence rejection).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub protocol_version: u32,
}
