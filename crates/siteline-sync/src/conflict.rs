use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use siteline_types::{ConflictId, ShiftId, UserId};

use crate::error::SyncError;

/// What kind of entity a conflict was detected on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Shift,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shift => write!(f, "shift"),
        }
    }
}

/// Classification of a detected disagreement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The device edited a row the server had already moved past.
    UpdateConflict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Pending,
    Resolved,
}

/// The operator's decision on a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Re-apply the stored device payload, bypassing the version gate once.
    LocalWins,
    /// Keep the server row; discard the device payload.
    RemoteWins,
    /// Apply an operator-supplied merged row.
    Merge,
}

/// A durable record of one detected disagreement between a device's
/// local mutation and the server's state for the same entity.
///
/// Both payloads are captured verbatim so an operator can inspect them
/// side by side. Resolution is terminal: a resolved conflict is never
/// re-opened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub entity_kind: EntityKind,
    pub entity_id: ShiftId,
    pub worker: UserId,
    pub kind: ConflictKind,
    /// The device's mutation, as submitted.
    pub local: serde_json::Value,
    /// The server row at detection time.
    pub remote: serde_json::Value,
    pub status: ConflictStatus,
    pub resolution: Option<Resolution>,
    pub resolved_by: Option<UserId>,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Conflict {
    pub fn update_conflict(
        entity_id: ShiftId,
        worker: UserId,
        local: serde_json::Value,
        remote: serde_json::Value,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            entity_kind: EntityKind::Shift,
            entity_id,
            worker,
            kind: ConflictKind::UpdateConflict,
            local,
            remote,
            status: ConflictStatus::Pending,
            resolution: None,
            resolved_by: None,
            detected_at: Utc::now(),
            resolved_at: None,
        }
    }
}

/// Persistence boundary for conflicts.
pub trait ConflictStore: Send + Sync {
    fn insert(&self, conflict: Conflict) -> Result<Conflict, SyncError>;

    fn get(&self, id: &ConflictId) -> Result<Option<Conflict>, SyncError>;

    /// Replace an existing record. Fails if the id is unknown.
    fn update(&self, conflict: Conflict) -> Result<Conflict, SyncError>;

    /// Conflicts, newest first, optionally filtered by status.
    fn list(&self, status: Option<ConflictStatus>) -> Result<Vec<Conflict>, SyncError>;
}

/// In-memory conflict store for tests and embedding.
#[derive(Default)]
pub struct InMemoryConflictStore {
    inner: RwLock<HashMap<ConflictId, Conflict>>,
}

impl InMemoryConflictStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConflictStore for InMemoryConflictStore {
    fn insert(&self, conflict: Conflict) -> Result<Conflict, SyncError> {
        let mut conflicts = self
            .inner
            .write()
            .map_err(|_| SyncError::Store("conflict lock poisoned".into()))?;
        conflicts.insert(conflict.id, conflict.clone());
        Ok(conflict)
    }

    fn get(&self, id: &ConflictId) -> Result<Option<Conflict>, SyncError> {
        let conflicts = self
            .inner
            .read()
            .map_err(|_| SyncError::Store("conflict lock poisoned".into()))?;
        Ok(conflicts.get(id).cloned())
    }

    fn update(&self, conflict: Conflict) -> Result<Conflict, SyncError> {
        let mut conflicts = self
            .inner
            .write()
            .map_err(|_| SyncError::Store("conflict lock poisoned".into()))?;
        if !conflicts.contains_key(&conflict.id) {
            return Err(SyncError::ConflictNotFound(conflict.id));
        }
        conflicts.insert(conflict.id, conflict.clone());
        Ok(conflict)
    }

    fn list(&self, status: Option<ConflictStatus>) -> Result<Vec<Conflict>, SyncError> {
        let conflicts = self
            .inner
            .read()
            .map_err(|_| SyncError::Store("conflict lock poisoned".into()))?;
        let mut rows: Vec<Conflict> = conflicts
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        Ok(rows)
    }
}
