use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use siteline_types::{DeviceId, UserId};

use crate::error::SyncError;

/// Per-(worker, device) watermark: the server timestamp the device last
/// successfully synchronized to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub worker: UserId,
    pub device: DeviceId,
    pub last_sync_at: DateTime<Utc>,
}

/// Persistence boundary for sync cursors.
///
/// Cursors are monotonic: `advance` never moves a cursor backwards,
/// even if handed an older timestamp.
pub trait SyncCursorStore: Send + Sync {
    fn get(&self, worker: &UserId, device: &DeviceId) -> Result<Option<SyncCursor>, SyncError>;

    fn advance(
        &self,
        worker: UserId,
        device: DeviceId,
        to: DateTime<Utc>,
    ) -> Result<SyncCursor, SyncError>;
}

/// In-memory cursor store for tests and embedding.
#[derive(Default)]
pub struct InMemorySyncCursorStore {
    inner: RwLock<HashMap<(UserId, DeviceId), SyncCursor>>,
}

impl InMemorySyncCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncCursorStore for InMemorySyncCursorStore {
    fn get(&self, worker: &UserId, device: &DeviceId) -> Result<Option<SyncCursor>, SyncError> {
        let cursors = self
            .inner
            .read()
            .map_err(|_| SyncError::Store("cursor lock poisoned".into()))?;
        Ok(cursors.get(&(*worker, device.clone())).cloned())
    }

    fn advance(
        &self,
        worker: UserId,
        device: DeviceId,
        to: DateTime<Utc>,
    ) -> Result<SyncCursor, SyncError> {
        let mut cursors = self
            .inner
            .write()
            .map_err(|_| SyncError::Store("cursor lock poisoned".into()))?;
        let entry = cursors
            .entry((worker, device.clone()))
            .or_insert(SyncCursor {
                worker,
                device,
                last_sync_at: to,
            });
        if to > entry.last_sync_at {
            entry.last_sync_at = to;
        }
        Ok(entry.clone())
    }
}
