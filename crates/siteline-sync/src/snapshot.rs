use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use siteline_ledger::{Assignment, Shift, Site};

/// Version stamp of the snapshot wire shape.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Metadata block every snapshot carries. The device replaces its sync
/// cursor with `timestamp` on receipt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}

impl SnapshotMeta {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            version: SNAPSHOT_VERSION,
        }
    }
}

/// Everything a worker's device needs as its new baseline: the worker's
/// shifts and assignments plus the active site list, filtered to rows
/// at or after the device's cursor (or the full set on a full sync).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub shifts: Vec<Shift>,
    pub assignments: Vec<Assignment>,
    pub sites: Vec<Site>,
    pub meta: SnapshotMeta,
}
