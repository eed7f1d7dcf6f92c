//! Offline reconciliation for Siteline.
//!
//! Devices queue shift mutations while disconnected and replay them
//! through the [`SyncCoordinator`] when connectivity returns. The
//! coordinator applies what it can through the ledgers, flags what it
//! cannot as [`Conflict`]s for operator resolution, and hands back a
//! fresh server snapshot that becomes the device's new baseline.
//!
//! Application is idempotent per entity id: creates are keyed by
//! client-minted ids and updates are version-gated, so a device can
//! safely retry an entire batch after a transient failure.

pub mod conflict;
pub mod coordinator;
pub mod cursor;
pub mod error;
pub mod mutation;
pub mod snapshot;
pub mod version;

pub use conflict::{
    Conflict, ConflictKind, ConflictStatus, ConflictStore, EntityKind, InMemoryConflictStore,
    Resolution,
};
pub use coordinator::{SyncCoordinator, SyncOutcome};
pub use cursor::{InMemorySyncCursorStore, SyncCursor, SyncCursorStore};
pub use error::SyncError;
pub use mutation::{AppliedMutation, DeviceMutation, MutationKind, MutationRejection};
pub use snapshot::{ServerSnapshot, SnapshotMeta, SNAPSHOT_VERSION};
