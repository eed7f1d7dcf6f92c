use std::sync::Arc;

use siteline_fanout::{FanoutConfig, RealtimeFanout};
use siteline_ledger::{
    AssignmentLedger, InMemoryAssignmentStore, InMemoryShiftStore, InMemorySiteDirectory,
    ShiftLedger,
};
use siteline_sync::{InMemoryConflictStore, InMemorySyncCursorStore, SyncCoordinator};

use crate::config::ServerConfig;

/// Everything the handlers reach for, wired once at startup.
///
/// Construction order is deliberate: the fanout exists first and is
/// handed to the ledgers and the coordinator as their event sink — no
/// service ever looks another up after construction.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub fanout: Arc<RealtimeFanout>,
    pub shifts: Arc<ShiftLedger>,
    pub assignments: Arc<AssignmentLedger>,
    pub coordinator: Arc<SyncCoordinator>,
}

/// Concrete handles to the in-memory stores behind an
/// [`AppState::in_memory`] build. Tests and demos seed through these;
/// the handlers only ever see the trait objects.
#[derive(Clone)]
pub struct InMemoryStores {
    pub shifts: Arc<InMemoryShiftStore>,
    pub assignments: Arc<InMemoryAssignmentStore>,
    pub sites: Arc<InMemorySiteDirectory>,
    pub conflicts: Arc<InMemoryConflictStore>,
    pub cursors: Arc<InMemorySyncCursorStore>,
}

impl AppState {
    /// Build a fully in-memory stack. A persistent deployment swaps the
    /// store implementations at the same seams.
    pub fn in_memory(config: ServerConfig) -> (Self, InMemoryStores) {
        let stores = InMemoryStores {
            shifts: Arc::new(InMemoryShiftStore::new()),
            assignments: Arc::new(InMemoryAssignmentStore::new()),
            sites: Arc::new(InMemorySiteDirectory::new()),
            conflicts: Arc::new(InMemoryConflictStore::new()),
            cursors: Arc::new(InMemorySyncCursorStore::new()),
        };

        let fanout = Arc::new(RealtimeFanout::new(FanoutConfig {
            channel_capacity: config.channel_capacity,
            max_connections: config.max_connections,
        }));

        let shifts = Arc::new(ShiftLedger::new(
            stores.shifts.clone(),
            stores.assignments.clone(),
            stores.sites.clone(),
            fanout.clone(),
        ));
        let assignments = Arc::new(AssignmentLedger::new(
            stores.assignments.clone(),
            fanout.clone(),
        ));
        let coordinator = Arc::new(SyncCoordinator::new(
            shifts.clone(),
            stores.shifts.clone(),
            stores.assignments.clone(),
            stores.sites.clone(),
            stores.conflicts.clone(),
            stores.cursors.clone(),
            fanout.clone(),
        ));

        let state = Self {
            config: Arc::new(config),
            fanout,
            shifts,
            assignments,
            coordinator,
        };
        (state, stores)
    }
}
