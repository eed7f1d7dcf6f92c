use chrono::{DateTime, Utc};

use siteline_types::{AssignmentId, ShiftId, SiteId, UserId};

use crate::error::LedgerError;
use crate::records::{Assignment, Shift, Site};

/// Persistence boundary for shift records.
///
/// All implementations must satisfy these invariants:
/// - `insert_if_idle` checks "no active shift for this worker" and
///   inserts the new row as one atomically-visible unit. Two concurrent
///   calls for the same worker must not both succeed.
/// - Shifts are never removed; ending a shift is an update, not a delete.
/// - `updated_at` is written exactly as the caller supplies it; the
///   store does not stamp versions on its own.
pub trait ShiftStore: Send + Sync {
    /// Insert a new active shift, failing with
    /// [`LedgerError::AlreadyActive`] if the worker already has one.
    fn insert_if_idle(&self, shift: Shift) -> Result<Shift, LedgerError>;

    /// Fetch a shift by id. `Ok(None)` if it does not exist.
    fn get(&self, id: &ShiftId) -> Result<Option<Shift>, LedgerError>;

    /// Replace an existing shift row. Fails with
    /// [`LedgerError::ShiftNotFound`] if the id is unknown.
    fn update(&self, shift: Shift) -> Result<Shift, LedgerError>;

    /// The worker's currently active shift, if any.
    fn active_for_worker(&self, worker: &UserId) -> Result<Option<Shift>, LedgerError>;

    /// All shifts belonging to a worker.
    fn for_worker(&self, worker: &UserId) -> Result<Vec<Shift>, LedgerError>;

    /// The worker's shifts with `updated_at >= since`; all of them when
    /// `since` is `None`. This is the incremental-sync read path.
    fn updated_since(
        &self,
        worker: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Shift>, LedgerError>;
}

/// Read-only assignment lookups, as consumed by the shift ledger and
/// the sync snapshot. This is the collaborator interface the rest of
/// the platform provides.
pub trait AssignmentDirectory: Send + Sync {
    /// The active, currently-valid assignment authorizing (worker, site)
    /// at `at`, if one exists.
    fn active_assignment(
        &self,
        worker: &UserId,
        site: &SiteId,
        at: DateTime<Utc>,
    ) -> Result<Option<Assignment>, LedgerError>;

    /// All assignments for a worker, active or not.
    fn for_worker(&self, worker: &UserId) -> Result<Vec<Assignment>, LedgerError>;
}

/// Write extension of [`AssignmentDirectory`] used by the assignment
/// ledger glue (operator grant/revoke).
pub trait AssignmentStore: AssignmentDirectory {
    /// Insert a new assignment row.
    fn insert(&self, assignment: Assignment) -> Result<Assignment, LedgerError>;

    /// Soft-deactivate an assignment. Fails with
    /// [`LedgerError::AssignmentNotFound`] if the id is unknown.
    fn deactivate(&self, id: &AssignmentId, at: DateTime<Utc>) -> Result<Assignment, LedgerError>;
}

/// Read-only site lookups. Sites are operator-managed elsewhere; this
/// subsystem only reads the geofence definition and the active flag.
pub trait SiteDirectory: Send + Sync {
    /// Fetch a site by id. `Ok(None)` if it does not exist.
    fn site(&self, id: &SiteId) -> Result<Option<Site>, LedgerError>;

    /// All active sites, for the sync snapshot's site list.
    fn all_active(&self) -> Result<Vec<Site>, LedgerError>;
}
