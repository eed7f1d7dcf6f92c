use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use siteline_types::{AssignmentId, ShiftId, SiteId, UserId};

use crate::error::LedgerError;
use crate::records::{Assignment, Shift, Site};
use crate::traits::{AssignmentDirectory, AssignmentStore, ShiftStore, SiteDirectory};

fn poisoned(which: &str) -> LedgerError {
    LedgerError::Store(format!("{which} lock poisoned"))
}

/// In-memory shift store for tests and embedding.
///
/// The single-active-shift invariant is enforced by holding the write
/// lock across the check and the insert, which makes the pair
/// atomically visible to every other caller.
#[derive(Default)]
pub struct InMemoryShiftStore {
    inner: RwLock<HashMap<ShiftId, Shift>>,
}

impl InMemoryShiftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShiftStore for InMemoryShiftStore {
    fn insert_if_idle(&self, shift: Shift) -> Result<Shift, LedgerError> {
        let mut shifts = self.inner.write().map_err(|_| poisoned("shift"))?;

        if shifts.values().any(|s| s.worker == shift.worker && s.active) {
            return Err(LedgerError::AlreadyActive {
                worker: shift.worker,
            });
        }

        shifts.insert(shift.id, shift.clone());
        Ok(shift)
    }

    fn get(&self, id: &ShiftId) -> Result<Option<Shift>, LedgerError> {
        let shifts = self.inner.read().map_err(|_| poisoned("shift"))?;
        Ok(shifts.get(id).cloned())
    }

    fn update(&self, shift: Shift) -> Result<Shift, LedgerError> {
        let mut shifts = self.inner.write().map_err(|_| poisoned("shift"))?;
        if !shifts.contains_key(&shift.id) {
            return Err(LedgerError::ShiftNotFound(shift.id));
        }
        shifts.insert(shift.id, shift.clone());
        Ok(shift)
    }

    fn active_for_worker(&self, worker: &UserId) -> Result<Option<Shift>, LedgerError> {
        let shifts = self.inner.read().map_err(|_| poisoned("shift"))?;
        Ok(shifts
            .values()
            .find(|s| s.worker == *worker && s.active)
            .cloned())
    }

    fn for_worker(&self, worker: &UserId) -> Result<Vec<Shift>, LedgerError> {
        let shifts = self.inner.read().map_err(|_| poisoned("shift"))?;
        let mut rows: Vec<Shift> = shifts
            .values()
            .filter(|s| s.worker == *worker)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.id);
        Ok(rows)
    }

    fn updated_since(
        &self,
        worker: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Shift>, LedgerError> {
        let shifts = self.inner.read().map_err(|_| poisoned("shift"))?;
        let mut rows: Vec<Shift> = shifts
            .values()
            .filter(|s| s.worker == *worker)
            .filter(|s| since.map_or(true, |cursor| s.updated_at >= cursor))
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.id);
        Ok(rows)
    }
}

/// In-memory assignment store for tests and embedding.
#[derive(Default)]
pub struct InMemoryAssignmentStore {
    inner: RwLock<HashMap<AssignmentId, Assignment>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssignmentDirectory for InMemoryAssignmentStore {
    fn active_assignment(
        &self,
        worker: &UserId,
        site: &SiteId,
        at: DateTime<Utc>,
    ) -> Result<Option<Assignment>, LedgerError> {
        let assignments = self.inner.read().map_err(|_| poisoned("assignment"))?;
        Ok(assignments
            .values()
            .find(|a| a.worker == *worker && a.site == *site && a.is_valid_at(at))
            .cloned())
    }

    fn for_worker(&self, worker: &UserId) -> Result<Vec<Assignment>, LedgerError> {
        let assignments = self.inner.read().map_err(|_| poisoned("assignment"))?;
        let mut rows: Vec<Assignment> = assignments
            .values()
            .filter(|a| a.worker == *worker)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn insert(&self, assignment: Assignment) -> Result<Assignment, LedgerError> {
        let mut assignments = self.inner.write().map_err(|_| poisoned("assignment"))?;
        assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    fn deactivate(&self, id: &AssignmentId, at: DateTime<Utc>) -> Result<Assignment, LedgerError> {
        let mut assignments = self.inner.write().map_err(|_| poisoned("assignment"))?;
        let assignment = assignments
            .get_mut(id)
            .ok_or(LedgerError::AssignmentNotFound(*id))?;
        assignment.active = false;
        assignment.updated_at = at;
        Ok(assignment.clone())
    }
}

/// In-memory site directory for tests and embedding.
#[derive(Default)]
pub struct InMemorySiteDirectory {
    inner: RwLock<HashMap<SiteId, Site>>,
}

impl InMemorySiteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a site. Seeding helper; sites are managed by
    /// the back office in production.
    pub fn upsert(&self, site: Site) -> Result<Site, LedgerError> {
        let mut sites = self.inner.write().map_err(|_| poisoned("site"))?;
        sites.insert(site.id, site.clone());
        Ok(site)
    }
}

impl SiteDirectory for InMemorySiteDirectory {
    fn site(&self, id: &SiteId) -> Result<Option<Site>, LedgerError> {
        let sites = self.inner.read().map_err(|_| poisoned("site"))?;
        Ok(sites.get(id).cloned())
    }

    fn all_active(&self) -> Result<Vec<Site>, LedgerError> {
        let sites = self.inner.read().map_err(|_| poisoned("site"))?;
        let mut rows: Vec<Site> = sites.values().filter(|s| s.active).cloned().collect();
        rows.sort_by_key(|s| s.id);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn insert_if_idle_rejects_second_active_shift() {
        let store = InMemoryShiftStore::new();
        let worker = UserId::new();
        let site = SiteId::new();

        store
            .insert_if_idle(Shift::start(ShiftId::new(), worker, site, None))
            .unwrap();

        let error = store
            .insert_if_idle(Shift::start(ShiftId::new(), worker, site, None))
            .unwrap_err();
        assert_eq!(error, LedgerError::AlreadyActive { worker });
    }

    #[test]
    fn concurrent_starts_admit_exactly_one() {
        let store = Arc::new(InMemoryShiftStore::new());
        let worker = UserId::new();
        let site = SiteId::new();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store
                    .insert_if_idle(Shift::start(ShiftId::new(), worker, site, None))
                    .is_ok()
            }));
        }

        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
        assert!(store.active_for_worker(&worker).unwrap().is_some());
    }

    #[test]
    fn ending_frees_the_worker_for_a_new_shift() {
        let store = InMemoryShiftStore::new();
        let worker = UserId::new();
        let site = SiteId::new();

        let mut shift = store
            .insert_if_idle(Shift::start(ShiftId::new(), worker, site, None))
            .unwrap();
        shift.active = false;
        shift.ended_at = Some(Utc::now());
        store.update(shift).unwrap();

        assert!(store.active_for_worker(&worker).unwrap().is_none());
        store
            .insert_if_idle(Shift::start(ShiftId::new(), worker, site, None))
            .unwrap();
    }

    #[test]
    fn update_requires_existing_row() {
        let store = InMemoryShiftStore::new();
        let ghost = Shift::start(ShiftId::new(), UserId::new(), SiteId::new(), None);
        assert_eq!(
            store.update(ghost.clone()).unwrap_err(),
            LedgerError::ShiftNotFound(ghost.id)
        );
    }

    #[test]
    fn updated_since_filters_by_version() {
        let store = InMemoryShiftStore::new();
        let worker = UserId::new();
        let site = SiteId::new();

        let old = store
            .insert_if_idle(Shift::start(ShiftId::new(), worker, site, None))
            .unwrap();
        let cursor = old.updated_at + chrono::Duration::milliseconds(1);

        assert!(store.updated_since(&worker, Some(cursor)).unwrap().is_empty());
        assert_eq!(store.updated_since(&worker, None).unwrap().len(), 1);
    }

    #[test]
    fn assignment_lookup_honors_window_and_flag() {
        let store = InMemoryAssignmentStore::new();
        let worker = UserId::new();
        let site = SiteId::new();
        let now = Utc::now();

        let a = store.insert(Assignment::new(worker, site)).unwrap();
        assert!(store.active_assignment(&worker, &site, now).unwrap().is_some());

        store.deactivate(&a.id, now).unwrap();
        assert!(store.active_assignment(&worker, &site, now).unwrap().is_none());
    }

    #[test]
    fn site_directory_lists_only_active() {
        let dir = InMemorySiteDirectory::new();
        let point = siteline_types::GeoPoint::new(1.0, 1.0).unwrap();

        let open = dir.upsert(Site::new("North tower", point, 50)).unwrap();
        let mut closed = Site::new("Decommissioned", point, 50);
        closed.active = false;
        dir.upsert(closed).unwrap();

        let active = dir.all_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open.id);
    }
}
