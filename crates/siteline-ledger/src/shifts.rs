use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use siteline_geo::check_location;
use siteline_types::{
    Audience, DomainEvent, EventKind, EventSink, GeoPoint, ShiftId, SiteId, UserId,
};

use crate::error::LedgerError;
use crate::records::{Shift, Site};
use crate::traits::{AssignmentDirectory, ShiftStore, SiteDirectory};

/// The shift lifecycle state machine.
///
/// Per worker: Idle → Active (start) → Idle (end). Every transition
/// runs the admission rules — assignment authorization, the
/// single-active-shift invariant, and the site geofence — and every
/// successful transition emits a domain event to the worker and to
/// supervisors.
pub struct ShiftLedger {
    shifts: Arc<dyn ShiftStore>,
    assignments: Arc<dyn AssignmentDirectory>,
    sites: Arc<dyn SiteDirectory>,
    events: Arc<dyn EventSink>,
}

impl ShiftLedger {
    /// The fanout (or a [`siteline_types::NullSink`]) is passed in at
    /// construction; the ledger never looks services up after the fact.
    pub fn new(
        shifts: Arc<dyn ShiftStore>,
        assignments: Arc<dyn AssignmentDirectory>,
        sites: Arc<dyn SiteDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            shifts,
            assignments,
            sites,
            events,
        }
    }

    /// Start a shift with a server-minted id.
    pub fn start_shift(
        &self,
        worker: UserId,
        site: SiteId,
        location: Option<GeoPoint>,
    ) -> Result<Shift, LedgerError> {
        self.start_shift_with_id(ShiftId::new(), worker, site, location)
    }

    /// Start a shift with a caller-supplied id (offline devices mint
    /// their own so replayed sync batches stay idempotent).
    ///
    /// Rejections, in the order they are checked: `NoAssignment`,
    /// `AlreadyActive`, `SiteNotFound`/`SiteInactive`, `OutOfRange`.
    /// The already-active check is repeated inside the store's
    /// conditional insert, which is the authoritative one.
    pub fn start_shift_with_id(
        &self,
        id: ShiftId,
        worker: UserId,
        site: SiteId,
        location: Option<GeoPoint>,
    ) -> Result<Shift, LedgerError> {
        let now = Utc::now();

        if self
            .assignments
            .active_assignment(&worker, &site, now)?
            .is_none()
        {
            debug!(%worker, %site, "shift start rejected: no assignment");
            return Err(LedgerError::NoAssignment { worker, site });
        }

        if self.shifts.active_for_worker(&worker)?.is_some() {
            return Err(LedgerError::AlreadyActive { worker });
        }

        let site_row = self.lookup_active_site(&site)?;
        if let Some(point) = location {
            self.check_fence(&site_row, point)?;
        }

        let shift = self
            .shifts
            .insert_if_idle(Shift::start(id, worker, site, location))?;

        info!(shift = %shift.id, %worker, %site, "shift started");
        self.emit(EventKind::ShiftStarted, &shift);
        Ok(shift)
    }

    /// End a shift. The caller must be the shift's worker; ending from
    /// outside the site's fence is rejected exactly like starting.
    pub fn end_shift(
        &self,
        caller: UserId,
        id: ShiftId,
        location: Option<GeoPoint>,
    ) -> Result<Shift, LedgerError> {
        let shift = self
            .shifts
            .get(&id)?
            .ok_or(LedgerError::ShiftNotFound(id))?;

        if shift.worker != caller {
            return Err(LedgerError::NotShiftOwner { shift: id, caller });
        }
        if !shift.active {
            return Err(LedgerError::AlreadyEnded(id));
        }

        if let Some(point) = location {
            let site_row = self.lookup_active_site(&shift.site)?;
            self.check_fence(&site_row, point)?;
        }

        let now = Utc::now();
        let mut ended = shift;
        ended.ended_at = Some(now);
        ended.end_location = location;
        ended.active = false;
        ended.updated_at = now;
        let ended = self.shifts.update(ended)?;

        info!(
            shift = %ended.id,
            worker = %ended.worker,
            minutes = ended.duration().map(|d| d.num_minutes()).unwrap_or(0),
            "shift ended"
        );
        self.emit(EventKind::ShiftEnded, &ended);
        Ok(ended)
    }

    /// Replace the worker-visible notes on a shift. Owner-only; allowed
    /// on both open and ended shifts.
    pub fn update_notes(
        &self,
        caller: UserId,
        id: ShiftId,
        notes: Option<String>,
    ) -> Result<Shift, LedgerError> {
        let shift = self
            .shifts
            .get(&id)?
            .ok_or(LedgerError::ShiftNotFound(id))?;

        if shift.worker != caller {
            return Err(LedgerError::NotShiftOwner { shift: id, caller });
        }

        let mut updated = shift;
        updated.notes = notes;
        updated.updated_at = Utc::now();
        self.shifts.update(updated)
    }

    fn lookup_active_site(&self, id: &SiteId) -> Result<Site, LedgerError> {
        let site = self.sites.site(id)?.ok_or(LedgerError::SiteNotFound(*id))?;
        if !site.active {
            return Err(LedgerError::SiteInactive(*id));
        }
        Ok(site)
    }

    fn check_fence(&self, site: &Site, point: GeoPoint) -> Result<(), LedgerError> {
        let check = check_location(site.location, site.radius_m, point);
        if !check.in_radius {
            debug!(
                site = %site.id,
                distance_m = check.rounded_m(),
                radius_m = site.radius_m,
                "geofence rejection"
            );
            return Err(LedgerError::OutOfRange {
                distance_m: check.rounded_m(),
                radius_m: site.radius_m,
            });
        }
        Ok(())
    }

    fn emit(&self, kind: EventKind, shift: &Shift) {
        let event = DomainEvent::new(kind, *shift.id.as_uuid(), shift.worker);
        self.events.deliver(Audience::User(shift.worker), &event);
        self.events.deliver(Audience::Supervisors, &event);
    }
}
