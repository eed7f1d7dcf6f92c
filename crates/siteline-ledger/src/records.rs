use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use siteline_types::{AssignmentId, GeoPoint, ShiftId, SiteId, UserId};

/// A construction site with its registered geofence.
///
/// Sites are operator-managed and read-only to this subsystem; the
/// location and admission radius define the geofence the shift ledger
/// checks on every geolocated transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub location: GeoPoint,
    /// Admission radius around `location`, in meters.
    pub radius_m: u32,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl Site {
    pub fn new(name: impl Into<String>, location: GeoPoint, radius_m: u32) -> Self {
        Self {
            id: SiteId::new(),
            name: name.into(),
            location,
            radius_m,
            active: true,
            updated_at: Utc::now(),
        }
    }
}

/// A time-bounded authorization for a worker to clock in at a site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub worker: UserId,
    pub site: SiteId,
    /// Inclusive start of the validity window; open-ended if absent.
    pub valid_from: Option<DateTime<Utc>>,
    /// Inclusive end of the validity window; open-ended if absent.
    pub valid_to: Option<DateTime<Utc>>,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(worker: UserId, site: SiteId) -> Self {
        Self {
            id: AssignmentId::new(),
            worker,
            site,
            valid_from: None,
            valid_to: None,
            active: true,
            updated_at: Utc::now(),
        }
    }

    /// Restrict the assignment to a validity window.
    pub fn with_window(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self
    }

    /// Whether this assignment authorizes a shift start at `at`.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.valid_to {
            if at > to {
                return false;
            }
        }
        true
    }
}

/// One worker's shift at one site.
///
/// Created in the active state by a start transition, flipped exactly
/// once to ended, and never deleted. `updated_at` is the version the
/// sync layer's staleness gate compares against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub worker: UserId,
    pub site: SiteId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub start_location: Option<GeoPoint>,
    pub end_location: Option<GeoPoint>,
    pub active: bool,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    /// Build a new active shift. The id is caller-supplied so that
    /// offline devices can mint it and replays stay idempotent.
    pub fn start(
        id: ShiftId,
        worker: UserId,
        site: SiteId,
        start_location: Option<GeoPoint>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            worker,
            site,
            started_at: now,
            ended_at: None,
            start_location,
            end_location: None,
            active: true,
            notes: None,
            updated_at: now,
        }
    }

    /// Total worked time; `None` while the shift is still open.
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }
}
