use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use siteline_types::{Audience, DomainEvent, EventKind, EventSink, SiteId, UserId};

use crate::error::LedgerError;
use crate::records::Assignment;
use crate::traits::AssignmentStore;

/// Operator-facing glue over the assignment store.
///
/// Assignment CRUD proper lives in the back office; this ledger exists
/// so that granting or revoking an authorization notifies the affected
/// worker's devices over the realtime channel.
pub struct AssignmentLedger {
    assignments: Arc<dyn AssignmentStore>,
    events: Arc<dyn EventSink>,
}

impl AssignmentLedger {
    pub fn new(assignments: Arc<dyn AssignmentStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            assignments,
            events,
        }
    }

    /// Authorize a worker for a site, optionally time-bounded. Emits
    /// `new_assignment` to the worker and to supervisors.
    pub fn grant(
        &self,
        worker: UserId,
        site: SiteId,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Result<Assignment, LedgerError> {
        let assignment = self
            .assignments
            .insert(Assignment::new(worker, site).with_window(valid_from, valid_to))?;

        info!(assignment = %assignment.id, %worker, %site, "assignment granted");
        let event = DomainEvent::new(
            EventKind::NewAssignment,
            *assignment.id.as_uuid(),
            worker,
        );
        self.events.deliver(Audience::User(worker), &event);
        self.events.deliver(Audience::Supervisors, &event);
        Ok(assignment)
    }

    /// Soft-deactivate an assignment. The worker's devices are told to
    /// resync since their cached authorization list just changed.
    pub fn revoke(
        &self,
        id: &siteline_types::AssignmentId,
    ) -> Result<Assignment, LedgerError> {
        let assignment = self.assignments.deactivate(id, Utc::now())?;

        info!(assignment = %assignment.id, worker = %assignment.worker, "assignment revoked");
        let event = DomainEvent::new(
            EventKind::ForceSyncRequired,
            *assignment.id.as_uuid(),
            assignment.worker,
        );
        self.events
            .deliver(Audience::User(assignment.worker), &event);
        Ok(assignment)
    }
}
