use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use siteline_ledger::{AssignmentDirectory, ShiftLedger, ShiftStore, SiteDirectory};
use siteline_types::{
    Audience, ConflictId, DeviceId, DomainEvent, EventKind, EventSink, ShiftId, UserId,
};

use crate::conflict::{Conflict, ConflictStatus, ConflictStore, Resolution};
use crate::cursor::SyncCursorStore;
use crate::error::SyncError;
use crate::mutation::{AppliedMutation, DeviceMutation, MutationKind, MutationRejection};
use crate::snapshot::{ServerSnapshot, SnapshotMeta};
use crate::version::is_stale;

/// Result of one sync call: what was applied, what conflicted, what was
/// dropped, and the snapshot that becomes the device's new baseline.
#[derive(Clone, Debug)]
pub struct SyncOutcome {
    pub applied: Vec<AppliedMutation>,
    pub conflicts: Vec<Conflict>,
    pub errors: Vec<MutationRejection>,
    pub snapshot: ServerSnapshot,
}

/// How a single mutation fared. Only infrastructure failures escape as
/// `Err` and abort the rest of the batch.
enum ApplyResult {
    Applied(AppliedMutation),
    Conflicted(Conflict),
    Rejected(String),
}

/// Per-device reconciliation over the ledgers.
///
/// Mutations within a batch are applied strictly in submission order.
/// Batches from different devices are only ordered by the staleness
/// gate — that gate, not wall-clock luck, is the consistency boundary
/// between a worker's devices.
pub struct SyncCoordinator {
    ledger: Arc<ShiftLedger>,
    shifts: Arc<dyn ShiftStore>,
    assignments: Arc<dyn AssignmentDirectory>,
    sites: Arc<dyn SiteDirectory>,
    conflicts: Arc<dyn ConflictStore>,
    cursors: Arc<dyn SyncCursorStore>,
    events: Arc<dyn EventSink>,
}

impl SyncCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<ShiftLedger>,
        shifts: Arc<dyn ShiftStore>,
        assignments: Arc<dyn AssignmentDirectory>,
        sites: Arc<dyn SiteDirectory>,
        conflicts: Arc<dyn ConflictStore>,
        cursors: Arc<dyn SyncCursorStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ledger,
            shifts,
            assignments,
            sites,
            conflicts,
            cursors,
            events,
        }
    }

    /// Reconcile a batch of device-local mutations, then return the
    /// fresh snapshot. Safe to retry wholesale: creates are keyed by
    /// client-minted ids and updates are version-gated, so replaying an
    /// unchanged batch produces no duplicate side effects.
    pub fn sync(
        &self,
        worker: UserId,
        device: DeviceId,
        cursor: Option<DateTime<Utc>>,
        full_sync: bool,
        mutations: Vec<DeviceMutation>,
    ) -> Result<SyncOutcome, SyncError> {
        let mut applied = Vec::new();
        let mut conflicts = Vec::new();
        let mut errors = Vec::new();

        // Entities already written by this batch: later mutations from
        // the same device are causally ordered after them, so they skip
        // the staleness gate.
        let mut touched: HashSet<ShiftId> = HashSet::new();

        for mutation in &mutations {
            if let Err(reason) = mutation.validate() {
                warn!(shift = %mutation.shift_id, %reason, "malformed mutation dropped");
                errors.push(MutationRejection {
                    shift_id: mutation.shift_id,
                    kind: mutation.kind,
                    reason,
                });
                continue;
            }

            match self.apply_one(worker, mutation, &touched)? {
                ApplyResult::Applied(entry) => {
                    touched.insert(entry.shift_id);
                    applied.push(entry);
                }
                ApplyResult::Conflicted(conflict) => {
                    let conflict = self.conflicts.insert(conflict)?;
                    debug!(conflict = %conflict.id, shift = %conflict.entity_id, "conflict recorded");
                    conflicts.push(conflict);
                }
                ApplyResult::Rejected(reason) => {
                    errors.push(MutationRejection {
                        shift_id: mutation.shift_id,
                        kind: mutation.kind,
                        reason,
                    });
                }
            }
        }

        let since = if full_sync { None } else { cursor };
        let snapshot = self.snapshot(worker, since)?;
        self.cursors
            .advance(worker, device.clone(), snapshot.meta.timestamp)?;

        info!(
            %worker,
            %device,
            applied = applied.len(),
            conflicts = conflicts.len(),
            errors = errors.len(),
            "sync complete"
        );
        Ok(SyncOutcome {
            applied,
            conflicts,
            errors,
            snapshot,
        })
    }

    /// Apply an operator's decision to a pending conflict. Terminal:
    /// resolving twice is an error. Decisions that change server state
    /// tell the worker's devices to resync.
    pub fn resolve_conflict(
        &self,
        id: ConflictId,
        resolution: Resolution,
        resolver: UserId,
        merged: Option<Value>,
    ) -> Result<Conflict, SyncError> {
        let conflict = self
            .conflicts
            .get(&id)?
            .ok_or(SyncError::ConflictNotFound(id))?;
        if conflict.status == ConflictStatus::Resolved {
            return Err(SyncError::AlreadyResolved(id));
        }

        let state_changed = match resolution {
            Resolution::RemoteWins => false,
            Resolution::LocalWins => {
                self.reapply_local(&conflict)?;
                true
            }
            Resolution::Merge => {
                let merged = merged.ok_or(SyncError::MissingMergePayload)?;
                self.apply_merged(&conflict, merged)?;
                true
            }
        };

        let mut resolved = conflict;
        resolved.status = ConflictStatus::Resolved;
        resolved.resolution = Some(resolution);
        resolved.resolved_by = Some(resolver);
        resolved.resolved_at = Some(Utc::now());
        let resolved = self.conflicts.update(resolved)?;

        info!(conflict = %resolved.id, ?resolution, %resolver, "conflict resolved");
        if state_changed {
            let event = DomainEvent::new(
                EventKind::ForceSyncRequired,
                *resolved.entity_id.as_uuid(),
                resolved.worker,
            );
            self.events
                .deliver(Audience::User(resolved.worker), &event);
        }
        Ok(resolved)
    }

    /// Pending (or all) conflicts for the operator UI.
    pub fn list_conflicts(
        &self,
        status: Option<ConflictStatus>,
    ) -> Result<Vec<Conflict>, SyncError> {
        self.conflicts.list(status)
    }

    fn apply_one(
        &self,
        worker: UserId,
        mutation: &DeviceMutation,
        touched: &HashSet<ShiftId>,
    ) -> Result<ApplyResult, SyncError> {
        let existing = self.shifts.get(&mutation.shift_id)?;

        match mutation.kind {
            MutationKind::StartShift => match existing {
                None => {
                    let Some(site) = mutation.site else {
                        return Ok(ApplyResult::Rejected("start_shift requires a site id".into()));
                    };
                    self.through_ledger(
                        mutation.kind,
                        self.ledger.start_shift_with_id(
                            mutation.shift_id,
                            worker,
                            site,
                            mutation.location,
                        ),
                    )
                }
                // Replay of a create we already have: idempotent no-op.
                Some(shift) if shift.worker == worker && Some(shift.site) == mutation.site => {
                    Ok(ApplyResult::Applied(AppliedMutation {
                        shift_id: shift.id,
                        kind: mutation.kind,
                        updated_at: shift.updated_at,
                    }))
                }
                Some(_) => Ok(ApplyResult::Rejected(
                    "shift id already exists with different ownership".into(),
                )),
            },

            MutationKind::EndShift => match existing {
                None => Ok(ApplyResult::Rejected("cannot end an unknown shift".into())),
                Some(shift) if shift.worker != worker => Ok(ApplyResult::Rejected(
                    "shift does not belong to this worker".into(),
                )),
                // Both sides agree the shift is over: replay no-op.
                Some(shift) if !shift.active => Ok(ApplyResult::Applied(AppliedMutation {
                    shift_id: shift.id,
                    kind: mutation.kind,
                    updated_at: shift.updated_at,
                })),
                Some(shift)
                    if !touched.contains(&shift.id)
                        && is_stale(mutation.base_updated_at, shift.updated_at) =>
                {
                    self.conflicted(worker, mutation, &shift)
                }
                Some(shift) => self.through_ledger(
                    mutation.kind,
                    self.ledger.end_shift(worker, shift.id, mutation.location),
                ),
            },

            MutationKind::UpdateNotes => match existing {
                None => Ok(ApplyResult::Rejected(
                    "cannot update notes on an unknown shift".into(),
                )),
                Some(shift) if shift.worker != worker => Ok(ApplyResult::Rejected(
                    "shift does not belong to this worker".into(),
                )),
                // The requested notes are already in place: replay no-op.
                Some(shift) if shift.notes == mutation.notes => {
                    Ok(ApplyResult::Applied(AppliedMutation {
                        shift_id: shift.id,
                        kind: mutation.kind,
                        updated_at: shift.updated_at,
                    }))
                }
                Some(shift)
                    if !touched.contains(&shift.id)
                        && is_stale(mutation.base_updated_at, shift.updated_at) =>
                {
                    self.conflicted(worker, mutation, &shift)
                }
                Some(shift) => self.through_ledger(
                    mutation.kind,
                    self.ledger.update_notes(worker, shift.id, mutation.notes.clone()),
                ),
            },
        }
    }

    /// Translate a ledger call: success becomes an applied entry,
    /// invariant violations become per-mutation rejections, and
    /// infrastructure failures abort the batch.
    fn through_ledger(
        &self,
        kind: MutationKind,
        result: Result<siteline_ledger::Shift, siteline_ledger::LedgerError>,
    ) -> Result<ApplyResult, SyncError> {
        match result {
            Ok(shift) => Ok(ApplyResult::Applied(AppliedMutation {
                shift_id: shift.id,
                kind,
                updated_at: shift.updated_at,
            })),
            Err(error) if error.is_retryable() => Err(SyncError::Ledger(error)),
            Err(error) => Ok(ApplyResult::Rejected(error.to_string())),
        }
    }

    fn conflicted(
        &self,
        worker: UserId,
        mutation: &DeviceMutation,
        shift: &siteline_ledger::Shift,
    ) -> Result<ApplyResult, SyncError> {
        let local =
            serde_json::to_value(mutation).map_err(|e| SyncError::Payload(e.to_string()))?;
        let remote = serde_json::to_value(shift).map_err(|e| SyncError::Payload(e.to_string()))?;
        Ok(ApplyResult::Conflicted(Conflict::update_conflict(
            shift.id, worker, local, remote,
        )))
    }

    /// Re-apply the stored device payload, skipping the staleness gate.
    fn reapply_local(&self, conflict: &Conflict) -> Result<(), SyncError> {
        let mutation: DeviceMutation = serde_json::from_value(conflict.local.clone())
            .map_err(|e| SyncError::Payload(e.to_string()))?;

        match mutation.kind {
            MutationKind::StartShift => Err(SyncError::Payload(
                "a create cannot be the losing side of a conflict".into(),
            )),
            MutationKind::EndShift => {
                self.ledger
                    .end_shift(conflict.worker, conflict.entity_id, mutation.location)?;
                Ok(())
            }
            MutationKind::UpdateNotes => {
                self.ledger
                    .update_notes(conflict.worker, conflict.entity_id, mutation.notes)?;
                Ok(())
            }
        }
    }

    /// Write an operator-merged row, bypassing the staleness gate once.
    fn apply_merged(&self, conflict: &Conflict, merged: Value) -> Result<(), SyncError> {
        let mut shift: siteline_ledger::Shift =
            serde_json::from_value(merged).map_err(|e| SyncError::Payload(e.to_string()))?;
        if shift.id != conflict.entity_id || shift.worker != conflict.worker {
            return Err(SyncError::Payload(
                "merged payload does not match the conflicted entity".into(),
            ));
        }
        shift.updated_at = Utc::now();
        self.shifts.update(shift)?;
        Ok(())
    }

    /// Rows relevant to the worker at or after `since`; everything when
    /// `since` is `None`. The meta timestamp is taken before the reads
    /// so that rows written mid-read are re-sent on the next sync
    /// rather than skipped.
    fn snapshot(
        &self,
        worker: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<ServerSnapshot, SyncError> {
        let now = Utc::now();

        let shifts = self.shifts.updated_since(&worker, since)?;
        let assignments = self
            .assignments
            .for_worker(&worker)?
            .into_iter()
            .filter(|a| since.map_or(true, |cursor| a.updated_at >= cursor))
            .collect();
        let sites = self
            .sites
            .all_active()?
            .into_iter()
            .filter(|s| since.map_or(true, |cursor| s.updated_at >= cursor))
            .collect();

        Ok(ServerSnapshot {
            shifts,
            assignments,
            sites,
            meta: SnapshotMeta::at(now),
        })
    }
}
