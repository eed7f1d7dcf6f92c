use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Classification of domain events pushed over the realtime channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A worker has started a shift.
    ShiftStarted,
    /// A worker has ended a shift.
    ShiftEnded,
    /// A worker has been assigned to a site.
    NewAssignment,
    /// Server state changed outside the device's view; it should sync now.
    ForceSyncRequired,
}

impl EventKind {
    /// Wire name, as delivered to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShiftStarted => "shift_started",
            Self::ShiftEnded => "shift_ended",
            Self::NewAssignment => "new_assignment",
            Self::ForceSyncRequired => "force_sync_required",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single state-change notification.
///
/// Events carry only the affected entity id and a timestamp — they are a
/// hint to refresh, not a data channel. The authoritative state is always
/// recoverable through the next sync call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Classification of this event.
    pub kind: EventKind,
    /// The entity (shift, assignment, ...) the event refers to.
    pub entity_id: uuid::Uuid,
    /// The worker the event concerns.
    pub worker: UserId,
    /// When the transition happened on the server.
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(kind: EventKind, entity_id: uuid::Uuid, worker: UserId) -> Self {
        Self {
            kind,
            entity_id,
            worker,
            timestamp: Utc::now(),
        }
    }
}

/// Who a notification is addressed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Audience {
    /// A specific user's live connections.
    User(UserId),
    /// All connected supervisors.
    Supervisors,
    /// Every live connection.
    All,
}

/// The seam through which ledgers and the sync coordinator publish
/// events without depending on the realtime layer.
///
/// Delivery is best-effort and fire-and-forget: implementations must not
/// block and must not fail the emitting operation. The fanout registry
/// implements this; tests use [`NullSink`].
pub trait EventSink: Send + Sync {
    fn deliver(&self, audience: Audience, event: &DomainEvent);
}

/// An [`EventSink`] that drops everything. For tests and embedding
/// without a realtime layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn deliver(&self, _audience: Audience, _event: &DomainEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_names() {
        assert_eq!(EventKind::ShiftStarted.as_str(), "shift_started");
        assert_eq!(EventKind::ForceSyncRequired.as_str(), "force_sync_required");
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&EventKind::ShiftEnded).unwrap();
        assert_eq!(json, "\"shift_ended\"");
    }

    #[test]
    fn event_carries_timestamp() {
        let worker = UserId::new();
        let shift = uuid::Uuid::now_v7();
        let event = DomainEvent::new(EventKind::ShiftStarted, shift, worker);
        assert_eq!(event.worker, worker);
        assert_eq!(event.entity_id, shift);
        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn null_sink_is_inert() {
        let sink = NullSink;
        let event = DomainEvent::new(EventKind::NewAssignment, uuid::Uuid::now_v7(), UserId::new());
        sink.deliver(Audience::All, &event);
        sink.deliver(Audience::Supervisors, &event);
    }
}
