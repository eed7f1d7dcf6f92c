use std::fmt;
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use siteline_types::{Audience, DomainEvent, EventSink, Role, UserId};

use crate::error::FanoutError;

/// Identifier for one live connection. A user may hold several (phone
/// and tablet at once); each gets its own id and channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", &self.0.to_string()[..8])
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The receiving half handed to the connection task; events pushed to
/// this connection arrive here.
pub type EventStream = mpsc::Receiver<DomainEvent>;

/// One registered connection: routing key plus the sending half of its
/// bounded channel.
struct Connection {
    id: ConnectionId,
    user: UserId,
    role: Role,
    sender: mpsc::Sender<DomainEvent>,
}

/// Configuration for the [`RealtimeFanout`].
#[derive(Clone, Debug)]
pub struct FanoutConfig {
    /// Capacity of each per-connection event channel.
    pub channel_capacity: usize,
    /// Hard cap on simultaneously registered connections.
    pub max_connections: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            max_connections: 1024,
        }
    }
}

#[derive(Default)]
struct Registry {
    connections: Vec<Connection>,
    shut_down: bool,
}

/// Registry of live client connections with per-user and role routing.
///
/// Mutated only on connect/disconnect, read on every notify; the
/// internal lock makes it safe to call from any number of connection
/// tasks concurrently. Delivery uses `try_send`: a closed channel gets
/// the connection pruned, a full one has that event dropped for that
/// connection only.
pub struct RealtimeFanout {
    inner: RwLock<Registry>,
    config: FanoutConfig,
}

impl RealtimeFanout {
    pub fn new(config: FanoutConfig) -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
            config,
        }
    }

    /// Register a live connection. Returns the connection id (needed to
    /// unregister) and the stream of events routed to it.
    pub fn register(
        &self,
        user: UserId,
        role: Role,
    ) -> Result<(ConnectionId, EventStream), FanoutError> {
        let mut registry = self.inner.write().expect("fanout lock poisoned");
        if registry.shut_down {
            return Err(FanoutError::ShutDown);
        }
        if registry.connections.len() >= self.config.max_connections {
            return Err(FanoutError::AtCapacity(self.config.max_connections));
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let id = ConnectionId::new();
        registry.connections.push(Connection {
            id,
            user,
            role,
            sender: tx,
        });

        debug!(connection = %id, %user, %role, total = registry.connections.len(), "connection registered");
        Ok((id, rx))
    }

    /// Remove a connection. Idempotent; unknown ids are ignored.
    pub fn unregister(&self, id: &ConnectionId) {
        let mut registry = self.inner.write().expect("fanout lock poisoned");
        let before = registry.connections.len();
        registry.connections.retain(|conn| conn.id != *id);
        if registry.connections.len() < before {
            debug!(connection = %id, total = registry.connections.len(), "connection unregistered");
        }
    }

    /// Push an event to every connection of one user. Returns the
    /// number of connections it was handed to.
    pub fn notify_user(&self, user: &UserId, event: &DomainEvent) -> usize {
        self.route(event, |conn| conn.user == *user)
    }

    /// Push an event to every connection with the given role.
    pub fn notify_role(&self, role: Role, event: &DomainEvent) -> usize {
        self.route(event, |conn| conn.role == role)
    }

    /// Push an event to every live connection.
    pub fn broadcast(&self, event: &DomainEvent) -> usize {
        self.route(event, |_| true)
    }

    /// Close every connection and refuse new registrations. Dropping
    /// the senders ends each connection task's event stream.
    pub fn shutdown(&self) {
        let mut registry = self.inner.write().expect("fanout lock poisoned");
        registry.shut_down = true;
        let dropped = registry.connections.len();
        registry.connections.clear();
        info!(connections = dropped, "fanout shut down");
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.inner
            .read()
            .expect("fanout lock poisoned")
            .connections
            .len()
    }

    fn route(&self, event: &DomainEvent, matches: impl Fn(&Connection) -> bool) -> usize {
        let mut registry = self.inner.write().expect("fanout lock poisoned");
        let mut delivered = 0;

        registry.connections.retain(|conn| {
            if !matches(conn) {
                return true;
            }
            match conn.sender.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                // Slow consumer: drop this event for this connection
                // only; the connection stays registered.
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!(connection = %conn.id, "channel full, event dropped");
                    true
                }
                // Receiver gone: the connection is dead, prune it.
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(connection = %conn.id, "stale connection pruned");
                    false
                }
            }
        });

        trace!(kind = %event.kind, delivered, "event routed");
        delivered
    }
}

impl Default for RealtimeFanout {
    fn default() -> Self {
        Self::new(FanoutConfig::default())
    }
}

impl EventSink for RealtimeFanout {
    fn deliver(&self, audience: Audience, event: &DomainEvent) {
        match audience {
            Audience::User(user) => self.notify_user(&user, event),
            Audience::Supervisors => self.notify_role(Role::Supervisor, event),
            Audience::All => self.broadcast(event),
        };
    }
}

#[cfg(test)]
mod tests {
    use siteline_types::EventKind;

    use super::*;

    fn event(kind: EventKind, worker: UserId) -> DomainEvent {
        DomainEvent::new(kind, *worker.as_uuid(), worker)
    }

    #[test]
    fn notify_user_reaches_only_that_user() {
        let fanout = RealtimeFanout::default();
        let alice = UserId::new();
        let bob = UserId::new();
        let (_, mut alice_rx) = fanout.register(alice, Role::Worker).unwrap();
        let (_, mut bob_rx) = fanout.register(bob, Role::Worker).unwrap();

        let delivered = fanout.notify_user(&alice, &event(EventKind::ShiftStarted, alice));
        assert_eq!(delivered, 1);
        assert_eq!(alice_rx.try_recv().unwrap().kind, EventKind::ShiftStarted);
        assert!(bob_rx.try_recv().is_err());
    }

    #[test]
    fn every_device_of_a_user_is_notified() {
        let fanout = RealtimeFanout::default();
        let worker = UserId::new();
        let (_, mut phone) = fanout.register(worker, Role::Worker).unwrap();
        let (_, mut tablet) = fanout.register(worker, Role::Worker).unwrap();

        fanout.notify_user(&worker, &event(EventKind::ShiftEnded, worker));
        assert!(phone.try_recv().is_ok());
        assert!(tablet.try_recv().is_ok());
    }

    #[test]
    fn role_routing_reaches_supervisors_only() {
        let fanout = RealtimeFanout::default();
        let worker = UserId::new();
        let supervisor = UserId::new();
        let (_, mut worker_rx) = fanout.register(worker, Role::Worker).unwrap();
        let (_, mut supervisor_rx) = fanout.register(supervisor, Role::Supervisor).unwrap();

        let delivered = fanout.notify_role(Role::Supervisor, &event(EventKind::ShiftStarted, worker));
        assert_eq!(delivered, 1);
        assert!(supervisor_rx.try_recv().is_ok());
        assert!(worker_rx.try_recv().is_err());
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let fanout = RealtimeFanout::default();
        let a = UserId::new();
        let b = UserId::new();
        let (_, mut rx_a) = fanout.register(a, Role::Worker).unwrap();
        let (_, mut rx_b) = fanout.register(b, Role::Supervisor).unwrap();

        let delivered = fanout.broadcast(&event(EventKind::ForceSyncRequired, a));
        assert_eq!(delivered, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn unregister_stops_delivery() {
        let fanout = RealtimeFanout::default();
        let worker = UserId::new();
        let (id, mut rx) = fanout.register(worker, Role::Worker).unwrap();

        fanout.unregister(&id);
        assert_eq!(fanout.connection_count(), 0);
        assert_eq!(fanout.notify_user(&worker, &event(EventKind::ShiftStarted, worker)), 0);
        // The stream ends once the sender is gone.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_pruned_on_next_route() {
        let fanout = RealtimeFanout::default();
        let worker = UserId::new();
        let (_, rx) = fanout.register(worker, Role::Worker).unwrap();
        drop(rx);

        assert_eq!(fanout.connection_count(), 1);
        let delivered = fanout.notify_user(&worker, &event(EventKind::ShiftStarted, worker));
        assert_eq!(delivered, 0);
        assert_eq!(fanout.connection_count(), 0);
    }

    #[test]
    fn full_channel_drops_event_but_keeps_connection_and_others_deliver() {
        let fanout = RealtimeFanout::new(FanoutConfig {
            channel_capacity: 1,
            max_connections: 16,
        });
        let worker = UserId::new();
        let (_, mut slow) = fanout.register(worker, Role::Worker).unwrap();
        let (_, mut healthy) = fanout.register(worker, Role::Worker).unwrap();

        // Fill the slow connection's channel.
        assert_eq!(fanout.notify_user(&worker, &event(EventKind::ShiftStarted, worker)), 2);
        // The second event overflows `slow` but still reaches `healthy`.
        assert_eq!(fanout.notify_user(&worker, &event(EventKind::ShiftEnded, worker)), 1);

        assert_eq!(fanout.connection_count(), 2);
        assert_eq!(slow.try_recv().unwrap().kind, EventKind::ShiftStarted);
        assert!(slow.try_recv().is_err());
        assert_eq!(healthy.try_recv().unwrap().kind, EventKind::ShiftStarted);
        assert_eq!(healthy.try_recv().unwrap().kind, EventKind::ShiftEnded);
    }

    #[test]
    fn shutdown_closes_streams_and_refuses_registration() {
        let fanout = RealtimeFanout::default();
        let worker = UserId::new();
        let (_, mut rx) = fanout.register(worker, Role::Worker).unwrap();

        fanout.shutdown();
        assert_eq!(fanout.connection_count(), 0);
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
        assert_eq!(
            fanout.register(worker, Role::Worker).unwrap_err(),
            FanoutError::ShutDown
        );
    }

    #[test]
    fn capacity_limit_is_enforced() {
        let fanout = RealtimeFanout::new(FanoutConfig {
            channel_capacity: 4,
            max_connections: 1,
        });
        fanout.register(UserId::new(), Role::Worker).unwrap();
        assert_eq!(
            fanout.register(UserId::new(), Role::Worker).unwrap_err(),
            FanoutError::AtCapacity(1)
        );
    }

    #[test]
    fn event_sink_routes_by_audience() {
        let fanout = RealtimeFanout::default();
        let worker = UserId::new();
        let supervisor = UserId::new();
        let (_, mut worker_rx) = fanout.register(worker, Role::Worker).unwrap();
        let (_, mut supervisor_rx) = fanout.register(supervisor, Role::Supervisor).unwrap();

        let ev = event(EventKind::ShiftStarted, worker);
        fanout.deliver(Audience::User(worker), &ev);
        fanout.deliver(Audience::Supervisors, &ev);

        assert!(worker_rx.try_recv().is_ok());
        assert!(worker_rx.try_recv().is_err());
        assert!(supervisor_rx.try_recv().is_ok());
    }
}
