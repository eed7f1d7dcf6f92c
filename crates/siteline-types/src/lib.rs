//! Foundation types for Siteline.
//!
//! This crate provides the identity, geographic, and event types used
//! throughout the Siteline workforce backend. Every other Siteline crate
//! depends on `siteline-types`.
//!
//! # Key Types
//!
//! - [`UserId`], [`SiteId`], [`ShiftId`], [`AssignmentId`], [`ConflictId`] —
//!   UUID v7 (time-ordered) entity identifiers
//! - [`DeviceId`] — client-chosen identifier for a worker's device
//! - [`Role`] — coarse authorization role attached to every request
//! - [`GeoPoint`] — validated WGS84 coordinate pair
//! - [`DomainEvent`] / [`EventKind`] — state-change notifications
//! - [`EventSink`] — the seam through which ledgers publish events

pub mod error;
pub mod event;
pub mod geo;
pub mod ids;
pub mod role;

pub use error::TypeError;
pub use event::{Audience, DomainEvent, EventKind, EventSink, NullSink};
pub use geo::GeoPoint;
pub use ids::{AssignmentId, ConflictId, DeviceId, ShiftId, SiteId, UserId};
pub use role::Role;
