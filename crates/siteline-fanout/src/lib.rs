//! Realtime fanout for Siteline.
//!
//! Keeps the registry of live client connections and pushes domain
//! events to them: to one user's devices, to every connected
//! supervisor, or to everyone. Delivery is best-effort and
//! fire-and-forget — there is no queued inbox, because the
//! authoritative state is always recoverable through the next sync
//! call. A dead or saturated connection never blocks delivery to the
//! others.
//!
//! The registry is an owned, injectable component with an explicit
//! [`RealtimeFanout::shutdown`]; nothing here is process-global.

pub mod error;
pub mod fanout;

pub use error::FanoutError;
pub use fanout::{ConnectionId, EventStream, FanoutConfig, RealtimeFanout};
