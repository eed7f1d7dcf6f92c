//! Wire contracts for Siteline.
//!
//! The JSON bodies the HTTP surface accepts and returns, and the frame
//! shape pushed over the realtime channel. Kept separate from the
//! server so that clients and tests can share the exact types.

pub mod message;

pub use message::{
    EndShiftRequest, ErrorBody, GrantAssignmentRequest, HealthResponse, InfoResponse,
    RealtimeFrame, ResolveConflictRequest, StartShiftRequest, SyncRequest, SyncResponse,
    PROTOCOL_VERSION,
};
