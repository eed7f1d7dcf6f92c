use thiserror::Error;

/// Errors produced by connection registration.
///
/// Delivery itself never errors — undeliverable events are dropped by
/// design.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FanoutError {
    #[error("fanout is shut down")]
    ShutDown,

    #[error("connection limit reached ({0})")]
    AtCapacity(usize),
}
