use siteline_types::{ShiftId, SiteId, UserId};

/// Errors produced by ledger operations.
///
/// The invariant violations (`NoAssignment`, `AlreadyActive`,
/// `OutOfRange`, ...) carry enough detail for the client to explain the
/// rejection to the user; they are never silently coerced into success.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("worker {worker} has no active assignment for site {site}")]
    NoAssignment { worker: UserId, site: SiteId },

    #[error("worker {worker} already has an active shift")]
    AlreadyActive { worker: UserId },

    #[error("location is {distance_m} m from the site center; admission radius is {radius_m} m")]
    OutOfRange { distance_m: u32, radius_m: u32 },

    #[error("shift {0} not found")]
    ShiftNotFound(ShiftId),

    #[error("shift {shift} does not belong to caller {caller}")]
    NotShiftOwner { shift: ShiftId, caller: UserId },

    #[error("shift {0} has already ended")]
    AlreadyEnded(ShiftId),

    #[error("site {0} not found")]
    SiteNotFound(SiteId),

    #[error("site {0} is not active")]
    SiteInactive(SiteId),

    #[error("assignment {0} not found")]
    AssignmentNotFound(siteline_types::AssignmentId),

    #[error("store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Whether retrying the same call may succeed without operator
    /// intervention. Only infrastructure failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
