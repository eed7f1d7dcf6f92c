use siteline_ledger::LedgerError;
use siteline_types::ConflictId;

/// Errors produced by sync operations.
///
/// Stale versions are not errors — they are recorded as conflicts and
/// returned as data. These variants cover genuinely failed calls.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid sync request: {0}")]
    Validation(String),

    #[error("conflict {0} not found")]
    ConflictNotFound(ConflictId),

    #[error("conflict {0} is already resolved")]
    AlreadyResolved(ConflictId),

    #[error("merge resolution requires a merged payload")]
    MissingMergePayload,

    #[error("conflict payload is not decodable: {0}")]
    Payload(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Whether the caller may retry the whole batch. Application is
    /// idempotent per entity id, so transient infrastructure failures
    /// are safe to replay.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(_) => true,
            Self::Ledger(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}
