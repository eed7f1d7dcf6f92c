use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use siteline_ledger::LedgerError;
use siteline_protocol::ErrorBody;
use siteline_sync::SyncError;

/// Request-level errors, mapped to status codes and a JSON body.
///
/// Invariant violations keep their detail: a geofence rejection tells
/// the client the measured distance and the required radius.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("location is {distance_m} m from the site center; admission radius is {radius_m} m")]
    OutOfRange { distance_m: u32, radius_m: u32 },

    #[error("temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NoAssignment { .. } | LedgerError::NotShiftOwner { .. } => {
                Self::Forbidden(error.to_string())
            }
            LedgerError::AlreadyActive { .. }
            | LedgerError::AlreadyEnded(_)
            | LedgerError::SiteInactive(_) => Self::Conflict(error.to_string()),
            LedgerError::OutOfRange {
                distance_m,
                radius_m,
            } => Self::OutOfRange {
                distance_m,
                radius_m,
            },
            LedgerError::ShiftNotFound(_)
            | LedgerError::SiteNotFound(_)
            | LedgerError::AssignmentNotFound(_) => Self::NotFound(error.to_string()),
            LedgerError::Store(_) => Self::Unavailable(error.to_string()),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Validation(message) => Self::BadRequest(message),
            SyncError::ConflictNotFound(_) => Self::NotFound(error.to_string()),
            SyncError::AlreadyResolved(_) => Self::Conflict(error.to_string()),
            SyncError::MissingMergePayload | SyncError::Payload(_) => {
                Self::BadRequest(error.to_string())
            }
            SyncError::Ledger(inner) => inner.into(),
            SyncError::Store(message) => Self::Unavailable(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::OutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = match &self {
            Self::OutOfRange {
                distance_m,
                radius_m,
            } => Some(serde_json::json!({
                "distance_m": distance_m,
                "radius_m": radius_m,
            })),
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}
