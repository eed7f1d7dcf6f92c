use thiserror::Error;

/// Errors produced by type-level validation.
///
/// These are rejected immediately at the boundary and never retried.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid coordinate: {field} = {value}")]
    InvalidCoordinate { field: &'static str, value: f64 },

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
