use thiserror::Error;

/// Integration errors raised by the rotation engine.
///
/// None of these are expected at runtime with a valid configuration; they
/// are surfaced to the caller instead of being replaced by a fallback
/// shift.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShiftError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("malformed shift configuration: {0}")]
    MalformedConfig(String),
}

pub type ShiftResult<T> = Result<T, ShiftError>;
