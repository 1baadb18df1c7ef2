use ulid::Ulid;

use crate::model::{BookingConflict, BookingStatus};
use crate::store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    /// Request failed an input rule. Nothing was written.
    Validation(String),
    /// The requested time overlaps active bookings.
    Conflict(Vec<BookingConflict>),
    NotFound {
        kind: &'static str,
        id: Ulid,
    },
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    LimitExceeded(&'static str),
    /// Storage failure, propagated unchanged.
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::Conflict(conflicts) => {
                write!(f, "time slot conflicts with {} existing booking(s)", conflicts.len())?;
                for c in conflicts {
                    write!(f, "; {}", c.message)?;
                }
                Ok(())
            }
            EngineError::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            EngineError::InvalidTransition { from, to } => {
                write!(f, "cannot change booking status from {from} to {to}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(_) => write!(f, "storage failure"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
