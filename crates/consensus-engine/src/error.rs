//! Error types for consensus-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::EventId;

/// Failures reported by an [`AvailabilityStore`](crate::store::AvailabilityStore)
/// or [`EventStore`](crate::store::EventStore) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not serve the request (I/O, lock poisoning, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store has no record for the referenced event.
    #[error("event {0} not found in store")]
    EventNotFound(EventId),
}

/// Convenience alias for store trait methods.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Window start is not strictly before its end.
    #[error("Invalid window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Unknown event: {0}")]
    UnknownEvent(EventId),

    /// The confirm target does not match any freshly computed candidate.
    #[error("No candidate slot {start}..{end} for event {event_id}")]
    SlotNotFound {
        event_id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A collaborator store failed. Never retried by the engine.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(StoreError),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl From<StoreError> for SchedulerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::EventNotFound(event_id) => Self::UnknownEvent(event_id),
            other => Self::StoreUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
