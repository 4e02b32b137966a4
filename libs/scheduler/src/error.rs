//! Scheduler error taxonomy.

use fleetcal_calendar::CalendarError;
use fleetcal_store::{ErrorCode, StoreError};
use thiserror::Error;

/// Errors surfaced by scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Input fields could not be decoded into a schedule entry.
    #[error("invalid schedule fields: {0}")]
    Decode(String),

    /// A timestamp string could not be parsed.
    #[error("invalid {field} timestamp '{value}': {source}")]
    TimeParse {
        field: &'static str,
        value: String,
        source: chrono::ParseError,
    },

    /// An action with the same identifier already exists.
    #[error("schedule already exists: {0}")]
    RemoteConflict(#[source] StoreError),

    /// The store's scheduled action quota is exhausted.
    #[error("schedule limit exceeded: {0}")]
    RemoteCapacity(#[source] StoreError),

    /// The store was busy with another change.
    #[error("store busy: {0}")]
    RemoteContention(#[source] StoreError),

    /// Any other store failure.
    #[error("store error: {0}")]
    RemoteUnknown(#[source] StoreError),

    /// The calendar could not be read.
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl SchedulerError {
    /// Returns true if repeating the same call is safe and may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::RemoteContention(_))
    }

    /// Returns true if the failure came from the remote store.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SchedulerError::RemoteConflict(_)
                | SchedulerError::RemoteCapacity(_)
                | SchedulerError::RemoteContention(_)
                | SchedulerError::RemoteUnknown(_)
        )
    }
}

impl From<StoreError> for SchedulerError {
    fn from(err: StoreError) -> Self {
        match err.code() {
            ErrorCode::AlreadyExists => SchedulerError::RemoteConflict(err),
            ErrorCode::LimitExceeded => SchedulerError::RemoteCapacity(err),
            ErrorCode::ResourceContention => SchedulerError::RemoteContention(err),
            ErrorCode::InvalidPageToken | ErrorCode::Unknown => SchedulerError::RemoteUnknown(err),
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Decode(err.to_string())
    }
}
