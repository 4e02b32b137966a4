//! Error types for calendar reading.

use thiserror::Error;

/// Errors that can occur when reading calendar events.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The underlying reader failed.
    #[error("failed to read calendar: {0}")]
    Io(#[from] std::io::Error),

    /// A date or date-time property could not be parsed.
    #[error("invalid {property} value '{value}'")]
    InvalidDateTime { property: String, value: String },

    /// A local time does not exist in the configured time zone.
    #[error("{property} value '{value}' does not exist in the local time zone")]
    NonexistentLocalTime { property: String, value: String },

    /// A DURATION property could not be parsed.
    #[error("invalid DURATION value '{0}'")]
    InvalidDuration(String),

    /// The import window cannot be represented.
    #[error("import window out of range")]
    WindowOutOfRange,
}
