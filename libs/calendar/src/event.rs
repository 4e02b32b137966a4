//! Calendar events and the source abstraction.

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::CalendarError;

/// A single event read from a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Event title.
    pub summary: String,

    /// Event start.
    pub start: DateTime<FixedOffset>,

    /// Event end (exclusive).
    pub end: DateTime<FixedOffset>,
}

impl CalendarEvent {
    /// Creates an event.
    pub fn new(
        summary: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            summary: summary.into(),
            start,
            end,
        }
    }

    /// Length of the event.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Returns true if the event overlaps `[window_start, window_end]`.
    pub fn overlaps(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        self.end >= window_start && self.start <= window_end
    }
}

/// A producer of calendar events.
///
/// Sources are consumed by reading; parsing a file twice requires a new source.
pub trait CalendarSource {
    /// Returns every event overlapping `[window_start, window_end]`.
    fn events(
        self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

impl CalendarSource for Vec<CalendarEvent> {
    fn events(
        self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self
            .into_iter()
            .filter(|e| e.overlaps(window_start, window_end))
            .collect())
    }
}

/// The window a calendar import covers: from `now` to the last instant of the
/// current UTC calendar month.
pub fn import_window(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
    let first_of_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .ok_or(CalendarError::WindowOutOfRange)?;
    let next_month = first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(CalendarError::WindowOutOfRange)?
        .and_utc();

    Ok((now, next_month - TimeDelta::nanoseconds(1)))
}
