//! Folding calendar events into daily capacity windows.

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::CalendarEvent;

/// Default number of servers requested for a day's window.
pub const DEFAULT_SERVERS: i64 = 4;

/// Default padding applied before and after every event.
pub const DEFAULT_PADDING: TimeDelta = TimeDelta::minutes(45);

/// Events this long or longer are all-day markers, not capacity windows.
pub const DEFAULT_MAX_EVENT_DURATION: TimeDelta = TimeDelta::hours(23);

/// Merge settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Servers requested for every merged day.
    pub servers: i64,

    /// Padding subtracted from each start and added to each end.
    pub padding: TimeDelta,

    /// Events at or above this length are dropped.
    pub max_event_duration: TimeDelta,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            servers: DEFAULT_SERVERS,
            padding: DEFAULT_PADDING,
            max_event_duration: DEFAULT_MAX_EVENT_DURATION,
        }
    }
}

/// One day's aggregate capacity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    /// Constituent summaries followed by the local `MM-DD` of `start`.
    pub name: String,

    /// Earliest padded start, in local time.
    pub start: DateTime<FixedOffset>,

    /// Latest padded finish, in local time.
    pub finish: DateTime<FixedOffset>,

    /// Servers requested while the window is open.
    pub servers: i64,

    /// `finish - start` in fractional hours.
    pub hours: f64,
}

/// A padded event window waiting to be merged.
#[derive(Debug, Clone)]
struct PaddedWindow {
    summary: String,
    start: DateTime<FixedOffset>,
    finish: DateTime<FixedOffset>,
}

/// Folds a sequence of events into one [`DailyEntry`] per local calendar day.
#[derive(Debug, Clone)]
pub struct DailyMerger<Tz: TimeZone> {
    tz: Tz,
    config: MergeConfig,
}

impl<Tz: TimeZone> DailyMerger<Tz> {
    /// Creates a merger that buckets days in `tz`.
    pub fn new(tz: Tz, config: MergeConfig) -> Self {
        Self { tz, config }
    }

    /// Merge settings in use.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Sorts, filters, pads and merges `events`.
    ///
    /// Consecutive events whose padded starts fall on the same local date share
    /// a bucket; each bucket becomes one entry.
    pub fn merge_events(&self, mut events: Vec<CalendarEvent>) -> Vec<DailyEntry> {
        events.sort_by_key(|e| e.start);

        let mut result = Vec::new();
        let mut bucket: Vec<PaddedWindow> = Vec::new();

        for event in events {
            let Some(window) = self.pad(event) else {
                continue;
            };

            if let Some(first) = bucket.first() {
                if first.start.date_naive() != window.start.date_naive() {
                    result.push(self.merge(&bucket));
                    bucket.clear();
                }
            }
            bucket.push(window);
        }

        if !bucket.is_empty() {
            result.push(self.merge(&bucket));
        }

        result
    }

    /// Converts an event into its padded local window, or `None` if it is
    /// not a capacity window.
    fn pad(&self, event: CalendarEvent) -> Option<PaddedWindow> {
        let duration = event.duration();
        if duration >= self.config.max_event_duration {
            debug!(
                summary = %event.summary,
                hours = duration.num_minutes() as f64 / 60.0,
                "Dropping all-day event"
            );
            return None;
        }
        if duration < TimeDelta::zero() {
            debug!(summary = %event.summary, "Dropping event that ends before it starts");
            return None;
        }

        Some(PaddedWindow {
            start: self.localize(event.start - self.config.padding),
            finish: self.localize(event.end + self.config.padding),
            summary: event.summary,
        })
    }

    fn localize(&self, at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.tz).fixed_offset()
    }

    /// Combines a non-empty bucket into a single entry.
    fn merge(&self, bucket: &[PaddedWindow]) -> DailyEntry {
        let mut start = bucket[0].start;
        let mut finish = bucket[0].finish;
        let mut summaries = Vec::with_capacity(bucket.len());

        for window in bucket {
            start = start.min(window.start);
            finish = finish.max(window.finish);
            summaries.push(window.summary.as_str());
        }

        let name = format!("{} {}", summaries.join(" "), start.format("%m-%d"));
        let hours = (finish - start).num_milliseconds() as f64 / 3_600_000.0;

        DailyEntry {
            name,
            start,
            finish,
            servers: self.config.servers,
            hours,
        }
    }
}
