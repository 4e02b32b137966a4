//! Schedule entries as submitted by a shell or produced by the daily merger.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use fleetcal_calendar::DailyEntry;
use serde::{Deserialize, Serialize};

use crate::SchedulerError;

/// A capacity window awaiting submission.
///
/// Timestamps are kept as RFC 3339 strings until submission so that malformed
/// input surfaces as [`SchedulerError::TimeParse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Logical schedule name.
    pub name: String,

    /// Window start, RFC 3339 with offset.
    pub start: String,

    /// Window finish, RFC 3339 with offset.
    pub finish: String,

    /// Servers requested while the window is open.
    pub servers: i64,

    /// Informational window length.
    #[serde(default)]
    pub hours: f64,
}

impl ScheduleEntry {
    /// Decodes a free-form field map.
    pub fn from_fields(
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, SchedulerError> {
        let entry: Self = serde_json::from_value(serde_json::Value::Object(fields))?;
        if entry.name.trim().is_empty() {
            return Err(SchedulerError::Decode("name cannot be empty".to_string()));
        }
        if entry.servers < 0 {
            return Err(SchedulerError::Decode(format!(
                "servers must be non-negative, got {}",
                entry.servers
            )));
        }
        Ok(entry)
    }

    /// Parses `start` and `finish`.
    pub fn window(&self) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), SchedulerError> {
        Ok((
            parse_timestamp("start", &self.start)?,
            parse_timestamp("finish", &self.finish)?,
        ))
    }
}

impl From<&DailyEntry> for ScheduleEntry {
    fn from(entry: &DailyEntry) -> Self {
        Self {
            name: entry.name.clone(),
            start: entry.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            finish: entry.finish.to_rfc3339_opts(SecondsFormat::Secs, false),
            servers: entry.servers,
            hours: entry.hours,
        }
    }
}

fn parse_timestamp(
    field: &'static str,
    value: &str,
) -> Result<DateTime<FixedOffset>, SchedulerError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| SchedulerError::TimeParse {
        field,
        value: value.to_string(),
        source,
    })
}
