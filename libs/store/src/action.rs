//! Scheduled action records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single capacity change the store will apply at `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Store-wide unique action name.
    #[serde(rename = "name")]
    pub identifier: String,

    /// When the change is applied.
    pub time: DateTime<Utc>,

    /// Minimum group size.
    #[serde(rename = "min_size")]
    pub min_capacity: i64,

    /// Maximum group size.
    #[serde(rename = "max_size")]
    pub max_capacity: i64,

    /// Desired group size.
    pub desired_capacity: i64,
}

impl ScheduledAction {
    /// Creates an action where desired and minimum capacity are equal.
    pub fn pinned(
        identifier: impl Into<String>,
        time: DateTime<Utc>,
        capacity: i64,
        max_capacity: i64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            time,
            min_capacity: capacity,
            max_capacity,
            desired_capacity: capacity,
        }
    }
}
