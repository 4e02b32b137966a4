//! Scheduler settings.

use fleetcal_calendar::MergeConfig;
use fleetcal_store::DEFAULT_MAX_RECORDS;

/// Server count applied when a window closes.
pub const DEFAULT_FINISH_SIZE: i64 = 2;

/// Maximum group size written on every action.
pub const DEFAULT_MAX_CAPACITY: i64 = 20;

/// Jitter bound applied to each action time, in seconds.
pub const DEFAULT_JITTER_SECS: i64 = 300;

/// Settings shared by every scheduler operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Capacity set by FINISH actions, and reported for schedules without a START.
    pub finish_size: i64,

    /// Max capacity written on both actions.
    pub max_capacity: i64,

    /// How many actions to read when listing the store.
    pub max_records: usize,

    /// Jitter bound in seconds; offsets are drawn from `[-jitter_secs, jitter_secs)`.
    pub jitter_secs: i64,

    /// Calendar merge settings.
    pub merge: MergeConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            finish_size: DEFAULT_FINISH_SIZE,
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_records: DEFAULT_MAX_RECORDS,
            jitter_secs: DEFAULT_JITTER_SECS,
            merge: MergeConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Default settings with a different finish size.
    pub fn with_finish_size(finish_size: i64) -> Self {
        Self {
            finish_size,
            ..Self::default()
        }
    }
}
