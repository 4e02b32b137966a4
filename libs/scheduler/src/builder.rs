//! Building the START/FINISH action pair for one entry.

use chrono::{TimeDelta, Utc};
use fleetcal_id::{encode, ActionName, Phase};
use fleetcal_store::ScheduledAction;
use rand::Rng;

use crate::{ScheduleEntry, SchedulerConfig, SchedulerError};

/// The two actions that realize one capacity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPair {
    /// Ramp-up to the entry's server count.
    pub start: ScheduledAction,

    /// Ramp-down to the configured finish size.
    pub finish: ScheduledAction,
}

/// Draws a uniform offset in `[-bound_secs, bound_secs)` seconds.
pub fn jitter_offset<R: Rng + ?Sized>(rng: &mut R, bound_secs: i64) -> TimeDelta {
    if bound_secs <= 0 {
        return TimeDelta::zero();
    }
    TimeDelta::seconds(rng.random_range(-bound_secs..bound_secs))
}

/// Parses `entry` and builds its jittered action pair.
///
/// The offset of the raw start timestamp (`±HHMM`) is carried in both
/// identifiers for display; action times are converted to UTC.
pub fn build_actions<R: Rng + ?Sized>(
    entry: &ScheduleEntry,
    config: &SchedulerConfig,
    rng: &mut R,
) -> Result<ActionPair, SchedulerError> {
    let (start, finish) = entry.window()?;
    if finish <= start {
        return Err(SchedulerError::Decode(format!(
            "finish {} is not after start {}",
            entry.finish, entry.start
        )));
    }

    let tz = start.format("%z").to_string();
    let name = ActionName::sanitize_name(&entry.name);

    let start_at = (start + jitter_offset(rng, config.jitter_secs)).with_timezone(&Utc);
    let finish_at = (finish + jitter_offset(rng, config.jitter_secs)).with_timezone(&Utc);

    Ok(ActionPair {
        start: ScheduledAction::pinned(
            encode(&name, Phase::Start, &tz),
            start_at,
            entry.servers,
            config.max_capacity,
        ),
        finish: ScheduledAction::pinned(
            encode(&name, Phase::Finish, &tz),
            finish_at,
            config.finish_size,
            config.max_capacity,
        ),
    })
}
