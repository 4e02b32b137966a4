//! Schedule reconciliation primitives.
//!
//! The remote scheduling store only knows flat, independently named actions.
//! This library recovers the paired view an operator works with:
//!
//! - **Action record**: one stored action (identifier, time, min capacity).
//! - **Schedule**: the START and FINISH actions that share a logical name.
//! - **Ordering**: schedules sorted by start, falling back to finish.
//!
//! # Invariants
//!
//! - Identifiers that do not decode are skipped, never an error
//! - Aggregation is deterministic given the same set of records
//! - A schedule missing one side still sorts and displays

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleetcal_id::{ActionName, Phase};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The fields of a stored action the aggregator reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// Store identifier (encoded action name).
    pub identifier: String,

    /// When the action fires.
    pub time: DateTime<Utc>,

    /// Minimum capacity the action sets.
    pub min_capacity: i64,
}

/// A START/FINISH pair recovered from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Identifiers of the constituent actions, in store enumeration order.
    pub ids: Vec<String>,

    /// Logical schedule name.
    pub name: String,

    /// Capacity while the window is open.
    pub size: i64,

    /// Ramp-up time, if a START action was seen.
    pub start: Option<DateTime<Utc>>,

    /// Ramp-down time, if a FINISH action was seen.
    pub finish: Option<DateTime<Utc>>,

    /// Display offset carried in the identifiers.
    pub tz: String,
}

impl Schedule {
    /// Returns true if both START and FINISH were seen.
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.finish.is_some()
    }
}

/// A schedule while its actions are still being collected.
#[derive(Debug)]
struct PartialSchedule {
    ids: Vec<String>,
    tz: String,
    size: Option<i64>,
    start: Option<DateTime<Utc>>,
    finish: Option<DateTime<Utc>>,
}

/// Groups action records by logical name and returns ordered schedules.
///
/// `default_size` is used for schedules that have no START action.
pub fn aggregate_schedules<I>(records: I, default_size: i64) -> Vec<Schedule>
where
    I: IntoIterator<Item = ActionRecord>,
{
    let mut groups: BTreeMap<String, PartialSchedule> = BTreeMap::new();

    for record in records {
        let Some(action) = ActionName::decode(&record.identifier) else {
            debug!(identifier = %record.identifier, "Skipping unrecognized scheduled action");
            continue;
        };

        let group = groups
            .entry(action.name)
            .or_insert_with(|| PartialSchedule {
                ids: Vec::new(),
                tz: action.tz_offset,
                size: None,
                start: None,
                finish: None,
            });

        group.ids.push(record.identifier);
        match action.phase {
            Phase::Start => {
                group.start = Some(record.time);
                group.size = Some(record.min_capacity);
            }
            Phase::Finish => group.finish = Some(record.time),
        }
    }

    let mut schedules: Vec<Schedule> = groups
        .into_iter()
        .map(|(name, group)| Schedule {
            ids: group.ids,
            name,
            size: group.size.unwrap_or(default_size),
            start: group.start,
            finish: group.finish,
            tz: group.tz,
        })
        .collect();

    order_schedules(&mut schedules);
    schedules
}

/// Compares two schedules by start, or by finish when either start is missing.
///
/// This is not a total order when start presence is mixed; see
/// [`order_schedules`]. A missing finish sorts after any present one.
pub fn schedule_order(a: &Schedule, b: &Schedule) -> Ordering {
    match (a.start, b.start) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => match (a.finish, b.finish) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Stable insertion sort by [`schedule_order`].
///
/// `slice::sort_by` may panic when the comparator is not a total order, which
/// `schedule_order` is not for adversarial mixes of present and missing starts.
/// Inputs are bounded by one listing of the store.
pub fn order_schedules(schedules: &mut [Schedule]) {
    for i in 1..schedules.len() {
        let mut j = i;
        while j > 0 && schedule_order(&schedules[j], &schedules[j - 1]) == Ordering::Less {
            schedules.swap(j, j - 1);
            j -= 1;
        }
    }
}
