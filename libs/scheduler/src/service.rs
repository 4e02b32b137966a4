//! Entry-point operations over a [`ScheduleStore`].

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use fleetcal_calendar::{import_window, CalendarSource, DailyEntry, DailyMerger};
use fleetcal_reconcile::{aggregate_schedules, ActionRecord, Schedule};
use fleetcal_store::{ScheduleStore, ScheduledAction, StoreError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{build_actions, ScheduleEntry, SchedulerConfig, SchedulerError};

/// Outcome of a successful calendar import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Identifiers removed from the store.
    pub deleted: usize,

    /// Daily entries submitted.
    pub created: usize,
}

/// Capacity scheduler bound to one store.
///
/// Every store call is awaited before the next one is issued. Loops stop at
/// the first failure; items already processed are not rolled back.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn ScheduleStore>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ScheduleStore>, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Decodes `fields` into an entry and submits it.
    pub async fn add_schedule(
        &self,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), SchedulerError> {
        let entry = ScheduleEntry::from_fields(fields)?;
        self.submit_entry(&entry).await
    }

    /// Decodes a list of identifiers and deletes them in order.
    pub async fn delete_schedule(&self, raw: Vec<serde_json::Value>) -> Result<(), SchedulerError> {
        let identifiers: Vec<String> = serde_json::from_value(serde_json::Value::Array(raw))?;
        self.delete_schedules(&identifiers).await
    }

    /// Deletes `identifiers` one at a time, stopping at the first failure.
    pub async fn delete_schedules(&self, identifiers: &[String]) -> Result<(), SchedulerError> {
        for identifier in identifiers {
            if let Err(err) = self.store.delete(identifier).await {
                log_store_failure("delete", identifier, &err);
                return Err(err.into());
            }
            debug!(identifier = %identifier, "Deleted scheduled action");
        }
        Ok(())
    }

    /// Lists the store and folds its actions into ordered schedules.
    pub async fn get_schedules(&self) -> Result<Vec<Schedule>, SchedulerError> {
        let actions = self.store.list(self.config.max_records).await.map_err(|err| {
            warn!(code = %err.code(), error = %err, "Failed to list scheduled actions");
            SchedulerError::from(err)
        })?;

        let listed = actions.len();
        let schedules = aggregate_schedules(
            actions.into_iter().map(action_record),
            self.config.finish_size,
        );
        debug!(actions = listed, schedules = schedules.len(), "Aggregated schedules");

        Ok(schedules)
    }

    /// Creates the START action of `entry`, then its FINISH action.
    ///
    /// FINISH is not attempted if START fails.
    pub async fn submit_entry(&self, entry: &ScheduleEntry) -> Result<(), SchedulerError> {
        let pair = build_actions(entry, &self.config, &mut rand::rng())?;

        info!(
            name = %entry.name,
            start = %entry.start,
            finish = %entry.finish,
            servers = entry.servers,
            hours = entry.hours,
            "Submitting schedule"
        );

        self.create(&pair.start).await?;
        self.create(&pair.finish).await
    }

    /// Reads `source` for the import window starting at `now` and merges its
    /// events into daily entries bucketed in `tz`.
    pub fn plan_import<C, Tz>(
        &self,
        source: C,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyEntry>, SchedulerError>
    where
        C: CalendarSource,
        Tz: TimeZone,
    {
        let (window_start, window_end) = import_window(now)?;
        let events = source.events(window_start, window_end)?;
        debug!(
            events = events.len(),
            window_start = %window_start,
            window_end = %window_end,
            "Read calendar"
        );

        Ok(DailyMerger::new(tz, self.config.merge.clone()).merge_events(events))
    }

    /// Replaces every schedule in the store with the calendar's daily windows.
    ///
    /// Existing schedules are deleted before the calendar is read, so a source
    /// that fails leaves the store empty.
    pub async fn import_calendar<C, Tz>(
        &self,
        source: C,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<ImportSummary, SchedulerError>
    where
        C: CalendarSource,
        Tz: TimeZone,
    {
        let existing: Vec<String> = self
            .get_schedules()
            .await?
            .into_iter()
            .flat_map(|s| s.ids)
            .collect();

        info!(count = existing.len(), "Deleting existing scheduled actions");
        self.delete_schedules(&existing).await?;

        let entries = self.plan_import(source, tz, now)?;
        info!(count = entries.len(), "Importing daily schedules");

        for daily in &entries {
            self.submit_entry(&ScheduleEntry::from(daily)).await?;
        }

        Ok(ImportSummary {
            deleted: existing.len(),
            created: entries.len(),
        })
    }

    async fn create(&self, action: &ScheduledAction) -> Result<(), SchedulerError> {
        self.store.create(action).await.map_err(|err| {
            log_store_failure("create", &action.identifier, &err);
            SchedulerError::from(err)
        })
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn log_store_failure(operation: &'static str, identifier: &str, err: &StoreError) {
    warn!(
        operation,
        identifier = %identifier,
        code = %err.code(),
        error = %err,
        "Scheduled action request failed"
    );
}

fn action_record(action: ScheduledAction) -> ActionRecord {
    ActionRecord {
        identifier: action.identifier,
        time: action.time,
        min_capacity: action.min_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeDelta};
    use fleetcal_calendar::CalendarEvent;
    use fleetcal_store::ErrorCode;
    use fleetcal_testing::{MemoryStore, StoreCall, StoreOp};
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn action(identifier: &str, secs: i64, capacity: i64) -> ScheduledAction {
        ScheduledAction::pinned(identifier, at(secs), capacity, 20)
    }

    fn scheduler(store: &Arc<MemoryStore>) -> Scheduler {
        let config = SchedulerConfig {
            jitter_secs: 0,
            ..SchedulerConfig::default()
        };
        Scheduler::new(store.clone(), config)
    }

    fn entry_fields() -> serde_json::Map<String, serde_json::Value> {
        match json!({
            "name": "Launch",
            "start": "2021-04-05T08:00:00+00:00",
            "finish": "2021-04-05T12:00:00+00:00",
            "servers": 6
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_add_schedule_creates_pair() {
        let store = Arc::new(MemoryStore::new());
        scheduler(&store).add_schedule(entry_fields()).await.unwrap();

        let actions = store.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].identifier, "Launch/START/+0000");
        assert_eq!(actions[0].min_capacity, 6);
        assert_eq!(actions[0].time, Utc.with_ymd_and_hms(2021, 4, 5, 8, 0, 0).unwrap());
        assert_eq!(actions[1].identifier, "Launch/FINISH/+0000");
        assert_eq!(actions[1].min_capacity, 2);
    }

    #[tokio::test]
    async fn test_add_schedule_rejects_bad_fields_without_store_calls() {
        let store = Arc::new(MemoryStore::new());
        let mut fields = entry_fields();
        fields.remove("servers");

        let err = scheduler(&store).add_schedule(fields).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Decode(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_failure_skips_finish() {
        let store =
            Arc::new(MemoryStore::new().fail_nth(StoreOp::Create, 1, ErrorCode::LimitExceeded));

        let err = scheduler(&store).add_schedule(entry_fields()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::RemoteCapacity(_)));
        assert_eq!(
            store.calls(),
            vec![StoreCall::Create("Launch/START/+0000".to_string())]
        );
    }

    #[tokio::test]
    async fn test_finish_failure_is_surfaced() {
        let store = Arc::new(
            MemoryStore::new().fail_nth(StoreOp::Create, 2, ErrorCode::ResourceContention),
        );

        let err = scheduler(&store).add_schedule(entry_fields()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.actions().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_action_is_conflict() {
        let store = Arc::new(MemoryStore::with_actions(vec![action(
            "Launch/START/+0000",
            0,
            6,
        )]));

        let err = scheduler(&store).add_schedule(entry_fields()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::RemoteConflict(_)));
    }

    #[tokio::test]
    async fn test_delete_stops_at_first_failure() {
        let store = Arc::new(
            MemoryStore::with_actions(vec![
                action("a/START/+0000", 1, 4),
                action("b/START/+0000", 2, 4),
                action("c/START/+0000", 3, 4),
            ])
            .fail_nth(StoreOp::Delete, 2, ErrorCode::ResourceContention),
        );

        let err = scheduler(&store)
            .delete_schedule(vec![
                json!("a/START/+0000"),
                json!("b/START/+0000"),
                json!("c/START/+0000"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, SchedulerError::RemoteContention(_)));
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Delete("a/START/+0000".to_string()),
                StoreCall::Delete("b/START/+0000".to_string()),
            ]
        );
        assert_eq!(store.actions().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_rejects_non_string_ids() {
        let store = Arc::new(MemoryStore::new());
        let err = scheduler(&store)
            .delete_schedule(vec![json!(42)])
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Decode(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_schedules_orders_and_defaults() {
        let store = Arc::new(MemoryStore::with_actions(vec![
            action("A/START/+0000", 100, 5),
            action("A/FINISH/+0000", 200, 2),
            action("B/FINISH/+0000", 50, 2),
            action("manual-override", 10, 9),
        ]));

        let schedules = scheduler(&store).get_schedules().await.unwrap();

        let names: Vec<_> = schedules.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(schedules[0].size, 2);
        assert_eq!(schedules[1].size, 5);
        assert_eq!(store.calls(), vec![StoreCall::List(100)]);
    }

    #[tokio::test]
    async fn test_get_schedules_surfaces_list_failure() {
        let store = Arc::new(MemoryStore::new().fail_nth(StoreOp::List, 1, ErrorCode::Unknown));
        let err = scheduler(&store).get_schedules().await.unwrap_err();
        assert!(matches!(err, SchedulerError::RemoteUnknown(_)));
    }

    fn meet(day: u32, start_hour: u32, end_hour: u32, tz: &FixedOffset) -> CalendarEvent {
        CalendarEvent::new(
            "Meet",
            tz.with_ymd_and_hms(2021, 4, day, start_hour, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2021, 4, day, end_hour, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_import_replaces_existing_schedules() {
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        let store = Arc::new(MemoryStore::with_actions(vec![
            action("Old/START/+0000", 10, 4),
            action("Old/FINISH/+0000", 20, 2),
        ]));

        let events = vec![
            meet(5, 13, 14, &tz),
            meet(5, 9, 10, &tz),
            CalendarEvent::new(
                "Offsite",
                tz.with_ymd_and_hms(2021, 4, 6, 0, 0, 0).unwrap(),
                tz.with_ymd_and_hms(2021, 4, 6, 0, 0, 0).unwrap() + TimeDelta::hours(24),
            ),
        ];
        let now = Utc.with_ymd_and_hms(2021, 4, 1, 0, 0, 0).unwrap();

        let summary = scheduler(&store)
            .import_calendar(events, tz, now)
            .await
            .unwrap();

        assert_eq!(summary, ImportSummary { deleted: 2, created: 1 });

        let actions = store.actions();
        let ids: Vec<_> = actions.iter().map(|a| a.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Meet Meet 04-05/START/-0700", "Meet Meet 04-05/FINISH/-0700"]);
        assert_eq!(actions[0].time, Utc.with_ymd_and_hms(2021, 4, 5, 15, 15, 0).unwrap());
        assert_eq!(actions[1].time, Utc.with_ymd_and_hms(2021, 4, 5, 21, 45, 0).unwrap());
        assert_eq!(actions[0].min_capacity, 4);
    }

    #[tokio::test]
    async fn test_import_stops_at_first_submission_error() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let store =
            Arc::new(MemoryStore::new().fail_nth(StoreOp::Create, 1, ErrorCode::LimitExceeded));
        let events = vec![meet(5, 9, 10, &tz), meet(6, 9, 10, &tz)];
        let now = Utc.with_ymd_and_hms(2021, 4, 1, 0, 0, 0).unwrap();

        let err = scheduler(&store)
            .import_calendar(events, tz, now)
            .await
            .unwrap_err();

        assert!(matches!(err, SchedulerError::RemoteCapacity(_)));
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::List(100),
                StoreCall::Create("Meet 04-05/START/+0000".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_import_ignores_events_outside_window() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let store = Arc::new(MemoryStore::new());
        let events = vec![meet(5, 9, 10, &tz)];
        let now = Utc.with_ymd_and_hms(2021, 5, 1, 0, 0, 0).unwrap();

        let entries = scheduler(&store).plan_import(events, tz, now).unwrap();
        assert!(entries.is_empty());
    }
}
