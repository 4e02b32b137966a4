//! # fleetcal-scheduler
//!
//! Turns calendars into capacity schedules for a worker fleet and reconciles
//! them against the remote scheduled-action store.
//!
//! ## Pipelines
//!
//! - **Ingestion**: calendar source → [`DailyMerger`] → [`build_actions`] →
//!   store create (one START and one FINISH action per day).
//! - **Reconciliation**: store list → identifier decode →
//!   [`aggregate_schedules`] → ordered [`Schedule`]s.
//!
//! [`Scheduler`] exposes both pipelines as the operations a shell calls:
//! add, delete, get and import.
//!
//! ## Consistency
//!
//! The store has no transactions. START and FINISH are submitted one after the
//! other, and an import deletes the existing schedules before creating new
//! ones. A failure part-way leaves a partial set behind; re-running the import
//! converges again because the store is the only source of truth.
//!
//! [`DailyMerger`]: fleetcal_calendar::DailyMerger
//! [`aggregate_schedules`]: fleetcal_reconcile::aggregate_schedules
//! [`Schedule`]: fleetcal_reconcile::Schedule

mod builder;
mod config;
mod entry;
mod error;
mod service;

pub use builder::{build_actions, jitter_offset, ActionPair};
pub use config::SchedulerConfig;
pub use entry::ScheduleEntry;
pub use error::SchedulerError;
pub use service::{ImportSummary, Scheduler};

pub use fleetcal_calendar::{CalendarSource, DailyEntry, IcsCalendar, MergeConfig};
pub use fleetcal_reconcile::Schedule;
