//! # fleetcal-calendar
//!
//! Calendar ingestion for fleetcal: reading events from an iCalendar file and
//! folding them into one capacity window per calendar day.
//!
//! ## Pipeline
//!
//! 1. A [`CalendarSource`] yields [`CalendarEvent`]s inside an import window
//!    (see [`import_window`]).
//! 2. [`DailyMerger`] drops all-day markers, pads every remaining event, and
//!    merges same-day events into a single [`DailyEntry`].
//!
//! ## Design Principles
//!
//! - Sources are consumed once; re-reading requires reopening the file
//! - Merging is a pure, in-memory transform
//! - A `DailyEntry` always finishes after it starts

mod daily;
mod error;
mod event;
mod ics;

pub use daily::*;
pub use error::CalendarError;
pub use event::*;
pub use ics::IcsCalendar;
