//! Calendar import command.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Args;
use fleetcal_scheduler::{DailyEntry, IcsCalendar};
use tabled::Tabled;
use tracing::debug;

use crate::output::{print_info, print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Import command - replace every schedule in the group with one window per
/// calendar day, from now to the end of the month.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// iCalendar (.ics) file to read.
    file: PathBuf,

    /// Show the daily windows without changing the store.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Tabled)]
struct EntryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Finish")]
    finish: String,
    #[tabled(rename = "Servers")]
    servers: i64,
    #[tabled(rename = "Hours")]
    hours: String,
}

impl From<&DailyEntry> for EntryRow {
    fn from(entry: &DailyEntry) -> Self {
        Self {
            name: entry.name.clone(),
            start: entry.start.format("%Y-%m-%d %H:%M %z").to_string(),
            finish: entry.finish.format("%Y-%m-%d %H:%M %z").to_string(),
            servers: entry.servers,
            hours: format!("{:.2}", entry.hours),
        }
    }
}

impl ImportCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        debug!(file = %self.file.display(), dry_run = self.dry_run, "Importing calendar");
        let file = File::open(&self.file)
            .with_context(|| format!("Failed to open calendar {:?}", self.file))?;
        let calendar = IcsCalendar::new(BufReader::new(file), Local);
        let scheduler = ctx.scheduler()?;

        if self.dry_run {
            let entries = scheduler.plan_import(calendar, Local, Utc::now())?;
            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
            if ctx.format == OutputFormat::Table {
                print_info("Dry run; the store was not changed.");
            }
            print_output(&rows, &entries, ctx.format);
            return Ok(());
        }

        let summary = scheduler
            .import_calendar(calendar, Local, Utc::now())
            .await?;

        match ctx.format {
            OutputFormat::Json => print_single(&summary),
            OutputFormat::Table => print_success(&format!(
                "Replaced {} scheduled action(s) with {} daily schedule(s)",
                summary.deleted, summary.created
            )),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_entry_row() {
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        let entry = DailyEntry {
            name: "Meet Meet 04-05".to_string(),
            start: tz.with_ymd_and_hms(2021, 4, 5, 8, 15, 0).unwrap(),
            finish: tz.with_ymd_and_hms(2021, 4, 5, 14, 45, 0).unwrap(),
            servers: 4,
            hours: 6.5,
        };

        let row = EntryRow::from(&entry);
        assert_eq!(row.start, "2021-04-05 08:15 -0700");
        assert_eq!(row.finish, "2021-04-05 14:45 -0700");
        assert_eq!(row.hours, "6.50");
    }
}
