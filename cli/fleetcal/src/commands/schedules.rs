//! Schedule commands.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Args, Subcommand};
use fleetcal_scheduler::{MergeConfig, Schedule};
use serde_json::json;
use tabled::Tabled;

use crate::output::{print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Manage schedules.
#[derive(Debug, Args)]
pub struct SchedulesCommand {
    #[command(subcommand)]
    command: SchedulesSubcommand,
}

#[derive(Debug, Subcommand)]
enum SchedulesSubcommand {
    /// List schedules in the group.
    List,

    /// Add a schedule.
    Add(AddArgs),

    /// Delete scheduled actions by identifier.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Schedule name.
    #[arg(long)]
    name: String,

    /// Window start (RFC 3339, e.g. 2021-04-05T08:15:00-07:00).
    #[arg(long)]
    start: String,

    /// Window finish (RFC 3339).
    #[arg(long)]
    finish: String,

    /// Servers while the window is open.
    #[arg(long, default_value_t = MergeConfig::default().servers)]
    servers: i64,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    /// Action identifiers, as shown in the Actions column.
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Debug, Tabled)]
struct ScheduleRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Size")]
    size: i64,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Finish")]
    finish: String,
    #[tabled(rename = "TZ")]
    tz: String,
    #[tabled(rename = "Actions")]
    actions: String,
}

impl From<&Schedule> for ScheduleRow {
    fn from(schedule: &Schedule) -> Self {
        let offset = parse_offset(&schedule.tz);
        Self {
            name: schedule.name.clone(),
            size: schedule.size,
            start: format_time(schedule.start, offset),
            finish: format_time(schedule.finish, offset),
            tz: schedule.tz.clone(),
            actions: schedule.ids.join("\n"),
        }
    }
}

impl SchedulesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            SchedulesSubcommand::List => list(ctx).await,
            SchedulesSubcommand::Add(args) => add(ctx, args).await,
            SchedulesSubcommand::Delete(args) => delete(ctx, args).await,
        }
    }
}

async fn list(ctx: CommandContext) -> Result<()> {
    let schedules = ctx.scheduler()?.get_schedules().await?;
    let rows: Vec<ScheduleRow> = schedules.iter().map(ScheduleRow::from).collect();

    print_output(&rows, &schedules, ctx.format);
    Ok(())
}

async fn add(ctx: CommandContext, args: AddArgs) -> Result<()> {
    let mut fields = serde_json::Map::new();
    fields.insert("name".to_string(), json!(args.name));
    fields.insert("start".to_string(), json!(args.start));
    fields.insert("finish".to_string(), json!(args.finish));
    fields.insert("servers".to_string(), json!(args.servers));

    ctx.scheduler()?.add_schedule(fields.clone()).await?;

    match ctx.format {
        OutputFormat::Json => print_single(&fields),
        OutputFormat::Table => print_success(&format!("Added schedule '{}'", args.name)),
    }
    Ok(())
}

async fn delete(ctx: CommandContext, args: DeleteArgs) -> Result<()> {
    let count = args.ids.len();
    let raw = args.ids.into_iter().map(serde_json::Value::String).collect();

    ctx.scheduler()?.delete_schedule(raw).await?;

    match ctx.format {
        OutputFormat::Json => print_single(&json!({ "deleted": count })),
        OutputFormat::Table => print_success(&format!("Deleted {} scheduled action(s)", count)),
    }
    Ok(())
}

/// Parses a `±HHMM` display offset.
fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let (sign, digits) = match tz.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn format_time(time: Option<DateTime<Utc>>, offset: Option<FixedOffset>) -> String {
    match (time, offset) {
        (Some(t), Some(offset)) => t.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        (Some(t), None) => t.format("%Y-%m-%d %H:%M UTC").to_string(),
        (None, _) => "-".to_string(),
    }
}
