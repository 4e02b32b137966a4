//! CLI commands.

mod auth;
mod config;
mod import;
mod schedules;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleetcal_scheduler::{Scheduler, SchedulerConfig};
use fleetcal_store::{HttpScheduleStore, StoreConfig};
use tracing::debug;

use crate::config::{Config, Credentials, DEFAULT_STORE_URL};
use crate::error::CliError;
use crate::output::OutputFormat;

/// fleetcal - Keep a worker fleet's capacity schedule in step with a calendar.
#[derive(Debug, Parser)]
#[command(name = "fleetcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Store API base URL.
    #[arg(long, global = true, env = "FLEETCAL_STORE_URL")]
    store_url: Option<String>,

    /// Capacity group whose schedules are managed.
    #[arg(long, global = true, env = "FLEETCAL_GROUP")]
    group: Option<String>,

    /// Capacity set when a window closes.
    #[arg(long, global = true, env = "FLEETCAL_FINISH_SIZE")]
    finish_size: Option<i64>,

    /// Store bearer token; overrides saved credentials.
    #[arg(long, global = true, env = "FLEETCAL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text or json).
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List, add and delete schedules.
    Schedules(schedules::SchedulesCommand),

    /// Replace all schedules with the daily windows of a calendar file.
    Import(import::ImportCommand),

    /// Show or change saved settings.
    Config(config::ConfigCommand),

    /// Manage the store token.
    Auth(auth::AuthCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;
        let credentials = Credentials::load()?;

        let ctx = CommandContext {
            config,
            credentials,
            format: OutputFormat::parse(&self.format),
            store_url: self.store_url,
            group: self.group,
            finish_size: self.finish_size,
            token: self.token,
        };

        match self.command {
            Commands::Schedules(cmd) => cmd.run(ctx).await,
            Commands::Import(cmd) => cmd.run(ctx).await,
            Commands::Config(cmd) => cmd.run(ctx).await,
            Commands::Auth(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("fleetcal {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub credentials: Option<Credentials>,
    pub format: OutputFormat,
    pub store_url: Option<String>,
    pub group: Option<String>,
    pub finish_size: Option<i64>,
    pub token: Option<String>,
}

impl CommandContext {
    /// Resolve the store URL, preferring flag over config.
    pub fn resolve_store_url(&self) -> &str {
        self.store_url
            .as_deref()
            .or(self.config.store_url.as_deref())
            .unwrap_or(DEFAULT_STORE_URL)
    }

    /// Require a capacity group to be specified.
    pub fn require_group(&self) -> Result<&str, CliError> {
        self.group
            .as_deref()
            .or(self.config.group.as_deref())
            .ok_or(CliError::MissingGroup)
    }

    /// Resolve the store token, preferring flag over saved credentials.
    pub fn resolve_token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or(self.credentials.as_ref().map(|c| c.token.as_str()))
    }

    /// Scheduler settings with the resolved finish size.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        match self.finish_size.or(self.config.finish_size) {
            Some(size) => SchedulerConfig::with_finish_size(size),
            None => SchedulerConfig::default(),
        }
    }

    /// Get a scheduler bound to the HTTP store.
    pub fn scheduler(&self) -> Result<Scheduler> {
        let config = StoreConfig {
            base_url: self.resolve_store_url().to_string(),
            group: self.require_group()?.to_string(),
            token: self.resolve_token().map(str::to_string),
        };
        debug!(
            store_url = %config.base_url,
            group = %config.group,
            authenticated = config.token.is_some(),
            "Connecting to schedule store"
        );
        let store = HttpScheduleStore::new(&config)?;

        Ok(Scheduler::new(Arc::new(store), self.scheduler_config()))
    }
}
