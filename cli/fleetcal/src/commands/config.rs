//! Config commands (saved defaults for store, group and finish size).

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{print_single, print_success, OutputFormat};

use super::CommandContext;

/// Show or change saved settings.
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    /// Show the effective settings.
    Show,

    /// Save a setting (store_url, group or finish_size).
    Set {
        /// Setting name.
        key: String,

        /// New value.
        value: String,
    },
}

#[derive(Debug, Serialize)]
struct ConfigView {
    store_url: String,
    group: Option<String>,
    finish_size: i64,
    authenticated: bool,
}

impl ConfigCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => show(ctx),
            ConfigSubcommand::Set { key, value } => set(ctx, &key, &value),
        }
    }
}

fn show(ctx: CommandContext) -> Result<()> {
    let view = ConfigView {
        store_url: ctx.resolve_store_url().to_string(),
        group: ctx.require_group().ok().map(str::to_string),
        finish_size: ctx.scheduler_config().finish_size,
        authenticated: ctx.resolve_token().is_some(),
    };

    match ctx.format {
        OutputFormat::Json => print_single(&view),
        OutputFormat::Table => {
            println!("store_url: {}", view.store_url);
            println!("group: {}", view.group.as_deref().unwrap_or("-"));
            println!("finish_size: {}", view.finish_size);
            println!("authenticated: {}", view.authenticated);
        }
    }

    Ok(())
}

fn set(mut ctx: CommandContext, key: &str, value: &str) -> Result<()> {
    ctx.config.set(key, value)?;
    ctx.config.save()?;

    match ctx.format {
        OutputFormat::Json => print_single(&serde_json::json!({ "ok": true })),
        OutputFormat::Table => print_success(&format!("Set {} = {}", key, value)),
    }

    Ok(())
}
