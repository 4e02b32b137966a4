//! Store token commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::Credentials;
use crate::output::print_success;

use super::CommandContext;

/// Store token commands.
#[derive(Debug, Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Debug, Subcommand)]
enum AuthSubcommand {
    /// Save the store bearer token.
    SetToken {
        /// Token value.
        #[arg(value_name = "TOKEN")]
        value: String,
    },

    /// Remove the saved token.
    Clear,

    /// Show whether a token is configured.
    Status,
}

impl AuthCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            AuthSubcommand::SetToken { value } => set_token(value),
            AuthSubcommand::Clear => clear(),
            AuthSubcommand::Status => status(ctx),
        }
    }
}

fn set_token(value: String) -> Result<()> {
    let token = value.trim();
    if token.is_empty() {
        anyhow::bail!("Token cannot be empty");
    }

    Credentials::new(token.to_string()).save()?;
    print_success("Saved store token.");
    Ok(())
}

fn clear() -> Result<()> {
    Credentials::delete()?;
    print_success("Removed store token.");
    Ok(())
}

fn status(ctx: CommandContext) -> Result<()> {
    if ctx.token.is_some() {
        println!("{} Token from --token or FLEETCAL_TOKEN", "Status:".green().bold());
    } else if ctx.credentials.is_some() {
        println!("{} Saved token", "Status:".green().bold());
    } else {
        println!("{} No token", "Status:".red().bold());
        println!("\nRun {} to save one.", "fleetcal auth set-token".cyan());
    }
    Ok(())
}
