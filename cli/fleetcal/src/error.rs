//! Error handling and display for the CLI.

use colored::Colorize;
use fleetcal_scheduler::SchedulerError;
use fleetcal_store::StoreError;
use thiserror::Error;

use crate::config::CONFIG_KEYS;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("No capacity group specified. Use --group or `fleetcal config set group <NAME>`.")]
    MissingGroup,

    #[error("Invalid value '{value}' for '{key}'")]
    InvalidSetting { key: String, value: String },

    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {}", hint).yellow());
    }
}

fn hint(err: &anyhow::Error) -> Option<String> {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::UnknownSetting(_) => {
                Some(format!("Valid settings are: {}.", CONFIG_KEYS.join(", ")))
            }
            _ => None,
        };
    }

    match err.downcast_ref::<SchedulerError>()? {
        SchedulerError::RemoteContention(_) => Some(
            "The group was busy with another change. It is safe to retry the same command."
                .to_string(),
        ),
        SchedulerError::RemoteCapacity(_) => Some(
            "The group's scheduled action quota is exhausted. Back off or delete old schedules first."
                .to_string(),
        ),
        SchedulerError::RemoteConflict(_) => Some(
            "A schedule with this name already exists. Delete it with `fleetcal schedules delete`."
                .to_string(),
        ),
        SchedulerError::RemoteUnknown(StoreError::Network(_)) => {
            Some("Check your network connection and store URL.".to_string())
        }
        SchedulerError::RemoteUnknown(StoreError::Remote {
            status: Some(401 | 403),
            ..
        }) => Some("Set a valid store token with `fleetcal auth set-token`.".to_string()),
        SchedulerError::TimeParse { .. } => {
            Some("Timestamps must be RFC 3339, e.g. 2021-04-05T08:15:00-07:00.".to_string())
        }
        _ => None,
    }
}
