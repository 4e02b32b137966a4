//! Configuration and credential storage.
//!
//! Handles:
//! - Store endpoint, capacity group and finish size defaults
//! - Store bearer token storage

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Credentials file name.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Store URL used when neither flag, environment nor config file sets one.
pub const DEFAULT_STORE_URL: &str = "http://localhost:8080";

/// Keys accepted by `fleetcal config set`.
pub const CONFIG_KEYS: [&str; 3] = ["store_url", "group", "finish_size"];

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "fleetcal", "fleetcal")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Store API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,

    /// Capacity group whose schedules are managed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Capacity set when a window closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_size: Option<i64>,
}

impl Config {
    /// Load config from disk, or return default.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join(CONFIG_FILE))
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)?;
        self.save_to(&dir.join(CONFIG_FILE))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        write_private(path, &serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write config to {:?}", path))
    }

    /// Set one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CliError> {
        match key {
            "store_url" => self.store_url = Some(value.to_string()),
            "group" => self.group = Some(value.to_string()),
            "finish_size" => {
                let size: i64 = value
                    .parse()
                    .ok()
                    .filter(|size| *size >= 0)
                    .ok_or_else(|| CliError::InvalidSetting {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                self.finish_size = Some(size);
            }
            _ => return Err(CliError::UnknownSetting(key.to_string())),
        }
        Ok(())
    }
}

/// Stored credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Store bearer token.
    pub token: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(token: String) -> Self {
        Self { token }
    }

    /// Load credentials from disk.
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&config_dir()?.join(CREDENTIALS_FILE))
    }

    fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {:?}", path))?;

        let creds: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {:?}", path))?;

        Ok(Some(creds))
    }

    /// Save credentials to disk.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = dir.join(CREDENTIALS_FILE);
        write_private(&path, &serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write credentials to {:?}", path))
    }

    /// Delete credentials from disk.
    pub fn delete() -> Result<()> {
        let path = config_dir()?.join(CREDENTIALS_FILE);

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete credentials at {:?}", path))?;
        }

        Ok(())
    }
}

/// Writes `contents` readable by the owner only.
fn write_private(path: &Path, contents: &str) -> Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(contents.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)?;
    }

    Ok(())
}
