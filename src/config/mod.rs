//! Configuration management
//!
//! Settings live in `~/.studydeck/config.yaml`. A missing file yields the
//! defaults; unknown keys are rejected by `set`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::db::{default_data_dir, DATABASE_NAME};
use crate::storage::OpenOptions;

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const CONFIG_KEYS: &[&str] = &["data_dir", "destructive_fallback", "cloud_url", "cloud_token"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the store file (defaults to `~/.studydeck`)
    pub data_dir: Option<PathBuf>,

    /// Rebuild the store empty when migrations cannot be applied. Lossy.
    pub destructive_fallback: bool,

    /// Remote document API base URL
    pub cloud_url: Option<String>,

    /// Bearer token for the remote document API
    pub cloud_token: Option<String>,
}

impl Config {
    /// Loads `~/.studydeck/config.yaml`, or defaults if it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_saphyr::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Saves to `~/.studydeck/config.yaml`.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Saves to a specific file, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_saphyr::to_string(self).context("Failed to serialize config")?;

        // Write to a temp file first, then rename for atomicity
        let temp_path = path.with_extension("yaml.tmp");
        std::fs::write(&temp_path, content).context("Failed to write config temp file")?;
        std::fs::rename(&temp_path, path).context("Failed to rename config file")?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_data_dir()?.join("config.yaml"))
    }

    /// Path of the store file.
    pub fn store_path(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Ok(dir.join(DATABASE_NAME))
    }

    /// Store open options derived from this configuration.
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions::default().fallback_to_destructive(self.destructive_fallback)
    }

    /// Reads a single key as display text.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "data_dir" => self.data_dir.as_ref().map(|p| p.display().to_string()),
            "destructive_fallback" => Some(self.destructive_fallback.to_string()),
            "cloud_url" => self.cloud_url.clone(),
            "cloud_token" => self.cloud_token.as_ref().map(|_| "********".to_string()),
            _ => bail!("Unknown config key '{key}'. Valid keys: {}", CONFIG_KEYS.join(", ")),
        };
        Ok(value)
    }

    /// Sets a single key from text. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match key {
            "data_dir" => self.data_dir = optional(value).map(PathBuf::from),
            "destructive_fallback" => {
                self.destructive_fallback = value
                    .parse()
                    .with_context(|| format!("'{value}' is not true or false"))?;
            }
            "cloud_url" => self.cloud_url = optional(value),
            "cloud_token" => self.cloud_token = optional(value),
            _ => bail!("Unknown config key '{key}'. Valid keys: {}", CONFIG_KEYS.join(", ")),
        }
        Ok(())
    }
}
