//! Application configuration.
//!
//! Values come from `<config_dir>/spacetrader/config.toml`, overridden by
//! `SPACETRADER_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the platform config dir that holds `config.toml`.
pub const CONFIG_DIR_NAME: &str = "spacetrader";
const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "SPACETRADER";

/// Runtime settings for the terminal client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the world snapshot.
    pub data_dir: PathBuf,
    /// Snapshot file name inside `data_dir`.
    pub world_file: String,
    /// Pilot to log in as.
    pub username: String,
    /// Marketplace auto-refresh period.
    pub refresh_interval_secs: u64,
    /// UI tick period.
    pub tick_rate_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(CONFIG_DIR_NAME),
            world_file: "world.json".to_string(),
            username: "pilot".to_string(),
            refresh_interval_secs: 30,
            tick_rate_ms: 250,
        }
    }
}

impl AppConfig {
    /// Load from the default config file plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from `path` (optional) plus environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(config.normalized())
    }

    /// Full path of the world snapshot.
    pub fn world_path(&self) -> PathBuf {
        self.data_dir.join(&self.world_file)
    }

    /// Marketplace auto-refresh period.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// UI tick period.
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    fn normalized(mut self) -> Self {
        let defaults = AppConfig::default();
        if self.username.trim().is_empty() {
            self.username = defaults.username;
        }
        if self.world_file.trim().is_empty() {
            self.world_file = defaults.world_file;
        }
        self.refresh_interval_secs = self.refresh_interval_secs.max(1);
        self.tick_rate_ms = self.tick_rate_ms.clamp(16, 5_000);
        self
    }
}

/// Path of `config.toml` under the user's config directory.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Write a commented default config if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(&config_path())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let defaults = AppConfig::default();
    let body = toml_template(&defaults);
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

fn toml_template(config: &AppConfig) -> String {
    format!(
        "# Space trader client settings.\n\
         # Any key can be overridden with SPACETRADER_<KEY>.\n\
         data_dir = {:?}\n\
         world_file = {:?}\n\
         username = {:?}\n\
         refresh_interval_secs = {}\n\
         tick_rate_ms = {}\n",
        config.data_dir.display().to_string(),
        config.world_file,
        config.username,
        config.refresh_interval_secs,
        config.tick_rate_ms,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(&dir.path().join("absent.toml"))?;
        assert_eq!(config.world_file, "world.json");
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "username = \"vega\"\nrefresh_interval_secs = 0\ndata_dir = \"/tmp/st\"\n",
        )?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.username, "vega");
        assert_eq!(config.refresh_interval_secs, 1);
        assert_eq!(config.world_path(), PathBuf::from("/tmp/st/world.json"));
        Ok(())
    }

    #[test]
    fn default_template_parses_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("spacetrader").join("config.toml");
        write_default_config(&path)?;
        assert!(path.exists());
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.tick_rate_ms, 250);
        assert_eq!(config.username, "pilot");
        Ok(())
    }
}
