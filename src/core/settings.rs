use crate::core::models::{RefreshInterval, DEFAULT_INTERVAL_MINUTES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "meow-refresh";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub refresh: RefreshSettings,
    pub source: SourceSettings,
    pub notifications: NotificationSettings,
    pub scheduler: SchedulerSettings,
    pub storage: StorageSettings,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub interval_minutes: i64,
    pub deadline_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            deadline_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub origin: String,
    pub metadata_path: String,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            origin: "https://cataas.com".to_string(),
            metadata_path: "/cat?json=true&position=center".to_string(),
            timeout_secs: 20,
        }
    }
}

impl SourceSettings {
    pub fn metadata_url(&self) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), self.metadata_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub exact: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { exact: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;

        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.source.origin.starts_with("http") {
            anyhow::bail!(
                "source.origin must be an http(s) URL, got {:?}",
                self.source.origin
            );
        }
        if !self.source.metadata_path.starts_with('/') {
            anyhow::bail!(
                "source.metadata_path must start with '/', got {:?}",
                self.source.metadata_path
            );
        }
        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }
        if self.refresh.deadline_secs == 0 {
            anyhow::bail!("refresh.deadline_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn default_interval(&self) -> RefreshInterval {
        RefreshInterval::from_minutes(self.refresh.interval_minutes)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.refresh.deadline_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|p| p.join(APP_DIR))
            .context("Could not determine data directory")
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("state.json"))
    }

    pub fn images_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("cats"))
    }
}
