//! Desk configuration
//!
//! Loaded from `civicdesk.toml`. Every field has a default, so a missing
//! file or an empty one yields a usable configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bot::{EngineSettings, StepPolicy, DEFAULT_MAX_SAVE_ATTEMPTS};
use crate::error::{Error, Result};

/// File name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "civicdesk.toml";

const DATABASE_FILE_NAME: &str = "civicdesk.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Install the stock scripts and rules on startup
    pub seed_defaults: bool,
    pub bot: BotSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            log_filter: "info".to_string(),
            seed_defaults: true,
            bot: BotSettings::default(),
        }
    }
}

/// `[bot]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub rule_cache_ttl_secs: u64,
    pub cache_sweep_interval_secs: u64,
    pub max_save_attempts: u32,
    pub step_policy: StepPolicy,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            rule_cache_ttl_secs: 30,
            cache_sweep_interval_secs: 60,
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
            step_policy: StepPolicy::Exact,
        }
    }
}

impl BotSettings {
    pub fn rule_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.rule_cache_ttl_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file; the file must exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "config file {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `civicdesk.toml` from the platform config directory, or defaults
    pub fn load_default() -> Result<Self> {
        let path = project_dirs()?.config_dir().join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot.max_save_attempts == 0 {
            return Err(Error::InvalidInput(
                "bot.max_save_attempts must be at least 1".into(),
            ));
        }
        if self.bot.rule_cache_ttl_secs == 0 {
            return Err(Error::InvalidInput(
                "bot.rule_cache_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.bot.cache_sweep_interval_secs == 0 {
            return Err(Error::InvalidInput(
                "bot.cache_sweep_interval_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Database file to open, falling back to the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE_NAME)),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            step_policy: self.bot.step_policy,
            max_save_attempts: self.bot.max_save_attempts,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "onyx", "civicdesk").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine config directory",
        ))
    })
}
