use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::logging::LogConfig;
use crate::policy::PolicyDefaults;
use crate::reps::RepsRange;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// General application settings
    pub settings: AppSettings,

    /// Progression engine tunables
    pub progression: ProgressionSettings,

    /// Logging configuration
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Data directory path
    pub data_dir: PathBuf,

    /// Database file name within the data directory
    pub database_file: String,
}

impl AppSettings {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// Progression engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionSettings {
    /// Increment assumed when neither the instance nor its chain has one
    pub default_increment: Decimal,

    /// Rep range assumed when a stored spec is malformed
    pub default_range: String,

    /// Set-count cap for the substitution adjustment
    pub max_sets: u32,

    /// Set-count floor for the substitution adjustment
    pub min_sets: u32,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            default_increment: dec!(2.5),
            default_range: "8-12".to_string(),
            max_sets: 5,
            min_sets: 1,
        }
    }
}

impl ProgressionSettings {
    /// Resolve into the fallbacks the engine runs with. A malformed
    /// configured range falls back to the shipped default rather than
    /// failing startup.
    pub fn engine_defaults(&self) -> PolicyDefaults {
        PolicyDefaults {
            increment: self.default_increment,
            fallback_range: RepsRange::parse_or_default(&self.default_range),
            min_sets: self.min_sets,
            max_sets: self.max_sets,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftrs");
        Self {
            metadata: ConfigMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: now,
                updated_at: now,
            },
            settings: AppSettings {
                data_dir,
                database_file: "liftrs.db".to_string(),
            },
            progression: ProgressionSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftrs")
            .join("config.toml")
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist yet.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let path = path.cloned().unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration, creating the parent directory as needed.
    pub fn save(&mut self, path: Option<&PathBuf>) -> Result<()> {
        let path = path.cloned().unwrap_or_else(Self::default_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
        }
        self.metadata.updated_at = Utc::now();
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}
