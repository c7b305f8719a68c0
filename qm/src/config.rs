//! Quartermaster configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::bank::BankConfig;
use crate::peer::PeerConfig;
use crate::policy::{ItemCatalog, default_catalog};
use crate::scheduler::SchedulerConfig;
use crate::tasks::MerchantConfig;

/// Main Quartermaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    pub scheduler: SchedulerConfig,

    pub bank: BankConfig,

    pub peer: PeerConfig,

    pub merchant: MerchantConfig,

    /// Per-item policies
    pub items: ItemCatalog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            scheduler: SchedulerConfig::default(),
            bank: BankConfig::default(),
            peer: PeerConfig::default(),
            merchant: MerchantConfig::default(),
            items: default_catalog(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .quartermaster.yml
        let local_config = PathBuf::from(".quartermaster.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/quartermaster/quartermaster.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quartermaster").join("quartermaster.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed; a broken config surfaces later through `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => {
                let local = PathBuf::from(".quartermaster.yml");
                if local.exists() {
                    local
                } else {
                    dirs::config_dir()?.join("quartermaster").join("quartermaster.yml")
                }
            }
        };
        let content = fs::read_to_string(path).ok()?;
        let value: serde_yaml::Value = serde_yaml::from_str(&content).ok()?;
        value.get("log-level")?.as_str().map(str::to_string)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
