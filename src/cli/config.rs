//! Configuration management for capaudit
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.capaudit/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog;
use crate::errors::{AuditError, Result};

/// Complete configuration for capaudit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub audit: AuditConfig,
    pub sim: SimConfig,
    pub output: OutputConfig,
}

/// Audit selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Categories to audit by default; empty means the whole catalog
    pub categories: Vec<String>,
    /// Default namespace snapshot to audit instead of the simulator
    pub snapshot: Option<String>,
}

/// Simulated executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub seed: u64,
}

/// Report and live-line display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub default_verbosity: String,
    pub color_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audit: AuditConfig::default(),
            sim: SimConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            snapshot: None,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { seed: 0 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            color_output: true,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuditError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| AuditError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".capaudit").join("config.toml");
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let known = catalog::category_names();
        for category in &self.audit.categories {
            if !known.contains(&category.to_lowercase().as_str()) {
                return Err(AuditError::ConfigError(format!(
                    "Unknown category in config: {}",
                    category
                )));
            }
        }

        match self.output.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            _ => {
                return Err(AuditError::ConfigError(format!(
                    "Invalid verbosity level: {}",
                    self.output.default_verbosity
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AuditError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuditError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AuditError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Default snapshot path, when one is configured
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.audit.snapshot.as_ref().map(PathBuf::from)
    }
}
