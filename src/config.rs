// src/config.rs
//! Configuration management with file-based storage

use crate::error::{MetaError, Result};
use crate::map::Subdomains;
use crate::origin::source::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Request URL template with `{x}`, `{y}`, `{z}` and `{s}` placeholders
    pub url: Option<String>,
    pub subdomains: Subdomains,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: None,
            subdomains: Subdomains::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl OriginConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Load from a specific file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| MetaError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| MetaError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MetaError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| MetaError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| MetaError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// `$HOME/.config/geometa/config.json`
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| MetaError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("geometa").join("config.json"))
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(MetaError::Config("request_timeout_secs must be positive".to_string()));
        }
        if self.subdomains.as_slice().iter().any(String::is_empty) {
            return Err(MetaError::Config("subdomain aliases must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn update_url(&mut self, url: String) {
        self.url = Some(url);
    }

    pub fn update_subdomains(&mut self, subdomains: impl Into<Subdomains>) {
        self.subdomains = subdomains.into();
    }
}
