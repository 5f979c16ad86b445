//! `AppConfig` struct and TOML read/write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use opentv_guide::DEFAULT_GENERATOR_NAME;
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Guide data sources.
    #[serde(default)]
    pub source: SourceConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// EPG document settings.
    #[serde(default)]
    pub epg: EpgConfig,
}

/// Guide data source configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the primary guide API. Static files only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Directory holding `channels.json` and `programs.json`.
    pub data_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            data_dir: PathBuf::from("data"),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address. The `PORT` environment variable overrides its port.
    pub bind: String,
    /// Base URL for logo and EPG links when a request carries no host.
    pub public_url: String,
    /// Directory served under `/assets`.
    pub assets_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: String::from("127.0.0.1:3000"),
            public_url: String::from("http://localhost:3000"),
            assets_dir: PathBuf::from("assets"),
        }
    }
}

/// EPG document configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EpgConfig {
    /// `generator-info-name` of the XMLTV root.
    pub generator_name: String,
}

impl Default for EpgConfig {
    fn default() -> Self {
        Self {
            generator_name: String::from(DEFAULT_GENERATOR_NAME),
        }
    }
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config to TOML")?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }
}
