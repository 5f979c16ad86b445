//! Static JSON guide files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use opentv_guide::{Channel, Program, ProgramTemplate, materialize};
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::api::GuideSource;

/// Channel list file name inside the data directory.
pub const CHANNELS_FILE: &str = "channels.json";

/// Program template file name inside the data directory.
pub const PROGRAMS_FILE: &str = "programs.json";

/// Guide data read from `channels.json` and `programs.json`.
///
/// Program templates are materialized at the reference instant passed to
/// `fetch_programs`.
#[derive(Debug, Clone)]
pub struct StaticGuideFiles {
    data_dir: PathBuf,
}

impl StaticGuideFiles {
    /// Creates a source reading from `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Reads the raw program templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load_templates(&self) -> Result<Vec<ProgramTemplate>> {
        self.read_json(PROGRAMS_FILE).await
    }

    /// Reads and decodes a JSON file from the data directory.
    async fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> Result<T> {
        let path = self.data_dir.join(file_name);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}

impl GuideSource for StaticGuideFiles {
    #[instrument(skip_all)]
    async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        self.read_json(CHANNELS_FILE).await
    }

    #[instrument(skip_all)]
    async fn fetch_programs(&self, reference: DateTime<Utc>) -> Result<Vec<Program>> {
        let templates = self.load_templates().await?;
        Ok(materialize(&templates, reference))
    }
}
