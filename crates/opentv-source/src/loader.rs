//! Guide loading with primary/fallback sources.

use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};
use opentv_guide::{Channel, ChannelGuideEntry, Program, ProgramsByChannel, assemble};
use serde::Serialize;
use tracing::instrument;

use super::api::GuideSource;

/// Data tagged with whether it came from the fallback source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T> {
    /// The fetched data.
    pub data: T,
    /// `true` if the primary source failed and the fallback was used.
    pub used_fallback: bool,
}

/// A fully loaded guide: the result of one refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedGuide {
    /// All channels.
    pub channels: Vec<Channel>,
    /// All programs, in source order.
    pub programs: Vec<Program>,
    /// `true` if either half came from the fallback source.
    pub using_fallback: bool,
    /// Reference instant of the load.
    pub loaded_at: DateTime<Utc>,
}

impl LoadedGuide {
    /// Assembles the per-channel guide at `at`.
    #[must_use]
    pub fn guide(&self, at: DateTime<Utc>) -> Vec<ChannelGuideEntry> {
        assemble(&self.channels, &self.programs, at)
    }

    /// Groups the programs by channel, preserving source order.
    #[must_use]
    pub fn programs_by_channel(&self) -> ProgramsByChannel {
        self.programs.iter().cloned().collect()
    }
}

/// Loads channels and programs from an optional primary source, falling
/// back to a secondary source per half.
///
/// Without a primary source the fallback is read directly and the result is
/// not flagged as a fallback.
#[derive(Debug, Clone)]
pub struct GuideLoader<P, F> {
    primary: Option<P>,
    fallback: F,
}

impl<P, F> GuideLoader<P, F>
where
    P: GuideSource + Sync,
    F: GuideSource + Sync,
{
    /// Creates a loader.
    pub const fn new(primary: Option<P>, fallback: F) -> Self {
        Self { primary, fallback }
    }

    /// Loads both halves concurrently, anchoring templates at `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if, for either half, the primary source and the
    /// fallback both fail. No partial guide is produced.
    #[instrument(skip_all)]
    pub async fn load(&self, reference: DateTime<Utc>) -> Result<LoadedGuide> {
        let channels = async {
            match &self.primary {
                Some(primary) => {
                    with_fallback(
                        "channels",
                        primary.fetch_channels(),
                        self.fallback.fetch_channels(),
                    )
                    .await
                }
                None => self.fallback.fetch_channels().await.map(direct),
            }
        };
        let programs = async {
            match &self.primary {
                Some(primary) => {
                    with_fallback(
                        "programs",
                        primary.fetch_programs(reference),
                        self.fallback.fetch_programs(reference),
                    )
                    .await
                }
                None => self.fallback.fetch_programs(reference).await.map(direct),
            }
        };

        let (channels, programs) = tokio::try_join!(channels, programs)?;
        let using_fallback = channels.used_fallback || programs.used_fallback;

        tracing::info!(
            channels = channels.data.len(),
            programs = programs.data.len(),
            using_fallback,
            "Guide loaded"
        );

        Ok(LoadedGuide {
            channels: channels.data,
            programs: programs.data,
            using_fallback,
            loaded_at: reference,
        })
    }
}

/// Wraps data read without fallback.
const fn direct<T>(data: T) -> Sourced<T> {
    Sourced {
        data,
        used_fallback: false,
    }
}

/// Awaits `primary`, then `fallback` if the primary failed.
///
/// The fallback future is not polled when the primary succeeds.
async fn with_fallback<T>(
    what: &str,
    primary: impl Future<Output = Result<T>>,
    fallback: impl Future<Output = Result<T>>,
) -> Result<Sourced<T>> {
    let primary_err = match primary.await {
        Ok(data) => {
            return Ok(Sourced {
                data,
                used_fallback: false,
            });
        }
        Err(e) => e,
    };

    let detail = format!("{primary_err:#}");
    tracing::warn!(%what, error = %detail, "Primary source failed, using fallback");

    match fallback.await {
        Ok(data) => Ok(Sourced {
            data,
            used_fallback: true,
        }),
        Err(fallback_err) => Err(fallback_err.context(format!(
            "unable to load {what}: primary source failed ({primary_err:#}) and fallback failed"
        ))),
    }
}
