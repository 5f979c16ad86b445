//! `GuideSource` trait definition.
#![allow(clippy::future_not_send)]

use anyhow::Result;
use chrono::{DateTime, Utc};
use opentv_guide::{Channel, Program};

/// A source of channels and programs.
///
/// Abstracts the HTTP API and the static files for mock substitution in
/// tests. Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(GuideSource: Send)]
pub trait LocalGuideSource {
    /// Fetches the channel list.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or decoded.
    async fn fetch_channels(&self) -> Result<Vec<Channel>>;

    /// Fetches programs anchored at `reference`.
    ///
    /// Sources that serve already materialized programs ignore `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or decoded.
    async fn fetch_programs(&self, reference: DateTime<Utc>) -> Result<Vec<Program>>;
}
