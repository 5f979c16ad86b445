//! Guide data sources for opentv.
//!
//! Fetches channels and programs from the HTTP API, falls back to static
//! JSON files when the API is unavailable, and coalesces concurrent
//! refreshes into a single in-flight load.

mod api;
mod client;
mod files;
mod loader;
mod refresher;

#[allow(clippy::module_name_repetitions)]
pub use api::{GuideSource, LocalGuideSource};
pub use client::{GuideApiClient, GuideApiClientBuilder};
pub use files::{CHANNELS_FILE, PROGRAMS_FILE, StaticGuideFiles};
pub use loader::{GuideLoader, LoadedGuide, Sourced};
pub use refresher::GuideRefresher;
