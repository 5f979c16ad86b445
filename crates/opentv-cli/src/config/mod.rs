//! Application configuration module.
//!
//! Manages the TOML config file holding the guide source, server and EPG
//! settings.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::AppConfig;
pub use paths::{resolve_bind_addr, resolve_config_path};
