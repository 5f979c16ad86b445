//! Config file and listen address resolution.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Resolves the config file path.
///
/// - If `dir` is `Some`, returns `{dir}/config.toml`.
/// - Otherwise returns `~/.config/opentv/config.toml`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join("config.toml"));
    }

    let home = std::env::var("HOME").context("HOME environment variable is not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("opentv")
        .join("config.toml"))
}

/// Resolves the server listen address.
///
/// `port` (the `PORT` environment variable) replaces the port of `bind`
/// when set.
///
/// # Errors
///
/// Returns an error if `bind` is not a socket address or `port` is not a
/// valid port number.
pub fn resolve_bind_addr(bind: &str, port: Option<&str>) -> Result<SocketAddr> {
    let mut addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;

    if let Some(port) = port {
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("invalid PORT value {port}"))?;
        addr.set_port(port);
    }

    Ok(addr)
}
