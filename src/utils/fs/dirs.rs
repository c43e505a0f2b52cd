//! Platform-appropriate cache and config directory resolution.
//!
//! Honors `XDG_CACHE_HOME`/`XDG_CONFIG_HOME` when set, falling back to the
//! `dirs` crate's OS-appropriate defaults otherwise.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "vaultsync";

/// `$XDG_CACHE_HOME/vaultsync` or the OS-appropriate equivalent.
pub fn cache_dir() -> Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return Ok(PathBuf::from(xdg).join(APP_NAME));
    }
    dirs::cache_dir()
        .map(|d| d.join(APP_NAME))
        .context("could not determine a cache directory for this platform")
}

/// `$XDG_CONFIG_HOME/vaultsync` or the OS-appropriate equivalent.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join(APP_NAME));
    }
    dirs::config_dir()
        .map(|d| d.join(APP_NAME))
        .context("could not determine a config directory for this platform")
}
