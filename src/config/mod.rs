//! Global and per-invocation configuration.
//!
//! `GlobalConfig` is the persisted `~/.vaultsync/config.toml` the user (or a
//! future `config` subcommand, out of scope here) edits directly.
//! `RuntimeConfig` is the CLI-args-to-config bridge: translated once in
//! [`crate::cli::Cli::build_config`] and threaded through execution
//! instead of mutating the environment, so tests can inject it without
//! global state.

use crate::core::ClientId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Persisted global configuration, one per machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Client ids forced on even if not detected on this machine.
    #[serde(default)]
    pub force_enabled_clients: Vec<ClientId>,
    /// Client ids forced off even if detected.
    #[serde(default)]
    pub force_disabled_clients: Vec<ClientId>,
    /// User's accept/decline decisions for bootstrap options, keyed by
    /// option key.
    #[serde(default)]
    pub bootstrap_decisions: HashMap<String, bool>,
    /// Default vault location, if the user hasn't passed one explicitly.
    #[serde(default)]
    pub default_vault: Option<String>,
}

impl GlobalConfig {
    /// Load from `path`, or return the default (empty) config if the file
    /// doesn't exist yet - there's no `init` step required before the first
    /// `install` run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// The default config path: `$XDG_CONFIG_HOME/vaultsync/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::utils::fs::config_dir()?.join("config.toml"))
    }

    /// Save atomically as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("failed to serialize config")?;
        crate::utils::fs::safe_write(path, &text)
    }

    /// Is `client` force-disabled?
    #[must_use]
    pub fn is_force_disabled(&self, client: &ClientId) -> bool {
        self.force_disabled_clients.contains(client)
    }

    /// Does the user want `option_key` installed, decided or not (`None`
    /// means "hasn't been asked")?
    #[must_use]
    pub fn bootstrap_decision(&self, option_key: &str) -> Option<bool> {
        self.bootstrap_decisions.get(option_key).copied()
    }
}

/// Per-invocation configuration, derived once from CLI flags plus the
/// environment and threaded through execution instead of re-read from
/// `std::env` at each call site.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// `Some("debug")` under `--verbose`; `None` otherwise (logging setup
    /// decides the rest by consulting `RUST_LOG` itself).
    pub log_level: Option<String>,
    /// Hook mode: emit exactly one JSON line, no human-readable output.
    pub hook_mode: bool,
    /// The client id that triggered this run, required in hook mode.
    pub hook_client_id: Option<ClientId>,
    /// Repair filesystem drift against the tracker before diffing.
    pub repair: bool,
    /// Substitute this directory for the current working directory.
    pub target_dir: Option<PathBuf>,
    /// Restrict installation to this client id set, if given.
    pub target_clients: Option<Vec<ClientId>>,
}

impl RuntimeConfig {
    /// The effective working directory: `target_dir` if set, otherwise the
    /// process's actual current directory.
    pub fn effective_target_dir(&self) -> Result<PathBuf> {
        match &self.target_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("failed to determine current directory"),
        }
    }
}
