//! `vaultsync install`: the reconciler entry point.

use crate::cache::{Cache, VaultKey};
use crate::client::ClientRegistry;
use crate::config::{GlobalConfig, RuntimeConfig};
use crate::core::{ClientId, VaultError};
use crate::lockfile::LockFile;
use crate::reconciler::{self, ReconcileInput};
use crate::scope::Scope;
use crate::tracker::Tracker;
use crate::vault::{FetchContext, LocalPathVault, VaultBackend};
use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::PathBuf;

/// Install (and reconcile) assets from the vault into every detected
/// assistant.
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Path to the vault (a local directory containing `vault.lock`).
    ///
    /// Falls back to the configured default vault if omitted.
    #[arg(long)]
    pub vault: Option<PathBuf>,

    /// Hook mode: emit exactly one JSON line on stdout, no other output.
    #[arg(long)]
    pub hook_mode: bool,

    /// The client id that triggered this run (required with `--hook-mode`).
    #[arg(long)]
    pub client: Option<String>,

    /// Re-verify the filesystem against the tracker before diffing,
    /// dropping drifted entries so they reinstall.
    #[arg(long)]
    pub repair: bool,

    /// Substitute this directory for the current working directory.
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Restrict installation to this comma-separated client id set.
    #[arg(long, value_delimiter = ',')]
    pub clients: Option<Vec<String>>,
}

impl InstallArgs {
    /// Run the reconciler with these arguments.
    pub async fn execute(self) -> Result<()> {
        let runtime = RuntimeConfig {
            log_level: None,
            hook_mode: self.hook_mode,
            hook_client_id: self.client.as_deref().map(ClientId::new),
            repair: self.repair,
            target_dir: self.target.clone(),
            target_clients: self.clients.clone().map(|ids| ids.into_iter().map(ClientId::new).collect()),
        };

        if runtime.hook_mode && runtime.hook_client_id.is_none() {
            bail!(VaultError::ConfigInvalid {
                reason: "--hook-mode requires --client <id>".to_string()
            });
        }

        let config_path = GlobalConfig::default_path()?;
        let config = GlobalConfig::load(&config_path)?;

        let target_dir = runtime.effective_target_dir()?;
        let (repo_url, repo_path) = crate::utils::git::current_repo_context(&target_dir).await;
        let context = Scope::current(repo_url.as_deref(), repo_path.as_deref());

        let vault_root = self
            .vault
            .clone()
            .or_else(|| config.default_vault.clone().map(PathBuf::from))
            .context("no vault location given; pass --vault or set default_vault in config.toml")?;
        let backend = LocalPathVault::new(vault_root);

        let cache = Cache::new(crate::utils::fs::cache_dir()?);
        crate::cache::ensure_layout(&crate::utils::fs::cache_dir()?).ok();
        let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

        let fetch_ctx = FetchContext::default();
        let known_etag = cache.load_etag(&vault_key);
        let lock_bytes = match backend.get_lock_file(&fetch_ctx, known_etag.as_deref()).await {
            Ok(crate::vault::LockFileFetch::Fresh { bytes, etag }) => {
                cache.save_lockfile(&vault_key, &bytes);
                if let Some(etag) = etag {
                    cache.save_etag(&vault_key, &etag);
                }
                bytes
            }
            Ok(crate::vault::LockFileFetch::NotModified) => cache
                .load_lockfile(&vault_key)
                .context("lock file reported unmodified but nothing is cached")?,
            Err(error) => match cache.load_lockfile(&vault_key) {
                Some(bytes) => {
                    tracing::warn!(%error, "vault unreachable, using cached lock file");
                    bytes
                }
                None => bail!(VaultError::VaultUnreachable { reason: error.to_string() }),
            },
        };

        let lock_file = LockFile::parse(&lock_bytes)?;
        lock_file.validate().map_err(|e| VaultError::LockFileInvalid { reason: e.to_string() })?;

        let registry = ClientRegistry::with_standard_clients();
        // Every client vaultsync knows how to install for is presumed
        // present; actual machine-local presence detection is out of
        // scope, so membership is governed entirely by config
        // force-enable/disable and `--clients`.
        let detected_clients = registry.ids();

        let tracker_path = Tracker::default_path()?;
        let mut tracker = Tracker::load(&tracker_path)?.with_path(tracker_path);

        let hook_payload =
            if runtime.hook_mode { read_hook_payload_from_stdin() } else { None };

        let input = ReconcileInput {
            lock_file: &lock_file,
            registry: &registry,
            detected_clients,
            config: &config,
            runtime: &runtime,
            context,
            target_dir,
            backend: &backend,
            cache: &cache,
            vault_key: &vault_key,
            hook_payload,
        };

        let report = reconciler::reconcile(input, &mut tracker).await?;

        if let Some(hook_response) = &report.hook_response {
            hook_response.emit()?;
        } else {
            print_human_report(&report);
        }

        if !report.succeeded() {
            bail!(VaultError::PartialInstallFailure {
                failed: report.failed_installs.len(),
                attempted: report.failed_installs.len() + report.installed.len(),
            });
        }
        Ok(())
    }
}

fn read_hook_payload_from_stdin() -> Option<serde_json::Value> {
    use std::io::Read;
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).ok()?;
    serde_json::from_str(&buf).ok()
}

fn print_human_report(report: &reconciler::ReconcileReport) {
    use colored::Colorize;
    for name in &report.installed {
        println!("{} installed {name}", "+".green().bold());
    }
    for name in &report.removed {
        println!("{} removed {name}", "-".red().bold());
    }
    for (name, client, error) in &report.failed_installs {
        eprintln!("{} {name} on {client}: {error}", "failed:".red().bold());
    }
    for warning in &report.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    if report.installed.is_empty() && report.removed.is_empty() && report.failed_installs.is_empty() {
        println!("already up to date");
    }
}
