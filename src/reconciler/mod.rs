//! The reconciler: the twelve-step driver that converges a vault's lock
//! file against the tracker and the filesystem of every target client.
//!
//! Callers own cancellation and the overall run deadline: wrap
//! [`reconcile`] in `tokio::time::timeout` and pass a [`FetchContext`]
//! whose `cancelled` flag is set from the same token, so a timeout and an
//! explicit cancel degrade the same way.

use crate::asset::Asset;
use crate::bundle::Bundle;
use crate::cache::{Cache, VaultKey};
use crate::client::{ClientRegistry, InstallContext, UninstallRequest};
use crate::config::{GlobalConfig, RuntimeConfig};
use crate::core::{ClientId, VaultError};
use crate::downloader;
use crate::hookmode::HookResponse;
use crate::lockfile::LockFile;
use crate::orchestrator::{self, PlannedInstall};
use crate::scope::Scope;
use crate::tracker::{Tracker, TrackerKey, needs_install};
use crate::vault::{FetchContext, VaultBackend};
use anyhow::{Result, bail};
use std::collections::HashSet;
use tracing::{info, warn};

/// Everything the reconciler needs for one run. Borrowed, not owned: the
/// caller (the `install` CLI command) assembles this from the loaded lock
/// file, the client registry, and the detected context.
pub struct ReconcileInput<'a> {
    /// The parsed, validated lock file.
    pub lock_file: &'a LockFile,
    /// Every known client implementation.
    pub registry: &'a ClientRegistry,
    /// Clients detected as present on this machine.
    pub detected_clients: Vec<ClientId>,
    /// Persisted global configuration.
    pub config: &'a GlobalConfig,
    /// This invocation's resolved flags.
    pub runtime: &'a RuntimeConfig,
    /// The current scope context (global, or inside a detected repo).
    pub context: Scope,
    /// The directory installs resolve relative to.
    pub target_dir: std::path::PathBuf,
    /// The vault backend assets are fetched from.
    pub backend: &'a dyn VaultBackend,
    /// The local bundle/lockfile cache.
    pub cache: &'a Cache,
    /// This vault's cache key.
    pub vault_key: &'a VaultKey,
    /// Raw hook payload from stdin, in hook mode.
    pub hook_payload: Option<serde_json::Value>,
}

/// The outcome of one reconcile run.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Asset names that installed successfully on at least one client.
    pub installed: Vec<String>,
    /// `(asset, client, error)` triples for installs that failed.
    pub failed_installs: Vec<(String, ClientId, String)>,
    /// Asset names removed by cleanup.
    pub removed: Vec<String>,
    /// Non-fatal conditions surfaced to the user as warnings.
    pub warnings: Vec<String>,
    /// Set only in hook mode: the single JSON document to emit on stdout.
    pub hook_response: Option<HookResponse>,
}

impl ReconcileReport {
    /// True if nothing failed outright (cleanup/bootstrap warnings don't
    /// count - only per-asset-per-client install failures do, per spec
    /// section 7).
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failed_installs.is_empty()
    }
}

/// Run one reconcile pass, mutating `tracker` in place and saving it
/// best-effort at the end.
pub async fn reconcile(input: ReconcileInput<'_>, tracker: &mut Tracker) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    // --- Step 1: target selection -----------------------------------
    let mut targets = input.detected_clients.clone();
    targets.retain(|c| !input.config.is_force_disabled(c));
    for forced in &input.config.force_enabled_clients {
        if !targets.contains(forced) {
            targets.push(forced.clone());
        }
    }
    if let Some(restrict) = &input.runtime.target_clients {
        targets.retain(|c| restrict.contains(c));
        if targets.is_empty() {
            bail!(VaultError::EmptyClientIntersection);
        }
    }
    if targets.is_empty() {
        bail!(VaultError::NoClients);
    }

    let current_repo_url = input.context.repo_url().map(str::to_string);
    let install_ctx =
        InstallContext { target_dir: input.target_dir.clone(), current_repo_url: current_repo_url.clone() };

    let supports = |client_id: &ClientId, asset: &Asset| {
        input
            .registry
            .get(client_id)
            .is_some_and(|c| c.supports_kind(asset.kind) && asset.matches_client(client_id))
    };

    // --- Step 2: applicability filter --------------------------------
    let applicable: Vec<String> = input
        .lock_file
        .assets
        .iter()
        .filter(|a| targets.iter().any(|t| supports(t, a)) && a.applies_to(&input.context))
        .map(|a| a.name.clone())
        .collect();

    // --- Step 3: dependency expansion + toposort ---------------------
    let resolved = crate::lockfile::resolve(&input.lock_file.assets, &applicable)
        .map_err(|e| VaultError::DependencyCycle { cycle: e.cycle.join(" -> ") })?;

    let applicable_set: HashSet<&str> = applicable.iter().map(String::as_str).collect();
    for asset in &resolved {
        if applicable_set.contains(asset.name.as_str()) {
            continue;
        }
        let supported = targets.iter().any(|t| supports(t, asset));
        if !(supported && asset.applies_to(&input.context)) {
            let dependent = resolved
                .iter()
                .find(|a| a.dependencies.contains(&asset.name))
                .map_or_else(|| asset.name.clone(), |a| a.name.clone());
            bail!(VaultError::UnsatisfiableDependency { dependent, dependency: asset.name.clone() });
        }
    }

    // --- Step 4: hook-mode fast path ----------------------------------
    if input.runtime.hook_mode {
        if let Some(client_id) = &input.runtime.hook_client_id {
            if let Some(client) = input.registry.get(client_id) {
                if !client.should_install(&install_ctx, input.hook_payload.as_ref()) {
                    report.hook_response = Some(HookResponse::fast_path());
                    return Ok(report);
                }
            }
        }
    }

    // --- Step 5: repair (optional) -------------------------------------
    if input.runtime.repair {
        repair(&input, &resolved, &targets, &install_ctx, tracker).await;
    }

    // --- Step 6: diff ---------------------------------------------------
    let mut to_download: Vec<Asset> = Vec::new();
    let mut seen_download = HashSet::new();
    for asset in &resolved {
        let desired_clients: Vec<ClientId> =
            targets.iter().filter(|t| supports(t, asset)).cloned().collect();
        for scope in install_scopes_for_current_repo(asset, &current_repo_url) {
            let key = TrackerKey::new(asset.name.clone(), &scope);
            if needs_install(tracker, &key, &asset.version, &desired_clients)
                && seen_download.insert(asset.name.clone())
            {
                to_download.push(asset.clone());
            }
        }
    }

    // --- Step 7: cleanup -------------------------------------------------
    let lock_names: HashSet<&str> = input.lock_file.assets.iter().map(|a| a.name.as_str()).collect();
    let stale: Vec<_> = tracker
        .all()
        .iter()
        .filter(|r| {
            let recorded_global = r.repository.is_empty();
            let matches_context = recorded_global
                || (Some(r.repository.as_str()) == current_repo_url.as_deref()
                    && r.path == input.context.path());
            matches_context && !lock_names.contains(r.name.as_str())
        })
        .cloned()
        .collect();

    for record in &stale {
        let scope = if record.repository.is_empty() {
            Scope::Global
        } else if record.path.is_empty() {
            Scope::Repository { repo_url: record.repository.clone() }
        } else {
            Scope::Path { repo_url: record.repository.clone(), repo_path: record.path.clone() }
        };
        let mut all_uninstalled = true;
        for client_id in &record.clients {
            if let Some(client) = input.registry.get(client_id) {
                let request =
                    UninstallRequest { name: record.name.clone(), kind: record.kind, scope: scope.clone() };
                let response = client.uninstall(&install_ctx, &request).await;
                if let crate::client::InstallStatus::Failed { error } = response.status {
                    all_uninstalled = false;
                    report.warnings.push(format!(
                        "cleanup: {} failed to uninstall '{}': {error}",
                        client_id, record.name
                    ));
                }
            }
        }
        if all_uninstalled {
            tracker.remove(&TrackerKey { name: record.name.clone(), repository: record.repository.clone(), path: record.path.clone() });
            report.removed.push(record.name.clone());
        }
    }

    // --- Step 8: download --------------------------------------------
    let attempted = to_download.len();
    let download_report = downloader::download_bundles(
        input.backend,
        input.cache,
        input.vault_key,
        to_download,
        &FetchContext::default(),
        downloader::DEFAULT_MAX_CONCURRENCY,
    )
    .await;

    if attempted > 0 && download_report.successes.is_empty() {
        bail!("all {attempted} bundle download(s) failed; see warnings for per-asset errors");
    }
    for failure in &download_report.failures {
        report.warnings.push(format!("download failed for '{}': {}", failure.asset.name, failure.error));
    }

    let mut opened: Vec<(Asset, Bundle)> = Vec::new();
    for success in download_report.successes {
        match Bundle::open(success.bytes) {
            Ok(bundle) => opened.push((success.asset, bundle)),
            Err(error) => report.warnings.push(format!("invalid bundle for '{}': {error}", success.asset.name)),
        }
    }

    // --- Step 9: install -------------------------------------------------
    let mut planned: Vec<PlannedInstall<'_>> = Vec::new();
    for (asset, bundle) in &opened {
        for scope in install_scopes_for_current_repo(asset, &current_repo_url) {
            planned.push(PlannedInstall { asset, bundle, scope });
        }
    }
    let outcomes = orchestrator::install_all(input.registry, &install_ctx, &targets, &planned).await;

    let mut installed_names = HashSet::new();
    for outcome in outcomes {
        for (name, status) in outcome.results {
            match status {
                crate::client::InstallStatus::Success => {
                    installed_names.insert(name);
                }
                crate::client::InstallStatus::Failed { error } => {
                    report.failed_installs.push((name, outcome.client_id.clone(), error));
                }
                crate::client::InstallStatus::Skipped { .. } => {}
            }
        }
    }
    report.installed = installed_names.into_iter().collect();

    // --- Step 10: tracker update ------------------------------------
    for asset in &resolved {
        let desired_clients: Vec<ClientId> =
            targets.iter().filter(|t| supports(t, asset)).cloned().collect();
        for scope in install_scopes_for_current_repo(asset, &current_repo_url) {
            tracker.upsert(crate::tracker::InstalledAsset {
                name: asset.name.clone(),
                version: asset.version.clone(),
                kind: asset.kind,
                repository: scope.repo_url().unwrap_or_default().to_string(),
                path: scope.path().to_string(),
                clients: desired_clients.clone(),
                config: Default::default(),
            });
        }
    }
    if let Err(e) = tracker.save() {
        warn!(%e, "failed to save tracker; next run will re-diff");
        report.warnings.push(format!("failed to save tracker: {e}"));
    }

    // --- Step 11: ambient support & bootstrap ------------------------
    let bootstrap_targets: Vec<&ClientId> = if input.runtime.hook_mode {
        input.runtime.hook_client_id.as_ref().into_iter().collect()
    } else {
        targets.iter().collect()
    };
    for client_id in bootstrap_targets {
        let Some(client) = input.registry.get(client_id) else { continue };
        if let Err(e) = client.ensure_asset_support(&install_ctx, &input.context).await {
            report.warnings.push(format!("{client_id}: failed to ensure asset support: {e}"));
            continue;
        }
        let mut seen_keys = HashSet::new();
        let mut enabled = Vec::new();
        for option in client.get_bootstrap_options(&install_ctx) {
            if !seen_keys.insert(option.key.clone()) {
                continue;
            }
            if input.config.bootstrap_decision(&option.key) == Some(true) {
                enabled.push(option.key);
            }
        }
        if let Err(e) = client.install_bootstrap(&install_ctx, &enabled).await {
            report.warnings.push(format!("{client_id}: bootstrap install failed: {e}"));
        }
    }

    // --- Step 12: report -----------------------------------------------
    if input.runtime.hook_mode {
        if report.succeeded() {
            if let Some(client_id) = &input.runtime.hook_client_id {
                crate::client::record_session_seen(client_id, &install_ctx, input.hook_payload.as_ref());
            }
        }
        report.hook_response = Some(HookResponse::for_installed(&report.installed));
    } else {
        info!(
            installed = report.installed.len(),
            removed = report.removed.len(),
            failed = report.failed_installs.len(),
            "reconcile complete"
        );
    }

    Ok(report)
}

/// An asset's declared install scopes, narrowed to the ones this process
/// can actually act on: `Global`, or scopes whose repo matches the current
/// context. An asset may declare scopes for repos we have no filesystem
/// access to in this invocation; those are silently skipped (see the
/// Open Question entry in `DESIGN.md`).
fn install_scopes_for_current_repo(asset: &Asset, current_repo_url: &Option<String>) -> Vec<Scope> {
    asset
        .install_scopes()
        .into_iter()
        .filter(|scope| match scope {
            Scope::Global => true,
            Scope::Repository { repo_url } | Scope::Path { repo_url, .. } => {
                current_repo_url.as_deref() == Some(repo_url.as_str())
            }
        })
        .collect()
}

/// Step 5: compare the tracker's recorded state against what `verify`
/// reports for every (asset, client, scope) triple, dropping clients (or
/// whole entries) that drifted so step 6 re-installs them.
async fn repair(
    input: &ReconcileInput<'_>,
    resolved: &[Asset],
    targets: &[ClientId],
    install_ctx: &InstallContext,
    tracker: &mut Tracker,
) {
    let current_repo_url = input.context.repo_url().map(str::to_string);
    for asset in resolved {
        for scope in install_scopes_for_current_repo(asset, &current_repo_url) {
            let key = TrackerKey::new(asset.name.clone(), &scope);
            let Some(record) = tracker.find(&key).cloned() else { continue };

            if record.version != asset.version {
                tracker.remove(&key);
                continue;
            }

            let mut drifted_clients = Vec::new();
            for client_id in &record.clients {
                let Some(client) = input.registry.get(client_id) else { continue };
                let results = client.verify(install_ctx, &[(asset, asset.version.as_str())], &scope).await;
                let matches = results
                    .iter()
                    .find(|(name, _)| name == &asset.name)
                    .is_some_and(|(_, r)| matches!(r, crate::client::VerifyResult::Matches));
                if !matches {
                    drifted_clients.push(client_id.clone());
                }
            }
            if drifted_clients.is_empty() {
                continue;
            }
            let remaining: Vec<ClientId> =
                record.clients.iter().filter(|c| !drifted_clients.contains(c)).cloned().collect();
            if remaining.is_empty() {
                tracker.remove(&key);
            } else {
                let mut updated = record;
                updated.clients = remaining;
                tracker.upsert(updated);
            }
        }
    }
    let _ = targets;
}
