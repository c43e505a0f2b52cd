//! Per-assistant capability surface: each client
//! implements install/uninstall/verify/bootstrap against its own
//! directory layout and config formats, behind one shared trait so the
//! [`crate::orchestrator`] and [`crate::reconciler`] never special-case a
//! specific assistant.
//!
//! Implemented as a registry of trait objects (composition), not a class
//! hierarchy: see [`ClientRegistry`].

pub mod claude_code;
pub mod common;
pub mod copilot;
pub mod cursor;
pub mod gemini;
pub mod generic;

use crate::asset::{Asset, AssetKind};
use crate::bundle::Bundle;
use crate::core::ClientId;
use crate::scope::Scope;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// Runtime context an install/uninstall/verify call executes under.
#[derive(Debug, Clone)]
pub struct InstallContext {
    /// The working directory the reconcile was run from (or `--target`).
    pub target_dir: PathBuf,
    /// The normalized repo URL of the current context, if inside a repo.
    pub current_repo_url: Option<String>,
}

/// One asset ready to be installed: its declaration plus its downloaded
/// bundle.
pub struct InstallItem<'a> {
    /// The lock file declaration.
    pub asset: &'a Asset,
    /// The opened bundle.
    pub bundle: &'a Bundle,
}

/// Per-asset, per-client installation outcome. A tagged sum, never a
/// sentinel string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    /// Installed successfully.
    Success,
    /// Installation failed; carries a message for the report.
    Failed {
        /// Human-readable failure reason.
        error: String,
    },
    /// Deliberately not installed (e.g. kind unsupported for this client).
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// The result of one client's `install` call over a batch of assets.
#[derive(Debug, Clone)]
pub struct InstallResponse {
    /// Per-asset results, one per attempted asset.
    pub results: Vec<AssetInstallResult>,
}

/// One asset's outcome within an [`InstallResponse`].
#[derive(Debug, Clone)]
pub struct AssetInstallResult {
    /// Asset name.
    pub asset_name: String,
    /// Outcome.
    pub status: InstallStatus,
}

impl InstallResponse {
    /// True if every result is [`InstallStatus::Success`].
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| matches!(r.status, InstallStatus::Success))
    }

    /// Count of [`InstallStatus::Failed`] results.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| matches!(r.status, InstallStatus::Failed { .. })).count()
    }
}

/// A request to uninstall one asset at one scope.
#[derive(Debug, Clone)]
pub struct UninstallRequest {
    /// Asset name.
    pub name: String,
    /// Asset kind, so the client knows which handler to use.
    pub kind: AssetKind,
    /// The scope it was installed under.
    pub scope: Scope,
}

/// Result of an uninstall attempt.
#[derive(Debug, Clone)]
pub struct UninstallResponse {
    /// Whether the client successfully removed the asset (or it was
    /// already absent, which also counts as success).
    pub status: InstallStatus,
}

/// Result of verifying one asset's on-disk state against what install
/// would produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Filesystem state matches the declared version.
    Matches,
    /// Nothing is installed.
    Missing,
    /// Something is installed but at a different version or otherwise
    /// inconsistent with what install would produce.
    Mismatched {
        /// Human-readable description of the mismatch.
        reason: String,
    },
}

/// A bootstrap option a client exposes: an ambient hook/config entry the
/// user can accept or decline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOption {
    /// Stable key used for dedup and the user's accept/decline map.
    pub key: String,
    /// Human-readable description shown when prompting (out of scope
    /// here; carried for the out-of-scope interactive prompter).
    pub description: String,
}

/// The per-assistant capability surface.
#[async_trait]
pub trait Client: Send + Sync {
    /// Stable identifier, e.g. `"claude-code"`.
    fn id(&self) -> ClientId;

    /// Human-facing name, e.g. `"Claude Code"`.
    fn display_name(&self) -> &str;

    /// Does this client support installing assets of `kind`?
    fn supports_kind(&self, kind: AssetKind) -> bool;

    /// Install a batch of bundles at one scope.
    async fn install(
        &self,
        ctx: &InstallContext,
        items: &[InstallItem<'_>],
        scope: &Scope,
    ) -> InstallResponse;

    /// Uninstall one asset from one scope.
    async fn uninstall(&self, ctx: &InstallContext, request: &UninstallRequest) -> UninstallResponse;

    /// Check whether the filesystem already reflects what installing
    /// `assets` at `scope` would produce.
    async fn verify(
        &self,
        ctx: &InstallContext,
        assets: &[(&Asset, &str)],
        scope: &Scope,
    ) -> Vec<(String, VerifyResult)>;

    /// Idempotently create whatever ambient files this client needs to
    /// discover assets at all (e.g. a shared-instructions marker).
    async fn ensure_asset_support(&self, ctx: &InstallContext, scope: &Scope) -> anyhow::Result<()>;

    /// The client's own bootstrap options (hooks, settings entries) it
    /// would like to offer installing, independent of the vault's own.
    fn get_bootstrap_options(&self, ctx: &InstallContext) -> Vec<BootstrapOption>;

    /// Install the bootstrap options named in `enabled`.
    async fn install_bootstrap(&self, ctx: &InstallContext, enabled: &[String]) -> anyhow::Result<()>;

    /// Hook-mode fast path: has this client already handled the current
    /// session? `hook_payload` is whatever JSON the client sent on stdin.
    fn should_install(&self, ctx: &InstallContext, hook_payload: Option<&serde_json::Value>) -> bool;

    /// Resolve the filesystem path an asset would live at, for
    /// reverse-import flows (contract only - out of scope here).
    fn get_asset_path(
        &self,
        ctx: &InstallContext,
        name: &str,
        kind: AssetKind,
        scope: &Scope,
    ) -> Option<PathBuf>;
}

/// Shared hook-mode session dedup check: every standard client uses the
/// same "have I seen this session id before" cache, keyed by client id, so
/// this lives once instead of being reimplemented per client.
///
/// Reads the session id from `hook_payload["conversation_id"]` (falling
/// back to `["session_id"]`). With no payload or no recognizable id, there
/// is no key to dedup on, so this conservatively returns `true` (proceed).
///
/// Read-only: does not mark the session seen. A session is only recorded
/// once the reconcile that followed this check actually succeeds, via
/// [`record_session_seen`] — otherwise a first-seen session whose install
/// fails would be marked done and never retried.
#[must_use]
pub fn common_session_gate(
    client_id: &ClientId,
    _ctx: &InstallContext,
    hook_payload: Option<&serde_json::Value>,
) -> bool {
    let Some(session_id) = session_id_from_payload(hook_payload) else { return true };
    let seen = load_seen_sessions(client_id);
    !seen.iter().any(|s| s == &session_id)
}

/// Record that `client_id` has now successfully handled the session named
/// in `hook_payload`. Called by the reconciler once a run completes
/// without any failed installs, never unconditionally at the top of a run.
pub fn record_session_seen(
    client_id: &ClientId,
    _ctx: &InstallContext,
    hook_payload: Option<&serde_json::Value>,
) {
    let Some(session_id) = session_id_from_payload(hook_payload) else { return };
    let Ok(cache_dir) = crate::utils::fs::cache_dir() else { return };
    let path = session_cache_path(&cache_dir, client_id);

    let mut seen = load_seen_sessions(client_id);
    if seen.iter().any(|s| s == &session_id) {
        return;
    }
    seen.push(session_id);
    // Cap so the file doesn't grow unboundedly across a long-lived machine.
    if seen.len() > 256 {
        seen.drain(0..seen.len() - 256);
    }
    let _ = crate::utils::fs::atomic_write_json(&path, &seen);
}

fn session_id_from_payload(hook_payload: Option<&serde_json::Value>) -> Option<String> {
    let payload = hook_payload?;
    payload
        .get("conversation_id")
        .or_else(|| payload.get("session_id"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

fn session_cache_path(cache_dir: &std::path::Path, client_id: &ClientId) -> std::path::PathBuf {
    cache_dir.join("sessions").join(format!("{}.json", client_id.as_str()))
}

fn load_seen_sessions(client_id: &ClientId) -> Vec<String> {
    let Ok(cache_dir) = crate::utils::fs::cache_dir() else { return Vec::new() };
    let path = session_cache_path(&cache_dir, client_id);
    std::fs::read(&path).ok().and_then(|bytes| serde_json::from_slice(&bytes).ok()).unwrap_or_default()
}

/// A registry of known clients, queried by id.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Box<dyn Client>>,
}

impl ClientRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { clients: HashMap::new() }
    }

    /// Register a client, keyed by its own id.
    pub fn register(&mut self, client: Box<dyn Client>) {
        self.clients.insert(client.id(), client);
    }

    /// Look up a client by id.
    #[must_use]
    pub fn get(&self, id: &ClientId) -> Option<&dyn Client> {
        self.clients.get(id).map(AsRef::as_ref)
    }

    /// Every registered client id.
    #[must_use]
    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().cloned().collect()
    }

    /// The full standard set: Claude Code, Cursor, GitHub Copilot, Gemini
    /// Code Assist.
    #[must_use]
    pub fn with_standard_clients() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(claude_code::ClaudeCode::new()));
        reg.register(Box::new(cursor::Cursor::new()));
        reg.register(Box::new(copilot::Copilot::new()));
        reg.register(Box::new(gemini::Gemini::new()));
        reg
    }
}
