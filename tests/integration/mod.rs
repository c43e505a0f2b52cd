//! End-to-end reconciler scenarios, driven against real client
//! implementations writing into temp directories - no mocked `Client`.

use vaultsync_cli::asset::AssetKind;
use vaultsync_cli::cache::{Cache, VaultKey};
use vaultsync_cli::client::ClientRegistry;
use vaultsync_cli::config::{GlobalConfig, RuntimeConfig};
use vaultsync_cli::core::ClientId;
use vaultsync_cli::lockfile::LockFile;
use vaultsync_cli::reconciler::{self, ReconcileInput};
use vaultsync_cli::scope::Scope;
use vaultsync_cli::test_utils::fixtures::{AssetFixture, LockFileFixture, skill_bundle};
use vaultsync_cli::tracker::Tracker;
use vaultsync_cli::vault::{LocalPathVault, VaultBackend};

fn base_input<'a>(
    lock_file: &'a LockFile,
    registry: &'a ClientRegistry,
    config: &'a GlobalConfig,
    runtime: &'a RuntimeConfig,
    backend: &'a dyn VaultBackend,
    cache: &'a Cache,
    vault_key: &'a VaultKey,
    target_dir: std::path::PathBuf,
) -> ReconcileInput<'a> {
    ReconcileInput {
        lock_file,
        registry,
        detected_clients: registry.ids(),
        config,
        runtime,
        context: Scope::Global,
        target_dir,
        backend,
        cache,
        vault_key,
        hook_payload: None,
    }
}

/// A fresh run installs a globally-scoped skill into every standard
/// client and records it in the tracker.
#[tokio::test]
async fn fresh_install_lands_the_asset_in_every_client() {
    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    let bundle_bytes = skill_bundle("review-checklist", "1.0.0");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/review-checklist.zip"), &bundle_bytes).unwrap();

    let asset = AssetFixture::skill("review-checklist").version("1.0.0").build();
    let lock_file = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let runtime = RuntimeConfig::default();
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let input = base_input(
        &lock_file,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );

    let report = reconciler::reconcile(input, &mut tracker).await.unwrap();

    assert!(report.succeeded(), "unexpected failures: {:?}", report.failed_installs);
    assert_eq!(report.installed, vec!["review-checklist".to_string()]);
    let key = vaultsync_cli::tracker::TrackerKey::new("review-checklist", &Scope::Global);
    assert!(tracker.find(&key).is_some());
}

/// A second run with nothing changed installs nothing: the tracker
/// already reflects the desired state.
#[tokio::test]
async fn unchanged_second_run_is_a_no_op() {
    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();
    let bundle_bytes = skill_bundle("review-checklist", "1.0.0");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/review-checklist.zip"), &bundle_bytes).unwrap();
    let asset = AssetFixture::skill("review-checklist").version("1.0.0").build();
    let lock_file = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let runtime = RuntimeConfig::default();
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let first = base_input(
        &lock_file,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );
    reconciler::reconcile(first, &mut tracker).await.unwrap();

    let second = base_input(
        &lock_file,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );
    let report = reconciler::reconcile(second, &mut tracker).await.unwrap();

    assert!(report.installed.is_empty());
    assert!(report.removed.is_empty());
    assert!(report.succeeded());
}

/// Removing an asset from the lock file uninstalls it on the next run.
#[tokio::test]
async fn dropping_an_asset_from_the_lock_file_removes_it() {
    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();
    let bundle_bytes = skill_bundle("review-checklist", "1.0.0");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/review-checklist.zip"), &bundle_bytes).unwrap();
    let asset = AssetFixture::skill("review-checklist").version("1.0.0").build();
    let lock_file_v1 = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file_v1.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let runtime = RuntimeConfig::default();
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let first = base_input(
        &lock_file_v1,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );
    reconciler::reconcile(first, &mut tracker).await.unwrap();

    let lock_file_v2 = LockFileFixture::new().build();
    let second = base_input(
        &lock_file_v2,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );
    let report = reconciler::reconcile(second, &mut tracker).await.unwrap();

    assert_eq!(report.removed, vec!["review-checklist".to_string()]);
    let key = vaultsync_cli::tracker::TrackerKey::new("review-checklist", &Scope::Global);
    assert!(tracker.find(&key).is_none());
}

/// An asset with an unresolvable dependency on an asset no target client
/// supports is a hard failure, not a silent skip.
#[tokio::test]
async fn unsatisfiable_dependency_is_an_error() {
    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    let dependency = AssetFixture::skill("only-claude-hook")
        .kind(AssetKind::Hook)
        .for_clients(&["claude-code"])
        .build();
    let dependent =
        AssetFixture::skill("needs-hook").for_clients(&["cursor"]).depends_on("only-claude-hook").build();
    let lock_file = LockFileFixture::new().with_asset(dependency).with_asset(dependent).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let mut runtime = RuntimeConfig::default();
    runtime.target_clients = Some(vec![ClientId::new("cursor")]);
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let input = base_input(
        &lock_file,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );

    let result = reconciler::reconcile(input, &mut tracker).await;
    assert!(result.is_err());
}

/// `--clients` restricts both target selection and the applicability
/// filter: an asset whitelisted to a different client is skipped, not
/// installed anywhere.
#[tokio::test]
async fn client_restriction_narrows_install_targets() {
    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();
    let bundle_bytes = skill_bundle("cursor-only", "1.0.0");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/cursor-only.zip"), &bundle_bytes).unwrap();
    let asset = AssetFixture::skill("cursor-only").for_clients(&["cursor"]).build();
    let lock_file = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let mut runtime = RuntimeConfig::default();
    runtime.target_clients = Some(vec![ClientId::new("claude-code")]);
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let input = base_input(
        &lock_file,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );

    let report = reconciler::reconcile(input, &mut tracker).await.unwrap();
    assert!(report.installed.is_empty());
    assert!(report.succeeded());
}

/// Hook mode with a session the client has already seen takes the fast
/// path: no installs, and a `HookResponse` with `continue: true` and no
/// system message.
///
/// `common_session_gate` persists seen session ids under the real
/// `XDG_CACHE_HOME`, so this test redirects it to a scratch directory and
/// runs `#[serial]` to avoid racing other tests that touch the same
/// environment variable.
#[tokio::test]
#[serial_test::serial(xdg_cache_home)]
async fn hook_mode_repeat_session_takes_the_fast_path() {
    let scratch_cache = tempfile::tempdir().unwrap();
    let previous = std::env::var_os("XDG_CACHE_HOME");
    // SAFETY: serialized by #[serial] against every other test touching XDG_CACHE_HOME.
    unsafe { std::env::set_var("XDG_CACHE_HOME", scratch_cache.path()) };

    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();
    let bundle_bytes = skill_bundle("review-checklist", "1.0.0");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/review-checklist.zip"), &bundle_bytes).unwrap();
    let asset = AssetFixture::skill("review-checklist").version("1.0.0").build();
    let lock_file = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let mut runtime = RuntimeConfig::default();
    runtime.hook_mode = true;
    runtime.hook_client_id = Some(ClientId::new("claude-code"));
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let payload = serde_json::json!({ "conversation_id": "session-1" });
    let input = ReconcileInput {
        lock_file: &lock_file,
        registry: &registry,
        detected_clients: registry.ids(),
        config: &config,
        runtime: &runtime,
        context: Scope::Global,
        target_dir: target_dir.path().to_path_buf(),
        backend: &backend,
        cache: &cache,
        vault_key: &vault_key,
        hook_payload: Some(payload.clone()),
    };
    let first = reconciler::reconcile(input, &mut tracker).await.unwrap();
    assert!(first.hook_response.is_some());

    let input2 = ReconcileInput {
        lock_file: &lock_file,
        registry: &registry,
        detected_clients: registry.ids(),
        config: &config,
        runtime: &runtime,
        context: Scope::Global,
        target_dir: target_dir.path().to_path_buf(),
        backend: &backend,
        cache: &cache,
        vault_key: &vault_key,
        hook_payload: Some(payload),
    };
    let second = reconciler::reconcile(input2, &mut tracker).await.unwrap();
    let response = second.hook_response.unwrap();
    assert!(serde_json::to_string(&response).unwrap().contains("\"continue\":true"));

    // SAFETY: still within the #[serial] section that set this.
    unsafe {
        match &previous {
            Some(value) => std::env::set_var("XDG_CACHE_HOME", value),
            None => std::env::remove_var("XDG_CACHE_HOME"),
        }
    }
}

/// A repo-scoped instruction merges into `AGENTS.md`, not `CLAUDE.md`,
/// when the repo's `CLAUDE.md` already `@`-references it.
#[tokio::test]
async fn repo_scoped_instruction_merges_into_existing_agents_md() {
    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    std::fs::write(target_dir.path().join("CLAUDE.md"), "@AGENTS.md\n").unwrap();
    std::fs::write(target_dir.path().join("AGENTS.md"), "# Existing notes\n").unwrap();

    let bundle_bytes =
        bundle_zip_for_instruction("cross-tool", "1.0.0", "Shared guidance for every assistant.");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/cross-tool.zip"), &bundle_bytes).unwrap();

    let repo_url = "https://github.com/o/r";
    let asset = AssetFixture::skill("cross-tool")
        .kind(AssetKind::Instruction)
        .for_clients(&["claude-code"])
        .scoped_to_repo(repo_url)
        .build();
    let lock_file = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let runtime = RuntimeConfig::default();
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let input = ReconcileInput {
        lock_file: &lock_file,
        registry: &registry,
        detected_clients: registry.ids(),
        config: &config,
        runtime: &runtime,
        context: Scope::Repository { repo_url: repo_url.to_string() },
        target_dir: target_dir.path().to_path_buf(),
        backend: &backend,
        cache: &cache,
        vault_key: &vault_key,
        hook_payload: None,
    };

    let report = reconciler::reconcile(input, &mut tracker).await.unwrap();
    assert!(report.succeeded(), "unexpected failures: {:?}", report.failed_installs);

    let agents_md = std::fs::read_to_string(target_dir.path().join("AGENTS.md")).unwrap();
    assert!(agents_md.contains("Shared guidance for every assistant."));
    assert!(agents_md.contains("# Existing notes"), "pre-existing content must be preserved");

    let claude_md = std::fs::read_to_string(target_dir.path().join("CLAUDE.md")).unwrap();
    assert_eq!(claude_md, "@AGENTS.md\n", "CLAUDE.md must be left untouched");
}

/// A `claude-code-plugin` asset declared with `auto-enable = false`
/// installs and registers the plugin but leaves `enabledPlugins` alone.
///
/// Claude Code's global directory resolves under `$HOME`, so this test
/// redirects `HOME` to a scratch directory rather than writing into the
/// real one, and runs `#[serial]` against every other test doing the same.
#[tokio::test]
#[serial_test::serial(home_dir)]
async fn plugin_with_auto_enable_false_is_not_enabled() {
    let scratch_home = tempfile::tempdir().unwrap();
    let previous_home = std::env::var_os("HOME");
    // SAFETY: serialized by #[serial] against every other test touching HOME.
    unsafe { std::env::set_var("HOME", scratch_home.path()) };

    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    let bundle_bytes = plugin_bundle("manual-plugin", "1.0.0");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/manual-plugin.zip"), &bundle_bytes).unwrap();

    let asset = AssetFixture::skill("manual-plugin")
        .kind(AssetKind::ClaudeCodePlugin)
        .for_clients(&["claude-code"])
        .config("auto-enable", serde_json::json!(false))
        .build();
    let lock_file = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let runtime = RuntimeConfig::default();
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let input = base_input(
        &lock_file,
        &registry,
        &config,
        &runtime,
        &backend,
        &cache,
        &vault_key,
        target_dir.path().to_path_buf(),
    );

    let report = reconciler::reconcile(input, &mut tracker).await.unwrap();
    assert!(report.succeeded(), "unexpected failures: {:?}", report.failed_installs);

    let global_dir = dirs_home_claude_dir();
    let installed_plugins: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(global_dir.join("plugins/installed_plugins.json")).unwrap(),
    )
    .unwrap();
    assert!(installed_plugins["plugins"]["manual-plugin"].is_object());

    let settings_path = global_dir.join("settings.json");
    if settings_path.exists() {
        let settings: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
        let enabled = settings["enabledPlugins"].as_array().cloned().unwrap_or_default();
        assert!(
            !enabled.iter().any(|v| v.as_str() == Some("manual-plugin")),
            "auto-enable=false must not add the plugin to enabledPlugins"
        );
    }

    // SAFETY: still within the #[serial] section that set this.
    unsafe {
        match &previous_home {
            Some(value) => std::env::set_var("HOME", value),
            None => std::env::remove_var("HOME"),
        }
    }
}

/// An asset declared with multiple `paths` under one repo installs once
/// per declared path, and never at the repo root.
#[tokio::test]
async fn path_scoped_instruction_fans_out_to_every_declared_path() {
    let vault_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(target_dir.path().join("services/api")).unwrap();
    std::fs::create_dir_all(target_dir.path().join("services/worker")).unwrap();

    let bundle_bytes =
        bundle_zip_for_instruction("service-guidelines", "1.0.0", "Follow the service checklist.");
    std::fs::create_dir_all(vault_dir.path().join("bundles")).unwrap();
    std::fs::write(vault_dir.path().join("bundles/service-guidelines.zip"), &bundle_bytes).unwrap();

    let repo_url = "https://github.com/o/r";
    let asset = AssetFixture::skill("service-guidelines")
        .kind(AssetKind::Instruction)
        .for_clients(&["claude-code"])
        .scoped_to_path(repo_url, "services/api/")
        .scoped_to_path(repo_url, "services/worker/")
        .build();
    let lock_file = LockFileFixture::new().with_asset(asset).build();
    std::fs::write(vault_dir.path().join("vault.lock"), lock_file.serialize().unwrap()).unwrap();

    let registry = ClientRegistry::with_standard_clients();
    let config = GlobalConfig::default();
    let runtime = RuntimeConfig::default();
    let backend = LocalPathVault::new(vault_dir.path().to_path_buf());
    let cache = Cache::new(tempfile::tempdir().unwrap().path().to_path_buf());
    let vault_key = VaultKey::new(backend.kind(), &backend.primary_identifier());

    let mut tracker = Tracker::new();
    let input = ReconcileInput {
        lock_file: &lock_file,
        registry: &registry,
        detected_clients: registry.ids(),
        config: &config,
        runtime: &runtime,
        context: Scope::Repository { repo_url: repo_url.to_string() },
        target_dir: target_dir.path().to_path_buf(),
        backend: &backend,
        cache: &cache,
        vault_key: &vault_key,
        hook_payload: None,
    };

    let report = reconciler::reconcile(input, &mut tracker).await.unwrap();
    assert!(report.succeeded(), "unexpected failures: {:?}", report.failed_installs);

    let api_claude_md = std::fs::read_to_string(target_dir.path().join("services/api/CLAUDE.md")).unwrap();
    assert!(api_claude_md.contains("Follow the service checklist."));
    let worker_claude_md =
        std::fs::read_to_string(target_dir.path().join("services/worker/CLAUDE.md")).unwrap();
    assert!(worker_claude_md.contains("Follow the service checklist."));
    assert!(
        !target_dir.path().join("CLAUDE.md").exists(),
        "a path-scoped asset must not land at the repo root"
    );
}

fn bundle_zip_for_instruction(name: &str, version: &str, body: &str) -> Vec<u8> {
    let metadata =
        format!("[asset]\nname = \"{name}\"\ntype = \"instruction\"\nversion = \"{version}\"\n");
    vaultsync_cli::test_utils::fixtures::bundle_zip(&[
        ("metadata.toml", metadata.as_bytes()),
        ("INSTRUCTIONS.md", body.as_bytes()),
    ])
}

fn plugin_bundle(name: &str, version: &str) -> Vec<u8> {
    let metadata =
        format!("[asset]\nname = \"{name}\"\ntype = \"claude-code-plugin\"\nversion = \"{version}\"\n");
    vaultsync_cli::test_utils::fixtures::bundle_zip(&[
        ("metadata.toml", metadata.as_bytes()),
        ("plugin.json", b"{}"),
    ])
}

fn dirs_home_claude_dir() -> std::path::PathBuf {
    dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from(".")).join(".claude")
}

/// Stub commands report "not yet available" instead of silently no-op'ing.
#[test]
fn profile_command_reports_not_yet_available() {
    let mut cmd = assert_cmd::Command::cargo_bin("vaultsync").unwrap();
    cmd.arg("profile");
    cmd.assert().failure().stderr(predicates::str::contains("not yet available"));
}
