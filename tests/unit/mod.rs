//! Unit-level tests against the public API surface, covering things that
//! span more than one module and so don't fit naturally in a single
//! module's inline `#[cfg(test)]` block. Per-module unit tests live next
//! to the code they test and run under `cargo test --lib`.

use vaultsync_cli::config::GlobalConfig;
use vaultsync_cli::core::error::{ErrorContext, user_friendly_error};
use vaultsync_cli::core::{ClientId, VaultError};
use vaultsync_cli::hookmode::HookResponse;
use vaultsync_cli::scope::Scope;

#[test]
fn global_config_round_trips_through_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = GlobalConfig::default();
    config.force_enabled_clients.push(ClientId::new("cursor"));
    config.force_disabled_clients.push(ClientId::new("gemini"));
    config.bootstrap_decisions.insert("pre-commit-hook".to_string(), true);
    config.default_vault = Some("/srv/vault".to_string());
    config.save(&path).unwrap();

    let reloaded = GlobalConfig::load(&path).unwrap();
    assert!(reloaded.is_force_disabled(&ClientId::new("gemini")));
    assert!(!reloaded.is_force_disabled(&ClientId::new("cursor")));
    assert_eq!(reloaded.bootstrap_decision("pre-commit-hook"), Some(true));
    assert_eq!(reloaded.default_vault.as_deref(), Some("/srv/vault"));
}

#[test]
fn missing_global_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");
    let config = GlobalConfig::load(&path).unwrap();
    assert!(config.force_enabled_clients.is_empty());
    assert_eq!(config.default_vault, None);
}

#[test]
fn no_clients_error_carries_a_client_enabling_suggestion() {
    let ctx: ErrorContext = user_friendly_error(anyhow::Error::from(VaultError::NoClients));
    let rendered = ctx.to_string();
    assert!(rendered.contains("no detected or force-enabled clients"));
    assert!(rendered.to_lowercase().contains("--clients"));
}

#[test]
fn hook_response_serializes_continue_true_and_omits_absent_message() {
    let response = HookResponse::fast_path();
    let json = serde_json::to_string(&response).unwrap();
    assert_eq!(json, r#"{"continue":true}"#);
}

#[test]
fn scope_path_is_contained_by_its_own_repository_scope() {
    let repo = Scope::Repository { repo_url: "github.com/acme/widgets".to_string() };
    let path =
        Scope::Path { repo_url: "github.com/acme/widgets".to_string(), repo_path: "src/lib".to_string() };
    assert!(repo.contains(&path));
    assert!(!path.contains(&repo));
}
