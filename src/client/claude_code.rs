//! The Claude Code client: supports every asset kind, including hooks and
//! plugins, which are Claude-Code-specific concepts.

use crate::asset::{Asset, AssetKind};
use crate::client::common::{
    ManagedMeta, client_dir, destination_root, load_json_object, managed_entry_matches,
    managed_section_present, merge_managed_entry, merge_managed_section, read_prompt_file,
    remove_managed_entry, remove_managed_section, save_json_object,
};
use crate::client::{
    AssetInstallResult, BootstrapOption, Client, InstallContext, InstallItem, InstallResponse,
    InstallStatus, UninstallRequest, UninstallResponse, VerifyResult,
};
use crate::core::ClientId;
use crate::scope::Scope;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

const LOCAL_DIR: &str = ".claude";
const GLOBAL_DIR_NAME: &str = ".claude";

/// Claude Code client implementation.
pub struct ClaudeCode;

impl ClaudeCode {
    /// Build a new Claude Code client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn global_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(GLOBAL_DIR_NAME)
    }

    fn dir_for(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        client_dir(scope, ctx, &Self::global_dir(), LOCAL_DIR)
    }

    /// Which instructions file to write into: `AGENTS.md` if `CLAUDE.md`
    /// already `@`-references it, otherwise `CLAUDE.md` itself directly.
    fn instructions_target(&self, root: &Path) -> PathBuf {
        let claude_md = root.join("CLAUDE.md");
        if let Ok(contents) = std::fs::read_to_string(&claude_md) {
            if contents.lines().any(|l| l.trim() == "@AGENTS.md") {
                return root.join("AGENTS.md");
            }
        }
        claude_md
    }

    fn rules_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        self.dir_for(scope, ctx).join("rules.md")
    }

    fn hooks_json_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        self.dir_for(scope, ctx).join("hooks.json")
    }

    fn mcp_json_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        self.dir_for(scope, ctx).join("mcp.json")
    }

    fn settings_json_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        self.dir_for(scope, ctx).join("settings.json")
    }

    fn installed_plugins_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        self.dir_for(scope, ctx).join("plugins").join("installed_plugins.json")
    }

    fn install_one(
        &self,
        ctx: &InstallContext,
        item: &InstallItem<'_>,
        scope: &Scope,
    ) -> Result<(), String> {
        let asset = item.asset;
        let root = self.dir_for(scope, ctx);

        match asset.kind {
            AssetKind::Skill => {
                let dest = root.join("skills").join(&asset.name);
                item.bundle.extract_all(&dest).map_err(|e| e.to_string())
            }
            AssetKind::Command => {
                let body = read_prompt_file(item.bundle, asset, "command.md")
                    .map_err(|e| e.to_string())?;
                let dest = root.join("commands").join(format!("{}.md", asset.name));
                write_file(&dest, &body)
            }
            AssetKind::Agent => {
                let body =
                    read_prompt_file(item.bundle, asset, "agent.md").map_err(|e| e.to_string())?;
                let dest = root.join("agents").join(format!("{}.md", asset.name));
                write_file(&dest, &body)
            }
            AssetKind::Rule => {
                let body = read_prompt_file(item.bundle, asset, "RULE.md")
                    .map_err(|e| e.to_string())?;
                let body = String::from_utf8_lossy(&body);
                merge_managed_section(&self.rules_path(scope, ctx), &asset.name, &body)
                    .map_err(|e| e.to_string())
            }
            AssetKind::Instruction => {
                let body = read_prompt_file(item.bundle, asset, "INSTRUCTIONS.md")
                    .map_err(|e| e.to_string())?;
                let body = String::from_utf8_lossy(&body);
                let target_root = destination_root(scope, ctx, &Self::global_dir());
                merge_managed_section(&self.instructions_target(&target_root), &asset.name, &body)
                    .map_err(|e| e.to_string())
            }
            AssetKind::Hook => self.install_hook(ctx, item, scope),
            AssetKind::Mcp | AssetKind::McpRemote => self.install_mcp(ctx, item, scope),
            AssetKind::ClaudeCodePlugin => self.install_plugin(ctx, item, scope),
        }
    }

    fn install_hook(
        &self,
        ctx: &InstallContext,
        item: &InstallItem<'_>,
        scope: &Scope,
    ) -> Result<(), String> {
        let asset = item.asset;
        let root = self.dir_for(scope, ctx);
        let script_dir = root.join("hooks").join(&asset.name);
        item.bundle.extract_all(&script_dir).map_err(|e| e.to_string())?;

        let event = asset
            .config
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or("PreToolUse")
            .to_string();
        let command = asset
            .config
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or("./run.sh")
            .to_string();

        let path = self.hooks_json_path(scope, ctx);
        let mut container = load_json_object(&path).map_err(|e| e.to_string())?;
        let meta =
            ManagedMeta { managed: true, asset_name: asset.name.clone(), version: asset.version.clone() };
        merge_managed_entry(
            &mut container,
            &event,
            &asset.name,
            serde_json::json!({"command": command}),
            &meta,
        )
        .map_err(|e| e.to_string())?;
        save_json_object(&path, &container).map_err(|e| e.to_string())
    }

    fn install_mcp(
        &self,
        ctx: &InstallContext,
        item: &InstallItem<'_>,
        scope: &Scope,
    ) -> Result<(), String> {
        let asset = item.asset;
        let root = self.dir_for(scope, ctx);

        if asset.kind == AssetKind::Mcp {
            let dest = root.join("mcp-servers").join(&asset.name);
            item.bundle.extract_all(&dest).map_err(|e| e.to_string())?;
        }

        let entry = serde_json::json!({
            "command": asset.config.get("command").cloned().unwrap_or(Value::Null),
            "args": asset.config.get("args").cloned().unwrap_or_else(|| Value::Array(vec![])),
            "env": asset.config.get("env").cloned().unwrap_or_else(|| Value::Object(Default::default())),
        });

        let path = self.mcp_json_path(scope, ctx);
        let mut container = load_json_object(&path).map_err(|e| e.to_string())?;
        let meta =
            ManagedMeta { managed: true, asset_name: asset.name.clone(), version: asset.version.clone() };
        merge_managed_entry(&mut container, "mcpServers", &asset.name, entry, &meta)
            .map_err(|e| e.to_string())?;
        save_json_object(&path, &container).map_err(|e| e.to_string())
    }

    fn install_plugin(
        &self,
        ctx: &InstallContext,
        item: &InstallItem<'_>,
        scope: &Scope,
    ) -> Result<(), String> {
        let asset = item.asset;
        let root = self.dir_for(scope, ctx);
        let dest = root.join("plugins").join(&asset.name);
        item.bundle.extract_all(&dest).map_err(|e| e.to_string())?;

        let auto_enable =
            asset.config.get("auto-enable").and_then(Value::as_bool).unwrap_or(true);

        let plugins_path = self.installed_plugins_path(scope, ctx);
        let mut plugins_doc = load_json_object(&plugins_path).map_err(|e| e.to_string())?;
        let plugins_section = plugins_doc
            .entry("plugins".to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        plugins_section
            .as_object_mut()
            .ok_or("installed_plugins.json plugins section is malformed")?
            .insert(asset.name.clone(), serde_json::json!({"version": asset.version}));
        save_json_object(&plugins_path, &plugins_doc).map_err(|e| e.to_string())?;

        if auto_enable {
            let settings_path = self.settings_json_path(scope, ctx);
            let mut settings = load_json_object(&settings_path).map_err(|e| e.to_string())?;
            let enabled = settings
                .entry("enabledPlugins".to_string())
                .or_insert_with(|| Value::Array(vec![]));
            let arr = enabled.as_array_mut().ok_or("enabledPlugins is not an array")?;
            if !arr.iter().any(|v| v.as_str() == Some(asset.name.as_str())) {
                arr.push(Value::String(asset.name.clone()));
            }
            save_json_object(&settings_path, &settings).map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    fn uninstall_one(&self, ctx: &InstallContext, request: &UninstallRequest) -> Result<(), String> {
        let root = self.dir_for(&request.scope, ctx);
        match request.kind {
            AssetKind::Skill => remove_dir(&root.join("skills").join(&request.name)),
            AssetKind::Command => remove_file(&root.join("commands").join(format!("{}.md", request.name))),
            AssetKind::Agent => remove_file(&root.join("agents").join(format!("{}.md", request.name))),
            AssetKind::Rule => remove_managed_section(&self.rules_path(&request.scope, ctx), &request.name)
                .map_err(|e| e.to_string()),
            AssetKind::Instruction => {
                let target_root = destination_root(&request.scope, ctx, &Self::global_dir());
                remove_managed_section(&self.instructions_target(&target_root), &request.name)
                    .map_err(|e| e.to_string())
            }
            AssetKind::Hook => {
                remove_dir(&root.join("hooks").join(&request.name))?;
                let path = self.hooks_json_path(&request.scope, ctx);
                let mut container = load_json_object(&path).map_err(|e| e.to_string())?;
                for event in container.clone().keys() {
                    remove_managed_entry(&mut container, event, &request.name);
                }
                save_json_object(&path, &container).map_err(|e| e.to_string())
            }
            AssetKind::Mcp | AssetKind::McpRemote => {
                if request.kind == AssetKind::Mcp {
                    remove_dir(&root.join("mcp-servers").join(&request.name))?;
                }
                let path = self.mcp_json_path(&request.scope, ctx);
                let mut container = load_json_object(&path).map_err(|e| e.to_string())?;
                remove_managed_entry(&mut container, "mcpServers", &request.name);
                save_json_object(&path, &container).map_err(|e| e.to_string())
            }
            AssetKind::ClaudeCodePlugin => {
                remove_dir(&root.join("plugins").join(&request.name))?;
                let plugins_path = self.installed_plugins_path(&request.scope, ctx);
                let mut doc = load_json_object(&plugins_path).map_err(|e| e.to_string())?;
                if let Some(section) = doc.get_mut("plugins").and_then(Value::as_object_mut) {
                    section.remove(&request.name);
                }
                save_json_object(&plugins_path, &doc).map_err(|e| e.to_string())?;

                let settings_path = self.settings_json_path(&request.scope, ctx);
                let mut settings = load_json_object(&settings_path).map_err(|e| e.to_string())?;
                if let Some(arr) = settings.get_mut("enabledPlugins").and_then(Value::as_array_mut) {
                    arr.retain(|v| v.as_str() != Some(request.name.as_str()));
                }
                save_json_object(&settings_path, &settings).map_err(|e| e.to_string())
            }
        }
    }
}

impl Default for ClaudeCode {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    crate::utils::fs::atomic_write(path, content).map_err(|e| e.to_string())
}

fn remove_file(path: &Path) -> Result<(), String> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn remove_dir(path: &Path) -> Result<(), String> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[async_trait]
impl Client for ClaudeCode {
    fn id(&self) -> ClientId {
        ClientId::new("claude-code")
    }

    fn display_name(&self) -> &str {
        "Claude Code"
    }

    fn supports_kind(&self, _kind: AssetKind) -> bool {
        true
    }

    async fn install(
        &self,
        ctx: &InstallContext,
        items: &[InstallItem<'_>],
        scope: &Scope,
    ) -> InstallResponse {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let status = match self.install_one(ctx, item, scope) {
                Ok(()) => InstallStatus::Success,
                Err(error) => InstallStatus::Failed { error },
            };
            results.push(AssetInstallResult { asset_name: item.asset.name.clone(), status });
        }
        InstallResponse { results }
    }

    async fn uninstall(&self, ctx: &InstallContext, request: &UninstallRequest) -> UninstallResponse {
        let status = match self.uninstall_one(ctx, request) {
            Ok(()) => InstallStatus::Success,
            Err(error) => InstallStatus::Failed { error },
        };
        UninstallResponse { status }
    }

    async fn verify(
        &self,
        ctx: &InstallContext,
        assets: &[(&Asset, &str)],
        scope: &Scope,
    ) -> Vec<(String, VerifyResult)> {
        let root = self.dir_for(scope, ctx);
        assets
            .iter()
            .map(|(asset, _installed_version)| {
                let result = match asset.kind {
                    AssetKind::Skill => {
                        if root.join("skills").join(&asset.name).is_dir() {
                            VerifyResult::Matches
                        } else {
                            VerifyResult::Missing
                        }
                    }
                    AssetKind::Command => {
                        verify_file(&root.join("commands").join(format!("{}.md", asset.name)))
                    }
                    AssetKind::Agent => {
                        verify_file(&root.join("agents").join(format!("{}.md", asset.name)))
                    }
                    AssetKind::Rule => {
                        if managed_section_present(&self.rules_path(scope, ctx), &asset.name) {
                            VerifyResult::Matches
                        } else {
                            VerifyResult::Missing
                        }
                    }
                    AssetKind::Instruction => {
                        let target_root = destination_root(scope, ctx, &Self::global_dir());
                        let path = self.instructions_target(&target_root);
                        if managed_section_present(&path, &asset.name) {
                            VerifyResult::Matches
                        } else {
                            VerifyResult::Missing
                        }
                    }
                    AssetKind::Hook => {
                        if root.join("hooks").join(&asset.name).is_dir() {
                            VerifyResult::Matches
                        } else {
                            VerifyResult::Missing
                        }
                    }
                    AssetKind::Mcp | AssetKind::McpRemote => {
                        match load_json_object(&self.mcp_json_path(scope, ctx)) {
                            Ok(container) if managed_entry_matches(
                                &container,
                                "mcpServers",
                                &asset.name,
                                &asset.version,
                            ) =>
                            {
                                VerifyResult::Matches
                            }
                            Ok(container) if container
                                .get("mcpServers")
                                .and_then(|s| s.get(asset.name.as_str()))
                                .is_some() =>
                            {
                                VerifyResult::Mismatched { reason: "version mismatch".into() }
                            }
                            _ => VerifyResult::Missing,
                        }
                    }
                    AssetKind::ClaudeCodePlugin => {
                        if root.join("plugins").join(&asset.name).is_dir() {
                            VerifyResult::Matches
                        } else {
                            VerifyResult::Missing
                        }
                    }
                };
                (asset.name.clone(), result)
            })
            .collect()
    }

    async fn ensure_asset_support(&self, ctx: &InstallContext, scope: &Scope) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.dir_for(scope, ctx))?;
        Ok(())
    }

    fn get_bootstrap_options(&self, _ctx: &InstallContext) -> Vec<BootstrapOption> {
        vec![BootstrapOption {
            key: "claude-code.session-hook".to_string(),
            description: "Register a pre-prompt hook so Claude Code triggers hook-mode reconciles".to_string(),
        }]
    }

    async fn install_bootstrap(&self, ctx: &InstallContext, enabled: &[String]) -> anyhow::Result<()> {
        if !enabled.iter().any(|k| k == "claude-code.session-hook") {
            return Ok(());
        }
        let path = self.hooks_json_path(&Scope::Global, ctx);
        let mut container = load_json_object(&path)?;
        let meta = ManagedMeta {
            managed: true,
            asset_name: "__bootstrap__".to_string(),
            version: "0".to_string(),
        };
        merge_managed_entry(
            &mut container,
            "SessionStart",
            "__bootstrap__",
            serde_json::json!({"command": "vaultsync install --hook-mode --client claude-code"}),
            &meta,
        )?;
        save_json_object(&path, &container)
    }

    fn should_install(&self, ctx: &InstallContext, hook_payload: Option<&serde_json::Value>) -> bool {
        super::common_session_gate(&self.id(), ctx, hook_payload)
    }

    fn get_asset_path(
        &self,
        ctx: &InstallContext,
        name: &str,
        kind: AssetKind,
        scope: &Scope,
    ) -> Option<PathBuf> {
        let root = self.dir_for(scope, ctx);
        Some(match kind {
            AssetKind::Skill => root.join("skills").join(name),
            AssetKind::Command => root.join("commands").join(format!("{name}.md")),
            AssetKind::Agent => root.join("agents").join(format!("{name}.md")),
            AssetKind::Hook => root.join("hooks").join(name),
            AssetKind::Mcp => root.join("mcp-servers").join(name),
            AssetKind::ClaudeCodePlugin => root.join("plugins").join(name),
            AssetKind::Rule => self.rules_path(scope, ctx),
            AssetKind::Instruction => {
                self.instructions_target(&destination_root(scope, ctx, &Self::global_dir()))
            }
            AssetKind::McpRemote => self.mcp_json_path(scope, ctx),
        })
    }
}

fn verify_file(path: &Path) -> VerifyResult {
    if path.is_file() { VerifyResult::Matches } else { VerifyResult::Missing }
}
