//! A generic assistant client used for every assistant that doesn't need
//! Claude-Code-specific hooks or plugins: Cursor, GitHub Copilot, Gemini
//! Code Assist. Parametrized by directory/file naming only - composition
//! over a per-client subclass.

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
use std::path::{Path, PathBuf};

/// Define a newtype wrapper around [`GenericAssistantClient`] and delegate
/// the full [`Client`] trait to it. Used for every assistant whose behavior
/// is entirely described by naming conventions (Cursor, Copilot, Gemini).
macro_rules! delegating_client {
    ($name:ident) => {
        /// Thin wrapper delegating to [`$crate::client::generic::GenericAssistantClient`].
        pub struct $name($crate::client::generic::GenericAssistantClient);

        impl std::ops::Deref for $name {
            type Target = $crate::client::generic::GenericAssistantClient;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        #[async_trait::async_trait]
        impl $crate::client::Client for $name {
            fn id(&self) -> $crate::core::ClientId {
                self.0.id()
            }
            fn display_name(&self) -> &str {
                self.0.display_name()
            }
            fn supports_kind(&self, kind: $crate::asset::AssetKind) -> bool {
                self.0.supports_kind(kind)
            }
            async fn install(
                &self,
                ctx: &$crate::client::InstallContext,
                items: &[$crate::client::InstallItem<'_>],
                scope: &$crate::scope::Scope,
            ) -> $crate::client::InstallResponse {
                self.0.install(ctx, items, scope).await
            }
            async fn uninstall(
                &self,
                ctx: &$crate::client::InstallContext,
                request: &$crate::client::UninstallRequest,
            ) -> $crate::client::UninstallResponse {
                self.0.uninstall(ctx, request).await
            }
            async fn verify(
                &self,
                ctx: &$crate::client::InstallContext,
                assets: &[(&$crate::asset::Asset, &str)],
                scope: &$crate::scope::Scope,
            ) -> Vec<(String, $crate::client::VerifyResult)> {
                self.0.verify(ctx, assets, scope).await
            }
            async fn ensure_asset_support(
                &self,
                ctx: &$crate::client::InstallContext,
                scope: &$crate::scope::Scope,
            ) -> anyhow::Result<()> {
                self.0.ensure_asset_support(ctx, scope).await
            }
            fn get_bootstrap_options(
                &self,
                ctx: &$crate::client::InstallContext,
            ) -> Vec<$crate::client::BootstrapOption> {
                self.0.get_bootstrap_options(ctx)
            }
            async fn install_bootstrap(
                &self,
                ctx: &$crate::client::InstallContext,
                enabled: &[String],
            ) -> anyhow::Result<()> {
                self.0.install_bootstrap(ctx, enabled).await
            }
            fn should_install(
                &self,
                ctx: &$crate::client::InstallContext,
                hook_payload: Option<&serde_json::Value>,
            ) -> bool {
                self.0.should_install(ctx, hook_payload)
            }
            fn get_asset_path(
                &self,
                ctx: &$crate::client::InstallContext,
                name: &str,
                kind: $crate::asset::AssetKind,
                scope: &$crate::scope::Scope,
            ) -> Option<std::path::PathBuf> {
                self.0.get_asset_path(ctx, name, kind, scope)
            }
        }
    };
}

pub(crate) use delegating_client;

/// A client whose directory layout follows the common pattern: a
/// `<client-dir>/{skills,commands,agents,mcp-servers}/` tree, a
/// `mcp.json`, and a single shared instructions file at the destination
/// root (no `@`-reference indirection, unlike Claude Code's `CLAUDE.md`).
pub struct GenericAssistantClient {
    id: &'static str,
    display_name: &'static str,
    local_dir_name: &'static str,
    global_dir_name: &'static str,
    instructions_file: &'static str,
}

impl GenericAssistantClient {
    /// Build a client with the given identity and naming conventions.
    #[must_use]
    pub fn new(
        id: &'static str,
        display_name: &'static str,
        local_dir_name: &'static str,
        global_dir_name: &'static str,
        instructions_file: &'static str,
    ) -> Self {
        Self { id, display_name, local_dir_name, global_dir_name, instructions_file }
    }

    fn global_dir(&self) -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(self.global_dir_name)
    }

    fn dir_for(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        client_dir(scope, ctx, &self.global_dir(), self.local_dir_name)
    }

    fn instructions_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        destination_root(scope, ctx, &self.global_dir()).join(self.instructions_file)
    }

    fn rules_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        self.dir_for(scope, ctx).join("rules.md")
    }

    fn mcp_json_path(&self, scope: &Scope, ctx: &InstallContext) -> PathBuf {
        self.dir_for(scope, ctx).join("mcp.json")
    }

    fn install_one(&self, ctx: &InstallContext, item: &InstallItem<'_>, scope: &Scope) -> Result<(), String> {
        let asset = item.asset;
        let root = self.dir_for(scope, ctx);
        match asset.kind {
            AssetKind::Skill => {
                item.bundle.extract_all(&root.join("skills").join(&asset.name)).map_err(|e| e.to_string())
            }
            AssetKind::Command => write_file(
                &root.join("commands").join(format!("{}.md", asset.name)),
                &read_prompt_file(item.bundle, asset, "command.md").map_err(|e| e.to_string())?,
            ),
            AssetKind::Agent => write_file(
                &root.join("agents").join(format!("{}.md", asset.name)),
                &read_prompt_file(item.bundle, asset, "agent.md").map_err(|e| e.to_string())?,
            ),
            AssetKind::Rule => {
                let body = read_prompt_file(item.bundle, asset, "RULE.md").map_err(|e| e.to_string())?;
                merge_managed_section(
                    &self.rules_path(scope, ctx),
                    &asset.name,
                    &String::from_utf8_lossy(&body),
                )
                .map_err(|e| e.to_string())
            }
            AssetKind::Instruction => {
                let body =
                    read_prompt_file(item.bundle, asset, "INSTRUCTIONS.md").map_err(|e| e.to_string())?;
                merge_managed_section(
                    &self.instructions_path(scope, ctx),
                    &asset.name,
                    &String::from_utf8_lossy(&body),
                )
                .map_err(|e| e.to_string())
            }
            AssetKind::Mcp | AssetKind::McpRemote => {
                if asset.kind == AssetKind::Mcp {
                    item.bundle
                        .extract_all(&root.join("mcp-servers").join(&asset.name))
                        .map_err(|e| e.to_string())?;
                }
                let entry = serde_json::json!({
                    "command": asset.config.get("command").cloned().unwrap_or(serde_json::Value::Null),
                    "args": asset.config.get("args").cloned().unwrap_or_else(|| serde_json::Value::Array(vec![])),
                    "env": asset.config.get("env").cloned().unwrap_or_else(|| serde_json::Value::Object(Default::default())),
                });
                let path = self.mcp_json_path(scope, ctx);
                let mut container = load_json_object(&path).map_err(|e| e.to_string())?;
                let meta = ManagedMeta {
                    managed: true,
                    asset_name: asset.name.clone(),
                    version: asset.version.clone(),
                };
                merge_managed_entry(&mut container, "mcpServers", &asset.name, entry, &meta)
                    .map_err(|e| e.to_string())?;
                save_json_object(&path, &container).map_err(|e| e.to_string())
            }
            AssetKind::Hook | AssetKind::ClaudeCodePlugin => {
                Err(format!("{} does not support kind {:?}", self.display_name, asset.kind))
            }
        }
    }

    fn uninstall_one(&self, ctx: &InstallContext, request: &UninstallRequest) -> Result<(), String> {
        let root = self.dir_for(&request.scope, ctx);
        match request.kind {
            AssetKind::Skill => remove_dir(&root.join("skills").join(&request.name)),
            AssetKind::Command => remove_file(&root.join("commands").join(format!("{}.md", request.name))),
            AssetKind::Agent => remove_file(&root.join("agents").join(format!("{}.md", request.name))),
            AssetKind::Rule => {
                remove_managed_section(&self.rules_path(&request.scope, ctx), &request.name)
                    .map_err(|e| e.to_string())
            }
            AssetKind::Instruction => {
                remove_managed_section(&self.instructions_path(&request.scope, ctx), &request.name)
                    .map_err(|e| e.to_string())
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
            AssetKind::Hook | AssetKind::ClaudeCodePlugin => Ok(()),
        }
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

fn verify_file(path: &Path) -> VerifyResult {
    if path.is_file() { VerifyResult::Matches } else { VerifyResult::Missing }
}


#[async_trait]
impl Client for GenericAssistantClient {
    fn id(&self) -> ClientId {
        ClientId::new(self.id)
    }

    fn display_name(&self) -> &str {
        self.display_name
    }

    fn supports_kind(&self, kind: AssetKind) -> bool {
        !matches!(kind, AssetKind::Hook | AssetKind::ClaudeCodePlugin)
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
            .map(|(asset, _version)| {
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
                        if managed_section_present(&self.instructions_path(scope, ctx), &asset.name) {
                            VerifyResult::Matches
                        } else {
                            VerifyResult::Missing
                        }
                    }
                    AssetKind::Mcp | AssetKind::McpRemote => {
                        match load_json_object(&self.mcp_json_path(scope, ctx)) {
                            Ok(container)
                                if managed_entry_matches(
                                    &container,
                                    "mcpServers",
                                    &asset.name,
                                    &asset.version,
                                ) =>
                            {
                                VerifyResult::Matches
                            }
                            Ok(container)
                                if container
                                    .get("mcpServers")
                                    .and_then(|s| s.get(asset.name.as_str()))
                                    .is_some() =>
                            {
                                VerifyResult::Mismatched { reason: "version mismatch".into() }
                            }
                            _ => VerifyResult::Missing,
                        }
                    }
                    AssetKind::Hook | AssetKind::ClaudeCodePlugin => VerifyResult::Missing,
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
        vec![]
    }

    async fn install_bootstrap(&self, _ctx: &InstallContext, _enabled: &[String]) -> anyhow::Result<()> {
        Ok(())
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
            AssetKind::Rule => self.rules_path(scope, ctx),
            AssetKind::Instruction => self.instructions_path(scope, ctx),
            AssetKind::Mcp => root.join("mcp-servers").join(name),
            AssetKind::McpRemote => self.mcp_json_path(scope, ctx),
            AssetKind::Hook | AssetKind::ClaudeCodePlugin => return None,
        })
    }
}
