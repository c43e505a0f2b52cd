//! The typed asset model: kind, per-kind config, declared scopes, client
//! compatibility, and dependencies.
//!
//! An [`Asset`] is a declaration from the lock file, not an installed
//! artifact - see [`crate::tracker::InstalledAsset`] for the latter.

use crate::core::ClientId;
use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of asset kinds vaultsync understands.
///
/// Closed deliberately: every client implementation switches on this enum
/// via a per-kind handler table (see [`crate::client::Client`]) rather than
/// stringly-typed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Skill,
    Rule,
    Command,
    Agent,
    Instruction,
    Hook,
    Mcp,
    McpRemote,
    ClaudeCodePlugin,
}

impl AssetKind {
    /// Stable lower-kebab key as it appears in the lock file's `type` field
    /// and in tracker records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Rule => "rule",
            Self::Command => "command",
            Self::Agent => "agent",
            Self::Instruction => "instruction",
            Self::Hook => "hook",
            Self::Mcp => "mcp",
            Self::McpRemote => "mcp-remote",
            Self::ClaudeCodePlugin => "claude-code-plugin",
        }
    }

    /// Parse a kind key, returning `None` for anything outside the closed
    /// set rather than panicking or guessing.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "skill" => Self::Skill,
            "rule" => Self::Rule,
            "command" => Self::Command,
            "agent" => Self::Agent,
            "instruction" => Self::Instruction,
            "hook" => Self::Hook,
            "mcp" => Self::Mcp,
            "mcp-remote" => Self::McpRemote,
            "claude-code-plugin" => Self::ClaudeCodePlugin,
            _ => return None,
        })
    }
}

/// Where an asset's bundle comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetSource {
    /// A path within the vault itself.
    SourcePath {
        /// Vault-relative path.
        path: String,
    },
    /// An externally hosted bundle.
    SourceUrl {
        /// Absolute URL to fetch.
        url: String,
    },
}

/// A declared scope entry as it appears in the lock file: a repo plus an
/// optional list of paths (empty means "the whole repo").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDecl {
    /// Repository URL as written by the user (not yet normalized).
    pub repo: String,
    /// Repo-relative paths this asset applies to. Empty means repo-wide.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl ScopeDecl {
    /// Expand this declaration into one or more [`Scope`] values: one
    /// [`Scope::Repository`] if `paths` is empty, otherwise one
    /// [`Scope::Path`] per declared path.
    #[must_use]
    pub fn expand(&self) -> Vec<Scope> {
        let repo_url = crate::scope::normalize_repo_url(&self.repo);
        if self.paths.is_empty() {
            vec![Scope::Repository { repo_url }]
        } else {
            self.paths
                .iter()
                .map(|p| Scope::Path { repo_url: repo_url.clone(), repo_path: p.clone() })
                .collect()
        }
    }
}

/// A declared asset from the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique name within the lock file.
    pub name: String,
    /// Exact version string, compared lexicographically (see
    /// [`crate::tracker::needs_install`] and the Open Question in
    /// `DESIGN.md` about semver).
    pub version: String,
    /// The asset's kind.
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// Opaque per-kind configuration, parsed downstream by clients.
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    /// Declared scopes. Empty means global.
    #[serde(default)]
    pub scopes: Vec<ScopeDecl>,
    /// Client whitelist. Empty means "every compatible client".
    #[serde(default)]
    pub clients: Vec<ClientId>,
    /// Where to fetch the bundle from.
    pub source: AssetSource,
    /// Names of other assets in the same lock file this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Asset {
    /// True when no scopes were declared, i.e. this asset applies globally.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Does this asset admit installation into `client`? An empty
    /// whitelist admits every client.
    #[must_use]
    pub fn matches_client(&self, client: &ClientId) -> bool {
        self.clients.is_empty() || self.clients.contains(client)
    }

    /// Does this asset apply under `context`: assets with no declared
    /// scopes always apply; otherwise at least one declared scope must
    /// contain the context.
    #[must_use]
    pub fn applies_to(&self, context: &crate::scope::Scope) -> bool {
        if self.is_global() {
            return true;
        }
        self.scopes.iter().any(|decl| decl.expand().iter().any(|s| s.contains(context)))
    }

    /// All concrete installation scopes this asset's declarations expand
    /// to - the reconciler installs at the asset's *declared* scopes, not
    /// the current context.
    #[must_use]
    pub fn install_scopes(&self) -> Vec<crate::scope::Scope> {
        if self.is_global() {
            return vec![crate::scope::Scope::Global];
        }
        self.scopes.iter().flat_map(ScopeDecl::expand).collect()
    }
}
