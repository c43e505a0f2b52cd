//! Builders for [`Asset`](crate::asset::Asset) declarations, lock files,
//! and bundle zips.

use crate::asset::{Asset, AssetKind, AssetSource, ScopeDecl};
use std::io::Write;

/// A fluent builder for a single lock file asset entry.
#[derive(Clone)]
pub struct AssetFixture {
    asset: Asset,
}

impl AssetFixture {
    /// A skill asset named `name` at version `1.0.0`, sourced from
    /// `bundles/<name>.zip` within the vault, applying globally to every
    /// client.
    pub fn skill(name: &str) -> Self {
        Self {
            asset: Asset {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                kind: AssetKind::Skill,
                config: Default::default(),
                scopes: Vec::new(),
                clients: Vec::new(),
                source: AssetSource::SourcePath { path: format!("bundles/{name}.zip") },
                dependencies: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.asset.version = version.to_string();
        self
    }

    pub fn kind(mut self, kind: AssetKind) -> Self {
        self.asset.kind = kind;
        self
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.asset.dependencies.push(name.to_string());
        self
    }

    pub fn scoped_to_repo(mut self, repo_url: &str) -> Self {
        self.asset.scopes.push(ScopeDecl { repo: repo_url.to_string(), paths: Vec::new() });
        self
    }

    pub fn scoped_to_path(mut self, repo_url: &str, path: &str) -> Self {
        self.asset.scopes.push(ScopeDecl {
            repo: repo_url.to_string(),
            paths: vec![path.to_string()],
        });
        self
    }

    pub fn config(mut self, key: &str, value: serde_json::Value) -> Self {
        self.asset.config.insert(key.to_string(), value);
        self
    }

    pub fn for_clients(mut self, ids: &[&str]) -> Self {
        self.asset.clients = ids.iter().map(|s| crate::core::ClientId::new(*s)).collect();
        self
    }

    pub fn build(self) -> Asset {
        self.asset
    }
}

/// A fluent builder for a complete lock file, serialized to TOML.
pub struct LockFileFixture {
    assets: Vec<Asset>,
}

impl LockFileFixture {
    pub fn new() -> Self {
        Self { assets: Vec::new() }
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Render as a [`crate::lockfile::LockFile`] ready to serialize or
    /// feed straight into the reconciler.
    pub fn build(self) -> crate::lockfile::LockFile {
        crate::lockfile::LockFile {
            lock_version: 1,
            version: "test".to_string(),
            created_by: "vaultsync-test-utils".to_string(),
            assets: self.assets,
        }
    }

    /// Render straight to TOML bytes, as a vault would serve them.
    pub fn to_toml(self) -> String {
        self.build().serialize().expect("fixture lock file always serializes")
    }
}

impl Default for LockFileFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a zip bundle in memory from `(entry_name, contents)` pairs, the
/// first of which should usually be `metadata.toml`.
pub fn bundle_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).expect("zip entry name is valid");
            writer.write_all(content).expect("write to in-memory buffer cannot fail");
        }
        writer.finish().expect("finishing an in-memory zip cannot fail");
    }
    buf
}

/// A minimal single-file skill bundle: `metadata.toml` plus one markdown
/// file, matching `name`/`version`.
pub fn skill_bundle(name: &str, version: &str) -> Vec<u8> {
    let metadata = format!(
        "[asset]\nname = \"{name}\"\ntype = \"skill\"\nversion = \"{version}\"\n"
    );
    let body = format!("# {name}\n");
    bundle_zip(&[("metadata.toml", metadata.as_bytes()), ("SKILL.md", body.as_bytes())])
}
