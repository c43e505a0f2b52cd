//! The persistent tracker: the sole source of truth for "what is
//! installed where for which clients".
//!
//! The filesystem is secondary and is only reconciled with the tracker by
//! an explicit `repair` run. Cache entries are best-effort; the tracker is
//! not.

use crate::asset::AssetKind;
use crate::core::{ClientId, VaultError};
use crate::scope::Scope;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The `format_version` this build writes and the only one it accepts on
/// read.
pub const FORMAT_VERSION: i64 = 1;

/// The primary key of a tracker record: name plus the scope it was
/// installed under, expressed as `(repository, path)` - both empty for a
/// global install.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackerKey {
    /// Asset name.
    pub name: String,
    /// Empty for global.
    pub repository: String,
    /// Empty for repo-wide (or global).
    pub path: String,
}

impl TrackerKey {
    /// Build a key from a name and a concrete install [`Scope`].
    #[must_use]
    pub fn new(name: impl Into<String>, scope: &Scope) -> Self {
        Self {
            name: name.into(),
            repository: scope.repo_url().unwrap_or_default().to_string(),
            path: scope.path().to_string(),
        }
    }
}

/// A single tracker record: what was installed, under which scope, for
/// which clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledAsset {
    /// Asset name.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Asset kind.
    pub kind: AssetKind,
    /// Empty string means global.
    #[serde(default)]
    pub repository: String,
    /// Empty string means repo-wide (or global).
    #[serde(default)]
    pub path: String,
    /// Client ids that received this asset.
    pub clients: Vec<ClientId>,
    /// Per-kind metadata, e.g. `marketplace=x` for plugins.
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl InstalledAsset {
    /// This record's primary key.
    #[must_use]
    pub fn key(&self) -> TrackerKey {
        TrackerKey { name: self.name.clone(), repository: self.repository.clone(), path: self.path.clone() }
    }
}

/// The on-disk tracker document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackerDoc {
    version: i64,
    assets: Vec<InstalledAsset>,
}

/// In-memory tracker, serialized only by explicit [`Tracker::save`].
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    records: Vec<InstalledAsset>,
    path: Option<PathBuf>,
}

impl Tracker {
    /// An empty tracker not yet bound to a path (useful for tests).
    #[must_use]
    pub fn new() -> Self {
        Self { records: Vec::new(), path: None }
    }

    /// Load the tracker from `path`, or return an empty tracker if the
    /// file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self { records: Vec::new(), path: Some(path.to_path_buf()) });
        }
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read tracker file: {}", path.display()))?;
        let doc: TrackerDoc = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse tracker file: {}", path.display()))?;
        if doc.version != FORMAT_VERSION {
            return Err(VaultError::UnsupportedTrackerVersion { found: doc.version }.into());
        }
        Ok(Self { records: doc.assets, path: Some(path.to_path_buf()) })
    }

    /// The default tracker path: `$XDG_CACHE_HOME/vaultsync/installed.json`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::utils::fs::cache_dir()?.join("installed.json"))
    }

    /// Persist the tracker atomically. A failure here is a warning, never
    /// fatal - callers should log and continue.
    pub fn save(&self) -> Result<()> {
        let path = self.path.clone().context("tracker has no bound path to save to")?;
        let doc = TrackerDoc { version: FORMAT_VERSION, assets: self.records.clone() };
        crate::utils::fs::atomic_write_json(&path, &doc)
    }

    /// Point this tracker at a different path (used by tests and by
    /// `--target`).
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    /// Find the record for an exact key.
    #[must_use]
    pub fn find(&self, key: &TrackerKey) -> Option<&InstalledAsset> {
        self.records.iter().find(|r| &r.key() == key)
    }

    /// Find every record installed at an exact `(repository, path)` pair.
    #[must_use]
    pub fn find_by_scope(&self, repository: &str, path: &str) -> Vec<&InstalledAsset> {
        self.records.iter().filter(|r| r.repository == repository && r.path == path).collect()
    }

    /// Find every record whose recorded scope, reconstructed, would match
    /// `context` under the scope lattice (used by cleanup).
    #[must_use]
    pub fn find_for_scope_matching(&self, context: &Scope) -> Vec<&InstalledAsset> {
        self.records
            .iter()
            .filter(|r| {
                let recorded = record_scope(r);
                recorded == *context
                    || (recorded == Scope::Global)
            })
            .collect()
    }

    /// All records, for repair and reporting.
    #[must_use]
    pub fn all(&self) -> &[InstalledAsset] {
        &self.records
    }

    /// Insert or replace the record with the same key.
    pub fn upsert(&mut self, record: InstalledAsset) {
        let key = record.key();
        if let Some(existing) = self.records.iter_mut().find(|r| r.key() == key) {
            *existing = record;
        } else {
            self.records.push(record);
        }
    }

    /// Remove the record for `key`, returning it if present.
    pub fn remove(&mut self, key: &TrackerKey) -> Option<InstalledAsset> {
        let idx = self.records.iter().position(|r| &r.key() == key)?;
        Some(self.records.remove(idx))
    }
}

/// Reconstruct the [`Scope`] a tracker record was installed under, from
/// its flattened `(repository, path)` fields.
fn record_scope(record: &InstalledAsset) -> Scope {
    match (record.repository.as_str(), record.path.as_str()) {
        ("", _) => Scope::Global,
        (repo, "") => Scope::Repository { repo_url: repo.to_string() },
        (repo, path) => Scope::Path { repo_url: repo.to_string(), repo_path: path.to_string() },
    }
}

/// Does `key` at `desired_version` need a (re)install for every id in
/// `desired_clients`? True if there's no record, the version differs, or
/// any desired client is missing from the record's client set (spec
/// section 4.4, testable property in section 8).
#[must_use]
pub fn needs_install(
    tracker: &Tracker,
    key: &TrackerKey,
    desired_version: &str,
    desired_clients: &[ClientId],
) -> bool {
    match tracker.find(key) {
        None => true,
        Some(record) => {
            record.version != desired_version
                || desired_clients.iter().any(|c| !record.clients.contains(c))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str, version: &str, clients: Vec<&str>) -> InstalledAsset {
        InstalledAsset {
            name: name.to_string(),
            version: version.to_string(),
            kind: AssetKind::Skill,
            repository: String::new(),
            path: String::new(),
            clients: clients.into_iter().map(ClientId::new).collect(),
            config: HashMap::new(),
        }
    }

    #[test]
    fn needs_install_when_absent() {
        let tracker = Tracker::new();
        let key = TrackerKey { name: "a".into(), repository: String::new(), path: String::new() };
        assert!(needs_install(&tracker, &key, "1.0.0", &[ClientId::new("claude-code")]));
    }

    #[test]
    fn needs_install_when_version_differs() {
        let mut tracker = Tracker::new();
        tracker.upsert(record("a", "1.0.0", vec!["claude-code"]));
        let key = TrackerKey { name: "a".into(), repository: String::new(), path: String::new() };
        assert!(needs_install(&tracker, &key, "2.0.0", &[ClientId::new("claude-code")]));
    }

    #[test]
    fn needs_install_when_client_missing() {
        let mut tracker = Tracker::new();
        tracker.upsert(record("a", "1.0.0", vec!["claude-code"]));
        let key = TrackerKey { name: "a".into(), repository: String::new(), path: String::new() };
        assert!(needs_install(
            &tracker,
            &key,
            "1.0.0",
            &[ClientId::new("claude-code"), ClientId::new("cursor")]
        ));
    }

    #[test]
    fn no_install_needed_when_satisfied() {
        let mut tracker = Tracker::new();
        tracker.upsert(record("a", "1.0.0", vec!["claude-code", "cursor"]));
        let key = TrackerKey { name: "a".into(), repository: String::new(), path: String::new() };
        assert!(!needs_install(&tracker, &key, "1.0.0", &[ClientId::new("claude-code")]));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("installed.json");
        let mut tracker = Tracker::new().with_path(path.clone());
        tracker.upsert(record("a", "1.0.0", vec!["claude-code"]));
        tracker.save().unwrap();

        let loaded = Tracker::load(&path).unwrap();
        assert_eq!(loaded.all().len(), 1);
        assert_eq!(loaded.all()[0].name, "a");
    }

    #[test]
    fn load_rejects_unknown_format_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("installed.json");
        std::fs::write(&path, r#"{"version": 99, "assets": []}"#).unwrap();
        assert!(Tracker::load(&path).is_err());
    }

    #[test]
    fn remove_deletes_and_returns_the_record() {
        let mut tracker = Tracker::new();
        tracker.upsert(record("a", "1.0.0", vec!["claude-code"]));
        let key = TrackerKey { name: "a".into(), repository: String::new(), path: String::new() };
        assert!(tracker.remove(&key).is_some());
        assert!(tracker.find(&key).is_none());
    }
}
