//! Content- and ETag-keyed local storage for lock files and downloaded
//! asset bundles.
//!
//! Cache entries are best-effort: every read returns an `Option` and every
//! write failure is non-fatal. The cache is never authoritative - the
//! tracker is.
//!
//! Layout under `$XDG_CACHE_HOME/vaultsync/`:
//! ```text
//! lockfiles/<vault_key>.toml
//! lockfiles/<vault_key>.etag
//! bundles/<vault_key>/<name>/<version>.zip
//! ```

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A stable cache key derived from a vault's identity (its local path, git
/// URL, or HTTP endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultKey(String);

impl VaultKey {
    /// Hash `kind` (e.g. `"local"`, `"git"`, `"http"`) together with the
    /// vault's primary identifier into a stable, filesystem-safe key.
    #[must_use]
    pub fn new(kind: &str, primary_identifier: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"||");
        hasher.update(primary_identifier.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }
}

impl std::fmt::Display for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local filesystem cache rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// Build a cache rooted at `root` (typically [`crate::utils::fs::cache_dir`]).
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn lockfile_path(&self, key: &VaultKey) -> PathBuf {
        self.root.join("lockfiles").join(format!("{key}.toml"))
    }

    fn etag_path(&self, key: &VaultKey) -> PathBuf {
        self.root.join("lockfiles").join(format!("{key}.etag"))
    }

    fn bundle_path(&self, key: &VaultKey, name: &str, version: &str) -> PathBuf {
        self.root.join("bundles").join(key.to_string()).join(name).join(format!("{version}.zip"))
    }

    /// Load the cached ETag for `key`, if any.
    #[must_use]
    pub fn load_etag(&self, key: &VaultKey) -> Option<String> {
        std::fs::read_to_string(self.etag_path(key)).ok().map(|s| s.trim().to_string())
    }

    /// Best-effort save of the ETag for `key`.
    pub fn save_etag(&self, key: &VaultKey, etag: &str) {
        let _ = crate::utils::fs::safe_write(&self.etag_path(key), etag);
    }

    /// Load the cached lock file bytes for `key`, if any.
    #[must_use]
    pub fn load_lockfile(&self, key: &VaultKey) -> Option<Vec<u8>> {
        std::fs::read(self.lockfile_path(key)).ok()
    }

    /// Best-effort save of lock file bytes for `key`.
    pub fn save_lockfile(&self, key: &VaultKey, bytes: &[u8]) {
        let _ = crate::utils::fs::atomic_write(&self.lockfile_path(key), bytes);
    }

    /// Load a cached bundle, if present.
    #[must_use]
    pub fn load_bundle(&self, key: &VaultKey, name: &str, version: &str) -> Option<Vec<u8>> {
        std::fs::read(self.bundle_path(key, name, version)).ok()
    }

    /// Best-effort save of a downloaded bundle.
    pub fn save_bundle(&self, key: &VaultKey, name: &str, version: &str, bytes: &[u8]) {
        let _ = crate::utils::fs::atomic_write(&self.bundle_path(key, name, version), bytes);
    }
}

/// Hash arbitrary bytes, used for content-addressing where an ETag isn't
/// available from the vault backend.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Create the cache's top-level directories if missing.
pub fn ensure_layout(root: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(root.join("lockfiles"))?;
    std::fs::create_dir_all(root.join("bundles"))
}
