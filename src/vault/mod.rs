//! The uniform fetch surface over vault backends.
//!
//! The backends themselves (git push/pull, HTTP fetch) are external
//! collaborators - this module defines the contract the reconciler
//! consumes and ships the one backend simple enough to be in-scope and
//! fully testable: a local directory. Git- and HTTP-backed vaults
//! implement the same trait but live outside this crate's reconciler
//! core.

use crate::asset::{Asset, AssetSource};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// The context a fetch is performed under: currently just cancellation,
/// but kept as its own type so the signature doesn't change if more
/// request-scoped data (auth, timeouts) is added later.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    /// A cooperative cancellation flag, checked between steps.
    pub cancelled: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl FetchContext {
    /// Is cancellation requested?
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Result of fetching the lock file: either fresh bytes with a new ETag,
/// or a "not modified" signal meaning the caller should use its cached
/// copy.
#[derive(Debug)]
pub enum LockFileFetch {
    /// New content and the ETag it was served with.
    Fresh { bytes: Vec<u8>, etag: Option<String> },
    /// The known ETag still matches; no bytes were transferred.
    NotModified,
}

/// The fetch surface every vault backend implements.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// A short, stable label for error messages (`"local"`, `"git"`, `"http"`).
    fn kind(&self) -> &'static str;

    /// This vault's primary identifier, used to derive its [`crate::cache::VaultKey`].
    fn primary_identifier(&self) -> String;

    /// Conditionally fetch the lock file. `known_etag` is the caller's
    /// cached ETag, if any.
    async fn get_lock_file(
        &self,
        ctx: &FetchContext,
        known_etag: Option<&str>,
    ) -> Result<LockFileFetch>;

    /// Resolve an asset's `source` to its bundle bytes (a zip archive).
    async fn fetch_bundle(&self, ctx: &FetchContext, asset: &Asset) -> Result<Vec<u8>>;
}

/// A vault backed by a plain local directory: the lock file is
/// `<root>/vault.lock`, and `source-path` assets resolve to zips relative
/// to `<root>/`. `source-url` assets are out of scope for this backend.
pub struct LocalPathVault {
    root: PathBuf,
}

impl LocalPathVault {
    /// Build a local-path vault rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn lock_file_path(&self) -> PathBuf {
        self.root.join("vault.lock")
    }
}

#[async_trait]
impl VaultBackend for LocalPathVault {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn primary_identifier(&self) -> String {
        self.root.to_string_lossy().to_string()
    }

    async fn get_lock_file(
        &self,
        _ctx: &FetchContext,
        known_etag: Option<&str>,
    ) -> Result<LockFileFetch> {
        let path = self.lock_file_path();
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read lock file at {}", path.display()))?;
        let etag = crate::cache::content_hash(&bytes);
        if known_etag == Some(etag.as_str()) {
            return Ok(LockFileFetch::NotModified);
        }
        Ok(LockFileFetch::Fresh { bytes, etag: Some(etag) })
    }

    async fn fetch_bundle(&self, _ctx: &FetchContext, asset: &Asset) -> Result<Vec<u8>> {
        match &asset.source {
            AssetSource::SourcePath { path } => {
                let full = self.root.join(path);
                tokio::fs::read(&full)
                    .await
                    .with_context(|| format!("failed to read bundle at {}", full.display()))
            }
            AssetSource::SourceUrl { url } => {
                bail!("local-path vault cannot resolve source-url '{url}'; use a vault backend that supports remote fetches")
            }
        }
    }
}

/// True if `path` looks like a usable local vault root (has a lock file).
#[must_use]
pub fn looks_like_local_vault(path: &Path) -> bool {
    path.join("vault.lock").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fetches_fresh_lock_file_when_no_known_etag() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("vault.lock"), "lock-version = 1").unwrap();
        let vault = LocalPathVault::new(dir.path().to_path_buf());
        let result = vault.get_lock_file(&FetchContext::default(), None).await.unwrap();
        match result {
            LockFileFetch::Fresh { bytes, etag } => {
                assert_eq!(bytes, b"lock-version = 1");
                assert!(etag.is_some());
            }
            LockFileFetch::NotModified => panic!("expected fresh fetch"),
        }
    }

    #[tokio::test]
    async fn reports_not_modified_when_etag_matches() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("vault.lock"), "lock-version = 1").unwrap();
        let vault = LocalPathVault::new(dir.path().to_path_buf());
        let first = vault.get_lock_file(&FetchContext::default(), None).await.unwrap();
        let LockFileFetch::Fresh { etag, .. } = first else { panic!("expected fresh") };
        let second =
            vault.get_lock_file(&FetchContext::default(), etag.as_deref()).await.unwrap();
        assert!(matches!(second, LockFileFetch::NotModified));
    }
}
