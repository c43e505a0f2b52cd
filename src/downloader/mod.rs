//! Bounded-concurrency bundle fetching: each asset that needs installing
//! is fetched independently, a cache hit short-circuits the network, and
//! one asset's failure never blocks the others.

use crate::asset::Asset;
use crate::cache::{Cache, VaultKey};
use crate::vault::{FetchContext, VaultBackend};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

/// Default number of bundles fetched concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// One asset's bundle, ready to be opened.
pub struct DownloadedBundle {
    /// The asset the bundle belongs to.
    pub asset: Asset,
    /// Raw zip bytes.
    pub bytes: Vec<u8>,
}

/// One asset that could not be fetched.
pub struct DownloadFailure {
    /// The asset that failed.
    pub asset: Asset,
    /// Why it failed.
    pub error: anyhow::Error,
}

/// The outcome of downloading a batch of assets: successes and failures,
/// both in the same relative order as the input.
pub struct DownloadReport {
    /// Bundles fetched successfully (or served from cache).
    pub successes: Vec<DownloadedBundle>,
    /// Assets whose bundle could not be fetched.
    pub failures: Vec<DownloadFailure>,
}

/// Fetch every asset's bundle, bounded to `max_concurrency` concurrent
/// fetches. A cache hit (by name + version) is used in place of a network
/// fetch; cache writes for freshly-fetched bytes are best-effort.
pub async fn download_bundles(
    backend: &dyn VaultBackend,
    cache: &Cache,
    vault_key: &VaultKey,
    assets: Vec<Asset>,
    ctx: &FetchContext,
    max_concurrency: usize,
) -> DownloadReport {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = Vec::with_capacity(assets.len());

    for asset in assets {
        if ctx.is_cancelled() {
            break;
        }
        let semaphore = Arc::clone(&semaphore);
        tasks.push(async move {
            let _permit = semaphore.acquire().await.expect("semaphore is never closed");
            if let Some(bytes) = cache.load_bundle(vault_key, &asset.name, &asset.version) {
                return (asset, Ok(bytes));
            }
            match backend.fetch_bundle(ctx, &asset).await {
                Ok(bytes) => {
                    cache.save_bundle(vault_key, &asset.name, &asset.version, &bytes);
                    (asset, Ok(bytes))
                }
                Err(error) => (asset, Err(error)),
            }
        });
    }

    let results = futures::future::join_all(tasks).await;
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for (asset, result) in results {
        match result {
            Ok(bytes) => successes.push(DownloadedBundle { asset, bytes }),
            Err(error) => {
                warn!(asset = %asset.name, %error, "failed to fetch bundle");
                failures.push(DownloadFailure { asset, error });
            }
        }
    }
    DownloadReport { successes, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetSource;
    use crate::vault::LocalPathVault;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn asset(name: &str, zip_name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            kind: crate::asset::AssetKind::Skill,
            config: HashMap::new(),
            scopes: vec![],
            clients: vec![],
            source: AssetSource::SourcePath { path: zip_name.to_string() },
            dependencies: vec![],
        }
    }

    #[tokio::test]
    async fn downloads_every_asset_independently() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.zip"), b"zip-a").unwrap();
        std::fs::write(dir.path().join("b.zip"), b"zip-b").unwrap();
        let backend = LocalPathVault::new(dir.path().to_path_buf());
        let cache_dir = tempdir().unwrap();
        let cache = Cache::new(cache_dir.path().to_path_buf());
        let key = VaultKey::new("local", "test-vault");

        let report = download_bundles(
            &backend,
            &cache,
            &key,
            vec![asset("a", "a.zip"), asset("b", "b.zip")],
            &FetchContext::default(),
            2,
        )
        .await;

        assert_eq!(report.successes.len(), 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_rest() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.zip"), b"zip-a").unwrap();
        let backend = LocalPathVault::new(dir.path().to_path_buf());
        let cache_dir = tempdir().unwrap();
        let cache = Cache::new(cache_dir.path().to_path_buf());
        let key = VaultKey::new("local", "test-vault");

        let report = download_bundles(
            &backend,
            &cache,
            &key,
            vec![asset("a", "a.zip"), asset("missing", "missing.zip")],
            &FetchContext::default(),
            2,
        )
        .await;

        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].asset.name, "missing");
    }

    #[tokio::test]
    async fn a_cached_bundle_skips_the_network() {
        let dir = tempdir().unwrap();
        let backend = LocalPathVault::new(dir.path().to_path_buf());
        let cache_dir = tempdir().unwrap();
        let cache = Cache::new(cache_dir.path().to_path_buf());
        let key = VaultKey::new("local", "test-vault");
        cache.save_bundle(&key, "a", "1.0.0", b"cached-bytes");

        let report = download_bundles(
            &backend,
            &cache,
            &key,
            vec![asset("a", "a.zip")],
            &FetchContext::default(),
            2,
        )
        .await;

        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.successes[0].bytes, b"cached-bytes");
    }
}
