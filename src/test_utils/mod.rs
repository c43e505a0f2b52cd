//! Test fixtures: builders for lock files, bundles, and trackers that
//! integration tests assemble instead of hand-writing TOML/zip bytes in
//! every test body.
//!
//! Fixture builders plus a `TestEnvironment` temp-directory wrapper,
//! trimmed to the pieces this crate's reconciler tests actually need.

pub mod fixtures;

pub use fixtures::{AssetFixture, LockFileFixture, bundle_zip};

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for tests, once per process. Respects `RUST_LOG`
/// when set, otherwise uses `level`.
pub fn init_test_logging(level: Option<&str>) {
    INIT_LOGGING.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        } else {
            EnvFilter::new(level.unwrap_or("off"))
        };
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

/// A temp-directory-backed vault + target-dir pair for reconciler tests.
pub struct TestEnvironment {
    pub vault_dir: tempfile::TempDir,
    pub target_dir: tempfile::TempDir,
}

impl TestEnvironment {
    /// A fresh environment with an empty vault directory and an empty
    /// target directory (standing in for a project checkout).
    pub fn new() -> std::io::Result<Self> {
        Ok(Self { vault_dir: tempfile::tempdir()?, target_dir: tempfile::tempdir()? })
    }

    /// Write `vault.lock` into the vault directory.
    pub fn write_lock_file(&self, contents: &str) -> std::io::Result<()> {
        std::fs::write(self.vault_dir.path().join("vault.lock"), contents)
    }

    /// Write a bundle zip into the vault directory at the given
    /// vault-relative path, creating parent directories as needed.
    pub fn write_bundle(&self, relative_path: &str, bytes: &[u8]) -> std::io::Result<()> {
        let dest = self.vault_dir.path().join(relative_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, bytes)
    }
}
