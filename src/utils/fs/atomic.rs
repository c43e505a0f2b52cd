//! Atomic file write operations using the temp-then-rename strategy.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Write a string to a file atomically.
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize JSON for {}", path.display()))?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write bytes to `path`: write to `path.tmp`, sync, rename.
///
/// Prevents readers from ever observing a partially written file, and
/// ensures a crash mid-write leaves the previous contents (or nothing)
/// rather than a corrupt half-file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("failed to write temp file: {}", temp_path.display()))?;
        file.sync_all().context("failed to sync temp file to disk")?;
    }

    fs::rename(&temp_path, path).with_context(|| {
        format!("failed to rename {} to {}", temp_path.display(), path.display())
    })?;

    Ok(())
}
