//! The bundle format: a zip archive carrying an asset's files plus a
//! `metadata.toml` describing them.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// The `[asset]` section every bundle's `metadata.toml` must carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Asset name, expected to match the lock file entry.
    pub name: String,
    /// Asset kind key (`"skill"`, `"mcp"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Version, expected to match the lock file entry.
    pub version: String,
}

/// Parsed `metadata.toml`: the mandatory `[asset]` section plus whatever
/// per-kind sections (`[skill]`, `[mcp]`, `[claude-code-plugin]`, ...) the
/// bundle declares, kept as opaque TOML values for the relevant client to
/// interpret.
#[derive(Debug, Clone)]
pub struct BundleMetadata {
    /// The mandatory `[asset]` section.
    pub asset: AssetMetadata,
    /// Every other top-level section, keyed by section name.
    pub sections: HashMap<String, toml::Value>,
}

impl BundleMetadata {
    /// Parse `metadata.toml` bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).context("metadata.toml is not valid UTF-8")?;
        let mut doc: toml::Table =
            toml::from_str(text).context("failed to parse metadata.toml")?;
        let asset_value = doc
            .remove("asset")
            .context("metadata.toml is missing the required [asset] section")?;
        let asset: AssetMetadata =
            asset_value.try_into().context("metadata.toml [asset] section is malformed")?;
        Ok(Self { asset, sections: doc.into_iter().collect() })
    }

    /// Fetch a named section as a typed value, if present.
    pub fn section<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.sections.get(name) {
            None => Ok(None),
            Some(v) => {
                Ok(Some(v.clone().try_into().with_context(|| format!("malformed [{name}] section"))?))
            }
        }
    }
}

/// A bundle opened from its raw zip bytes.
pub struct Bundle {
    /// Parsed `metadata.toml`.
    pub metadata: BundleMetadata,
    archive_bytes: Vec<u8>,
}

impl Bundle {
    /// Open a bundle from raw zip bytes, eagerly parsing `metadata.toml`.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&bytes))
            .context("bundle is not a valid zip archive")?;
        let mut metadata_file = archive
            .by_name("metadata.toml")
            .context("bundle is missing metadata.toml")?;
        let mut contents = String::new();
        metadata_file
            .read_to_string(&mut contents)
            .context("failed to read metadata.toml from bundle")?;
        drop(metadata_file);
        let metadata = BundleMetadata::parse(contents.as_bytes())?;
        Ok(Self { metadata, archive_bytes: bytes })
    }

    /// Extract every archive entry into `dest`, preserving the archive's
    /// internal layout. Rejects entries that would escape `dest` via `..`
    /// path components (zip-slip protection).
    pub fn extract_all(&self, dest: &Path) -> Result<()> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&self.archive_bytes))
            .context("bundle is not a valid zip archive")?;
        std::fs::create_dir_all(dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(enclosed) = entry.enclosed_name() else {
                bail!("bundle entry '{}' has an unsafe path", entry.name());
            };
            let out_path = dest.join(enclosed);

            if entry.is_dir() {
                std::fs::create_dir_all(&out_path)?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out_file = std::fs::File::create(&out_path)
                .with_context(|| format!("failed to create {}", out_path.display()))?;
            std::io::copy(&mut entry, &mut out_file)?;
        }
        Ok(())
    }

    /// Read a single file's bytes out of the archive by its path within
    /// the bundle, e.g. `"SKILL.md"` or the path named by a metadata
    /// section.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&self.archive_bytes))
            .context("bundle is not a valid zip archive")?;
        let mut file = archive
            .by_name(name)
            .with_context(|| format!("bundle does not contain '{name}'"))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}
