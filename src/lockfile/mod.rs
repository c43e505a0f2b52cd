//! Lock file parsing, validation, and dependency-ordered resolution.
//!
//! The lock file is the declarative catalog a vault ships: a sequence of
//! [`Asset`](crate::asset::Asset) entries plus a small header, serialized
//! as TOML.

pub mod resolve;
pub mod validate;

pub use resolve::{CycleError, resolve};
pub use validate::ValidationError;

use crate::asset::Asset;
use crate::core::VaultError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The set of `lock-version` values this build understands.
pub const SUPPORTED_LOCK_VERSIONS: &[i64] = &[1];

/// A parsed lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    /// Format version of the lock file itself.
    #[serde(rename = "lock-version")]
    pub lock_version: i64,
    /// Human-facing content version (e.g. a vault release tag).
    pub version: String,
    /// Tool/version that produced this lock file.
    #[serde(rename = "created-by")]
    pub created_by: String,
    /// The declared assets.
    #[serde(rename = "asset", default)]
    pub assets: Vec<Asset>,
}

impl LockFile {
    /// Parse lock file bytes, rejecting unsupported `lock-version`s.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).context("lock file is not valid UTF-8")?;
        let parsed: Self = toml::from_str(text).map_err(|e| VaultError::LockFileParse {
            reason: e.to_string(),
        })?;
        if !SUPPORTED_LOCK_VERSIONS.contains(&parsed.lock_version) {
            return Err(VaultError::UnsupportedLockVersion {
                found: parsed.lock_version,
                supported: SUPPORTED_LOCK_VERSIONS.to_vec(),
            }
            .into());
        }
        Ok(parsed)
    }

    /// Serialize back to TOML bytes. Asset ordering is not guaranteed to
    /// match the original file (spec's round-trip law only requires the
    /// dependency topology to survive, not literal ordering).
    pub fn serialize(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize lock file")
    }

    /// Validate structural invariants: every dependency name exists, no
    /// duplicate `(name, version)` pairs, every asset has a source.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validate::validate(&self.assets)
    }

    /// Look up an asset by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetKind, AssetSource};
    use std::collections::HashMap;

    fn minimal_asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            kind: AssetKind::Skill,
            config: HashMap::new(),
            scopes: vec![],
            clients: vec![],
            source: AssetSource::SourcePath { path: format!("{name}.zip") },
            dependencies: vec![],
        }
    }

    #[test]
    fn parse_rejects_unsupported_lock_version() {
        let toml = r#"
lock-version = 99
version = "1.0.0"
created-by = "vaultsync"
"#;
        let err = LockFile::parse(toml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("lock-version") || err.to_string().contains("99"));
    }

    #[test]
    fn round_trips_through_serialize_and_parse() {
        let lf = LockFile {
            lock_version: 1,
            version: "1.0.0".to_string(),
            created_by: "vaultsync 0.1.0".to_string(),
            assets: vec![minimal_asset("a"), minimal_asset("b")],
        };
        let text = lf.serialize().unwrap();
        let reparsed = LockFile::parse(text.as_bytes()).unwrap();
        let mut original_names: Vec<_> = lf.assets.iter().map(|a| a.name.clone()).collect();
        let mut reparsed_names: Vec<_> = reparsed.assets.iter().map(|a| a.name.clone()).collect();
        original_names.sort();
        reparsed_names.sort();
        assert_eq!(original_names, reparsed_names);
        assert_eq!(lf.lock_version, reparsed.lock_version);
    }

    #[test]
    fn find_looks_up_by_name() {
        let lf = LockFile {
            lock_version: 1,
            version: "1.0.0".to_string(),
            created_by: "vaultsync".to_string(),
            assets: vec![minimal_asset("a")],
        };
        assert!(lf.find("a").is_some());
        assert!(lf.find("missing").is_none());
    }
}
