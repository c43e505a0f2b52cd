//! Structural validation of a parsed lock file.

use crate::asset::Asset;
use std::collections::HashSet;
use thiserror::Error;

/// Why a lock file failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// An asset's `dependencies` list names a non-existent asset.
    #[error("asset '{asset}' depends on unknown asset '{dependency}'")]
    UnknownDependency {
        /// The dependent asset's name.
        asset: String,
        /// The missing dependency's name.
        dependency: String,
    },

    /// Two assets share both `name` and `version`.
    #[error("duplicate asset entry: {name}@{version}")]
    DuplicateAsset {
        /// The shared name.
        name: String,
        /// The shared version.
        version: String,
    },

    /// A scope declaration has an empty `repo`.
    #[error("asset '{asset}' has a scope declaration with an empty repo")]
    EmptyScopeRepo {
        /// The offending asset's name.
        asset: String,
    },
}

/// Validate structural invariants over a full asset list.
pub fn validate(assets: &[Asset]) -> Result<(), ValidationError> {
    let names: HashSet<&str> = assets.iter().map(|a| a.name.as_str()).collect();

    let mut seen = HashSet::new();
    for asset in assets {
        if !seen.insert((asset.name.as_str(), asset.version.as_str())) {
            return Err(ValidationError::DuplicateAsset {
                name: asset.name.clone(),
                version: asset.version.clone(),
            });
        }

        for dep in &asset.dependencies {
            if !names.contains(dep.as_str()) {
                return Err(ValidationError::UnknownDependency {
                    asset: asset.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        for scope in &asset.scopes {
            if scope.repo.trim().is_empty() {
                return Err(ValidationError::EmptyScopeRepo { asset: asset.name.clone() });
            }
        }
    }

    Ok(())
}
