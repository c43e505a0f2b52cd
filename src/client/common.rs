//! Shared installation primitives every client builds its per-kind
//! handler table from: destination-root resolution, managed markdown
//! sections, and managed JSON merges.
//!
//! The same idempotent-merge idea used for Claude Code's own settings
//! merging, generalized to "any managed section/entry this crate's
//! clients write".

use crate::asset::Asset;
use crate::client::InstallContext;
use crate::scope::Scope;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// The filesystem root a scope resolves to, before any client-specific
/// subdirectory is appended.
///
/// - [`Scope::Global`] -> the client's own global directory (e.g. `~/.claude`)
/// - [`Scope::Repository`] -> the current target directory (repo root)
/// - [`Scope::Path`] -> the target directory joined with the declared path
#[must_use]
pub fn destination_root(scope: &Scope, ctx: &InstallContext, global_dir: &Path) -> PathBuf {
    match scope {
        Scope::Global => global_dir.to_path_buf(),
        Scope::Repository { .. } => ctx.target_dir.clone(),
        Scope::Path { repo_path, .. } => ctx.target_dir.join(repo_path),
    }
}

/// The client's own directory for a scope: `global_dir` itself when
/// global, otherwise `<destination_root>/<local_dir_name>` (e.g.
/// `<repo>/.claude`).
#[must_use]
pub fn client_dir(
    scope: &Scope,
    ctx: &InstallContext,
    global_dir: &Path,
    local_dir_name: &str,
) -> PathBuf {
    match scope {
        Scope::Global => global_dir.to_path_buf(),
        _ => destination_root(scope, ctx, global_dir).join(local_dir_name),
    }
}

/// Markers that bound one asset's managed content inside a shared file.
fn markers(asset_name: &str) -> (String, String) {
    (format!("<!-- BEGIN VAULTSYNC: {asset_name} -->"), format!("<!-- END VAULTSYNC: {asset_name} -->"))
}

/// The header introducing the managed region the first time any asset is
/// merged into a previously asset-free file.
const SECTION_HEADER: &str = "## Shared Instructions";

/// Merge `body` into the managed section of a shared instructions/rules
/// file, keyed by `asset_name`, preserving everything outside the markers
/// byte-for-byte. Creates the file (and its parent directories, if they
/// don't exist yet) if absent.
pub fn merge_managed_section(path: &Path, asset_name: &str, body: &str) -> Result<()> {
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    let (begin, end) = markers(asset_name);
    let block = format!("{begin}\n{body}\n{end}");

    let updated = if let Some((start, finish)) = find_marker_span(&existing, &begin, &end) {
        format!("{}{}{}", &existing[..start], block, &existing[finish..])
    } else if existing.trim().is_empty() {
        format!("{SECTION_HEADER}\n\n{block}\n")
    } else if existing.contains(SECTION_HEADER) {
        // Append to the end of the existing managed section region.
        format!("{}\n{}\n", existing.trim_end(), block)
    } else {
        format!("{}\n\n{SECTION_HEADER}\n\n{block}\n", existing.trim_end())
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    crate::utils::fs::safe_write(path, &updated)
}

/// Remove `asset_name`'s managed block from a shared file. Leaves the file
/// in place (even if now empty of managed content) so user content is
/// never deleted as a side effect.
pub fn remove_managed_section(path: &Path, asset_name: &str) -> Result<()> {
    let Ok(existing) = std::fs::read_to_string(path) else {
        return Ok(());
    };
    let (begin, end) = markers(asset_name);
    let Some((start, finish)) = find_marker_span(&existing, &begin, &end) else {
        return Ok(());
    };
    let mut updated = existing[..start].to_string();
    updated.push_str(&existing[finish..]);
    crate::utils::fs::safe_write(path, updated.trim_end_matches('\n').to_string().as_str())
}

/// Is `asset_name`'s managed block present at all, regardless of content?
#[must_use]
pub fn managed_section_present(path: &Path, asset_name: &str) -> bool {
    let Ok(existing) = std::fs::read_to_string(path) else {
        return false;
    };
    let (begin, end) = markers(asset_name);
    find_marker_span(&existing, &begin, &end).is_some()
}

/// Does `asset_name`'s managed block exist, and does its body equal
/// `expected_body`?
#[must_use]
pub fn managed_section_matches(path: &Path, asset_name: &str, expected_body: &str) -> bool {
    let Ok(existing) = std::fs::read_to_string(path) else {
        return false;
    };
    let (begin, end) = markers(asset_name);
    let Some((start, finish)) = find_marker_span(&existing, &begin, &end) else {
        return false;
    };
    let inner = existing[start + begin.len()..finish - end.len()].trim();
    inner == expected_body.trim()
}

/// Find the byte span `[start, finish)` covering `begin..end` inclusive of
/// both markers, or `None` if the markers aren't both present in order.
fn find_marker_span(haystack: &str, begin: &str, end: &str) -> Option<(usize, usize)> {
    let start = haystack.find(begin)?;
    let end_marker_start = haystack[start..].find(end)? + start;
    let finish = end_marker_start + end.len();
    Some((start, finish))
}

/// Metadata tagging a managed JSON entry (mcp server, hook), so removal
/// can find exactly what it installed without touching user-authored
/// entries of the same shape.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManagedMeta {
    /// Always `true`; presence of this struct at all already implies it,
    /// but an explicit flag keeps deserialization forgiving about schema
    /// drift.
    pub managed: bool,
    /// The asset name that owns this entry.
    pub asset_name: String,
    /// Installed version, for drift detection during `verify`.
    pub version: String,
}

/// Load a JSON file as a mutable object, or an empty object if absent.
pub fn load_json_object(path: &Path) -> Result<serde_json::Map<String, Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {} as JSON", path.display()))?;
    Ok(value.as_object().cloned().unwrap_or_default())
}

/// Save a JSON object atomically, pretty-printed.
pub fn save_json_object(path: &Path, object: &serde_json::Map<String, Value>) -> Result<()> {
    crate::utils::fs::atomic_write_json(path, &Value::Object(object.clone()))
}

/// Merge one managed entry (keyed by `entry_key`, e.g. an MCP server name
/// or a synthetic hook key) into `container[section]`, tagging it with
/// `_vaultsync` metadata so a later uninstall can find it unambiguously.
pub fn merge_managed_entry(
    container: &mut serde_json::Map<String, Value>,
    section: &str,
    entry_key: &str,
    mut entry: Value,
    meta: &ManagedMeta,
) -> Result<()> {
    if let Some(obj) = entry.as_object_mut() {
        obj.insert("_vaultsync".to_string(), serde_json::to_value(meta)?);
    }
    let section_obj = container
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    section_obj
        .as_object_mut()
        .context("existing section is not a JSON object")?
        .insert(entry_key.to_string(), entry);
    Ok(())
}

/// Remove a managed entry by key, only if it carries `_vaultsync`
/// metadata (never touches a user-authored entry that happens to share
/// the name).
pub fn remove_managed_entry(
    container: &mut serde_json::Map<String, Value>,
    section: &str,
    entry_key: &str,
) {
    if let Some(section_obj) = container.get_mut(section).and_then(Value::as_object_mut) {
        let is_managed =
            section_obj.get(entry_key).and_then(|e| e.get("_vaultsync")).is_some();
        if is_managed {
            section_obj.remove(entry_key);
        }
        if section_obj.is_empty() {
            container.remove(section);
        }
    }
}

/// Does a managed entry exist at `section.entry_key` and report the given
/// version via its `_vaultsync` metadata?
#[must_use]
pub fn managed_entry_matches(
    container: &serde_json::Map<String, Value>,
    section: &str,
    entry_key: &str,
    expected_version: &str,
) -> bool {
    container
        .get(section)
        .and_then(|s| s.get(entry_key))
        .and_then(|e| e.get("_vaultsync"))
        .and_then(|m| m.get("version"))
        .and_then(Value::as_str)
        == Some(expected_version)
}

/// Resolve the asset's markdown body from its bundle: a per-kind config
/// key (`prompt-file`, default `"<kind>.md"`) names the archive entry.
pub fn read_prompt_file(bundle: &crate::bundle::Bundle, asset: &Asset, default_name: &str) -> Result<Vec<u8>> {
    let file_name = asset
        .config
        .get("prompt-file")
        .and_then(Value::as_str)
        .unwrap_or(default_name);
    bundle.read_file(file_name)
}
