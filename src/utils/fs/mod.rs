//! Atomic file writes and standard directory locations.
//!
//! Every config file a client touches (trackers, `mcp.json`, `hooks.json`,
//! `settings.json`, managed-section files) goes through
//! [`atomic_write`]/[`atomic_write_json`]: write to a temp file on the same
//! volume, sync, then rename. Readers never observe a partial write.

pub mod atomic;
pub mod dirs;

pub use atomic::{atomic_write, atomic_write_json, safe_write};
pub use dirs::{cache_dir, config_dir};
