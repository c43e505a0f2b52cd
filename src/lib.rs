//! vaultsync - reconciles a shared vault of AI-assistant augmentations
//! against the installed state of several coding assistants.
//!
//! # Architecture
//!
//! vaultsync follows a manifest/lockfile model similar to a code package
//! manager, but the thing it converges is *assistant configuration*, not
//! compiled artifacts:
//!
//! - a **vault** (local directory, git repo, or HTTP endpoint) holds a lock
//!   file and the zipped bundles it references
//! - the lock file declares assets (skills, rules, commands, agents,
//!   instructions, hooks, MCP servers, plugins) with scopes and client
//!   compatibility
//! - a **tracker** records what was previously installed and for which
//!   clients
//! - the **reconciler** diffs the lock file against the tracker and the
//!   live filesystem of every detected client, then downloads, installs,
//!   and cleans up to converge
//!
//! # Core modules
//!
//! - [`scope`] - the three-level scope lattice (global / repository / path)
//! - [`asset`] - the typed asset model
//! - [`lockfile`] - parsing, validation, and dependency-ordered resolution
//! - [`tracker`] - the persisted "what's installed where" record
//! - [`cache`] - content- and ETag-addressed local storage
//! - [`vault`] - the fetch surface over vault backends
//! - [`client`] - per-assistant installation strategies
//! - [`bundle`] - the zip bundle format and metadata
//! - [`downloader`] - bounded-concurrency bundle fetching
//! - [`orchestrator`] - concurrent multi-client installation
//! - [`reconciler`] - the main driver algorithm
//! - [`hookmode`] - the hook-mode JSON emitter and session fast-path
//! - [`config`] - global and runtime configuration
//! - [`core`] - error types and shared primitives
//! - [`cli`] - command-line interface
//! - [`utils`] - cross-platform filesystem helpers

pub mod asset;
pub mod bundle;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod downloader;
pub mod hookmode;
pub mod lockfile;
pub mod orchestrator;
pub mod reconciler;
pub mod scope;
pub mod tracker;
pub mod utils;
pub mod vault;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
