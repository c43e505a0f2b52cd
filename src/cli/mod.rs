//! Command-line interface.
//!
//! `install` is the reconciler entry point and the only command this
//! build implements fully; the rest of the manifest-editing surface
//! (`add`, `init`, `profile`, `clients enable|disable`) exists as stubs so
//! the help text documents the intended shape without claiming support
//! this build doesn't have.

pub mod install;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

/// Translates parsed CLI flags into a [`crate::config::RuntimeConfig`]
/// without mutating the environment - a dependency-injection pattern so
/// tests can drive execution without touching global state.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `RUST_LOG`-compatible level string, or `None` to leave logging as
    /// `RUST_LOG`/the default rules decide.
    pub log_level: Option<String>,
}

/// vaultsync: reconcile a shared vault of AI-assistant augmentations
/// against the installed state of several coding assistants.
#[derive(Parser)]
#[command(name = "vaultsync", about = "Reconcile AI-assistant augmentations across clients", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the vault's lock file against every detected client.
    Install(install::InstallArgs),
    /// Initialize a new vault manifest. Not yet available.
    Init,
    /// Add a source or dependency to a vault manifest. Not yet available.
    Add,
    /// Manage named install profiles. Not yet available.
    Profile,
    /// Enable or disable a client in global configuration. Not yet available.
    Clients {
        #[command(subcommand)]
        action: ClientsAction,
    },
}

#[derive(Subcommand)]
enum ClientsAction {
    /// Force-enable a client. Not yet available.
    Enable,
    /// Force-disable a client. Not yet available.
    Disable,
}

impl Cli {
    /// Parse CLI flags into a [`CliConfig`] (the logging setup in `main`
    /// consults `RUST_LOG` first; this only carries the `--verbose`
    /// override).
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        CliConfig { log_level: self.verbose.then(|| "debug".to_string()) }
    }

    /// Dispatch to the selected subcommand.
    pub async fn execute_with_config(self, _config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Install(cmd) => cmd.execute().await,
            Commands::Init | Commands::Add | Commands::Profile => not_yet_available(),
            Commands::Clients { .. } => not_yet_available(),
        }
    }
}

fn not_yet_available() -> Result<()> {
    bail!("this command is not yet available in this build of vaultsync")
}
