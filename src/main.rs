//! vaultsync CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vaultsync_cli::cli;
use vaultsync_cli::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = cli.build_config();

    // Logging precedence:
    // 1. RUST_LOG set, --verbose not set -> use RUST_LOG
    // 2. RUST_LOG set, --verbose set     -> still use RUST_LOG
    // 3. RUST_LOG unset, --verbose set   -> debug
    // 4. RUST_LOG unset, --verbose unset -> off
    let rust_log_exists = std::env::var("RUST_LOG").is_ok();
    let is_verbose = config.log_level.as_deref() == Some("debug");

    let filter = if rust_log_exists {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if is_verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("off")
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_thread_ids(false).init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute_with_config(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
