//! Error types for vaultsync.
//!
//! Two layers, mirroring most Rust CLIs built around `thiserror` +
//! `anyhow`:
//!
//! - [`VaultError`] is a closed, matchable enum for the failure modes a
//!   caller might want to branch on (is this a cycle? a cache miss? a
//!   per-asset install failure?).
//! - [`ErrorContext`] wraps any [`anyhow::Error`] with an optional
//!   suggestion and detail string, and knows how to print itself in color
//!   for the CLI's final error report.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// All failure modes the reconciler can raise directly.
///
/// Per-asset and per-client failures during install/download are *not*
/// represented here - those are collected as data (see
/// [`crate::client::InstallStatus`]) rather than raised, since a single
/// asset failing must never abort the rest of the batch.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No configuration file could be found and none was supplied.
    #[error("no vaultsync configuration found")]
    ConfigMissing,

    /// Configuration exists but failed to parse or validate.
    #[error("invalid configuration: {reason}")]
    ConfigInvalid {
        /// Human-readable reason the configuration was rejected.
        reason: String,
    },

    /// The vault could not be reached and no cached lock file exists.
    #[error("vault unreachable and no cached lock file is available: {reason}")]
    VaultUnreachable {
        /// Underlying reason (network error, missing path, etc).
        reason: String,
    },

    /// The lock file's bytes could not be parsed.
    #[error("failed to parse lock file: {reason}")]
    LockFileParse {
        /// Parser error message.
        reason: String,
    },

    /// The lock file parsed but failed validation.
    #[error("lock file validation failed: {reason}")]
    LockFileInvalid {
        /// Validation failure reason.
        reason: String,
    },

    /// An unsupported `lock-version` was encountered.
    #[error("unsupported lock-version {found}, expected one of {supported:?}")]
    UnsupportedLockVersion {
        /// The version found in the file.
        found: i64,
        /// The versions this build understands.
        supported: Vec<i64>,
    },

    /// A dependency cycle was found while resolving the install set.
    #[error("dependency cycle detected: {cycle}")]
    DependencyCycle {
        /// The cycle, formatted as `a -> b -> c -> a`.
        cycle: String,
    },

    /// A dependency referenced by an asset cannot be satisfied under the
    /// current scope / client set.
    #[error("unsatisfiable dependency '{dependency}' required by '{dependent}'")]
    UnsatisfiableDependency {
        /// The asset that declared the dependency.
        dependent: String,
        /// The dependency name that could not be resolved.
        dependency: String,
    },

    /// No clients are available to install into.
    #[error("no detected or force-enabled clients available")]
    NoClients,

    /// `--clients` named client ids that do not intersect the detected set.
    #[error("--clients selected no clients that are detected or force-enabled")]
    EmptyClientIntersection,

    /// At least one per-asset-per-client install failed.
    #[error("{failed} of {attempted} installs failed")]
    PartialInstallFailure {
        /// Number of install attempts that failed.
        failed: usize,
        /// Total number of install attempts.
        attempted: usize,
    },

    /// The tracker file exists but has an unreadable/unsupported format.
    #[error("tracker file has unsupported format_version {found}")]
    UnsupportedTrackerVersion {
        /// Version found on disk.
        found: i64,
    },

    /// An I/O error, preserved with its path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being operated on.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Wraps any error with a user-facing suggestion and extra detail.
///
/// Mirrors the reporting style used throughout the CLI: errors are never
/// just a `Debug` dump, they carry a one-line cause, an optional detail
/// paragraph, and an optional actionable suggestion.
pub struct ErrorContext {
    error: anyhow::Error,
    suggestion: Option<String>,
    details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no suggestion or details yet.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self { error: error.into(), suggestion: None, details: None }
    }

    /// Attach an actionable suggestion, e.g. "run `vaultsync install --repair`".
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach extra explanatory detail.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, in color, to stderr.
    pub fn display(&self) {
        eprintln!("{}", self);
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", "error:".red().bold(), self.error)?;
        for cause in self.error.chain().skip(1) {
            writeln!(f, "  {} {}", "caused by:".dimmed(), cause)?;
        }
        if let Some(details) = &self.details {
            writeln!(f, "\n{}", details.dimmed())?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n{} {}", "suggestion:".cyan().bold(), suggestion)?;
        }
        Ok(())
    }
}

/// Convert any error raised at the top of `main` into an [`ErrorContext`]
/// with a suggestion tailored to the known [`VaultError`] variants, falling
/// back to a generic context for anything else.
#[must_use]
pub fn user_friendly_error(err: anyhow::Error) -> ErrorContext {
    if let Some(vault_err) = err.downcast_ref::<VaultError>() {
        let suggestion = match vault_err {
            VaultError::ConfigMissing => {
                Some("run `vaultsync init` to create a vault configuration".to_string())
            }
            VaultError::NoClients => {
                Some("force-enable a client in config.toml or pass --clients".to_string())
            }
            VaultError::DependencyCycle { .. } => {
                Some("edit the vault's lock file to remove the circular dependency".to_string())
            }
            VaultError::PartialInstallFailure { .. } => {
                Some("re-run `vaultsync install` to retry the failed installs".to_string())
            }
            VaultError::UnsupportedLockVersion { .. }
            | VaultError::UnsupportedTrackerVersion { .. } => {
                Some("upgrade vaultsync to a version that supports this file format".to_string())
            }
            _ => None,
        };
        let mut ctx = ErrorContext::new(err);
        if let Some(s) = suggestion {
            ctx = ctx.with_suggestion(s);
        }
        ctx
    } else {
        ErrorContext::new(err)
    }
}
