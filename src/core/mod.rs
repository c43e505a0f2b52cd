//! Core types shared across vaultsync: errors and the client identifier
//! newtype used everywhere a client is referenced by id.

pub mod error;

pub use error::{ErrorContext, VaultError, user_friendly_error};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A client identifier, e.g. `"claude-code"`, `"cursor"`.
///
/// A thin newtype rather than a bare `String` so call sites that expect a
/// client id can't accidentally be handed an asset name or a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    /// Build a client id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
