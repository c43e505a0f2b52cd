//! The three-level scope lattice and the matcher that decides whether a
//! declared scope applies to the current working context.
//!
//! `Global` declarations apply everywhere. `Repository` declarations apply
//! anywhere inside a given repo. `Path` declarations apply only under a
//! specific path of a specific repo. Containment is existential: an asset
//! applies if *any* of its declared scopes contains the current context.

use serde::{Deserialize, Serialize};

/// A single point in the scope lattice: where does the current invocation
/// sit, or where was an asset declared to apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Scope {
    /// Applies to every context.
    Global,
    /// Applies anywhere inside the named repository.
    Repository {
        /// Normalized repository URL.
        repo_url: String,
    },
    /// Applies only under a specific path within a repository.
    Path {
        /// Normalized repository URL.
        repo_url: String,
        /// Cleaned, repo-relative path.
        repo_path: String,
    },
}

impl Scope {
    /// Build the current context from a detected git remote and a
    /// repo-relative path. `repo_url = None` means we're not inside a git
    /// repo at all, so the context is [`Scope::Global`].
    #[must_use]
    pub fn current(repo_url: Option<&str>, repo_relative_path: Option<&str>) -> Self {
        let Some(repo_url) = repo_url else {
            return Self::Global;
        };
        let repo_url = normalize_repo_url(repo_url);
        match repo_relative_path {
            Some(p) if !p.is_empty() && p != "." => {
                Self::Path { repo_url, repo_path: clean_path(p) }
            }
            _ => Self::Repository { repo_url },
        }
    }

    /// Does `self` (a *declared* scope) contain `context` (the *current*
    /// invocation context)?
    #[must_use]
    pub fn contains(&self, context: &Scope) -> bool {
        match self {
            Self::Global => true,
            Self::Repository { repo_url } => match context {
                Self::Global => false,
                Self::Repository { repo_url: c } | Self::Path { repo_url: c, .. } => {
                    repo_url == c
                }
            },
            Self::Path { repo_url, repo_path } => match context {
                Self::Path { repo_url: c_url, repo_path: c_path } => {
                    repo_url == c_url && is_prefix(repo_path, c_path)
                }
                _ => false,
            },
        }
    }

    /// Repository url for non-global scopes, if any.
    #[must_use]
    pub fn repo_url(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Repository { repo_url } | Self::Path { repo_url, .. } => Some(repo_url),
        }
    }

    /// Repo-relative path for path scopes, empty string otherwise - this
    /// matches the tracker's convention of an empty path meaning
    /// "repo-wide".
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Path { repo_path, .. } => repo_path,
            _ => "",
        }
    }
}

/// Does a set of declared scopes match the current context?
///
/// An empty declared-scopes list is not handled here - callers should treat
/// "no scopes declared" as global before calling this (see
/// [`crate::asset::Asset::is_global`]).
#[must_use]
pub fn matches(declared: &[Scope], context: &Scope) -> bool {
    declared.iter().any(|s| s.contains(context))
}

/// Lexical prefix check after cleaning: `services/` is a prefix of
/// `services/api/src`, but not of `services-other/`.
fn is_prefix(declared: &str, candidate: &str) -> bool {
    let declared = clean_path(declared);
    let candidate = clean_path(candidate);
    if declared.is_empty() {
        return true;
    }
    candidate == declared || candidate.starts_with(&format!("{declared}/"))
}

/// Strip leading/trailing slashes and collapse `./`, leaving a clean
/// repo-relative path with no leading or trailing slash.
fn clean_path(p: &str) -> String {
    p.trim_matches('/').split('/').filter(|seg| !seg.is_empty() && *seg != ".").collect::<Vec<_>>().join("/")
}

/// Normalize a repository URL for equality comparison: lower-case host,
/// strip a trailing `.git`, and strip the `user@` fragment of an SSH-form
/// remote (`git@github.com:org/repo.git` -> `github.com/org/repo`).
#[must_use]
pub fn normalize_repo_url(raw: &str) -> String {
    let mut s = raw.trim().to_string();

    // SSH form: git@host:org/repo(.git)?
    if let Some(rest) = s.strip_prefix("git@") {
        if let Some((host, path)) = rest.split_once(':') {
            s = format!("{host}/{path}");
        } else {
            s = rest.to_string();
        }
    }

    // Strip a scheme if present (https://, ssh://, git://).
    for scheme in ["https://", "http://", "ssh://", "git://"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            s = rest.to_string();
            break;
        }
    }

    // Strip a user@ prefix left over from an ssh:// form.
    if let Some(idx) = s.find('@') {
        if !s[..idx].contains('/') {
            s = s[idx + 1..].to_string();
        }
    }

    let s = s.strip_suffix(".git").unwrap_or(&s);
    let s = s.trim_end_matches('/');

    // Lower-case only the host segment (first path component).
    match s.split_once('/') {
        Some((host, rest)) => format!("{}/{}", host.to_lowercase(), rest),
        None => s.to_lowercase(),
    }
}
