//! The hook-mode JSON emitter: exactly one JSON line on stdout, no ANSI
//! outside `systemMessage`.

use serde::Serialize;

/// The single document hook mode ever writes to stdout.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HookResponse {
    /// Always `true`: vaultsync never asks the triggering client to stop.
    #[serde(rename = "continue")]
    pub proceed: bool,
    /// A short human-readable summary, omitted entirely when nothing
    /// installed.
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookResponse {
    /// The bare fast-path response: nothing happened, proceed.
    #[must_use]
    pub fn fast_path() -> Self {
        Self { proceed: true, system_message: None }
    }

    /// Build the response for a completed reconcile, naming up to three
    /// installed assets with "and N more" overflow. An empty list still
    /// emits `{"continue": true}` with no message.
    #[must_use]
    pub fn for_installed(installed_names: &[String]) -> Self {
        if installed_names.is_empty() {
            return Self::fast_path();
        }
        let message = if installed_names.len() == 1 {
            format!("vaultsync installed {}.", installed_names[0])
        } else {
            let mut lines: Vec<String> =
                installed_names.iter().take(3).map(|n| format!("- {n}")).collect();
            if installed_names.len() > 3 {
                lines.push(format!("and {} more", installed_names.len() - 3));
            }
            format!("vaultsync installed:\n{}", lines.join("\n"))
        };
        Self { proceed: true, system_message: Some(message) }
    }

    /// Print this response as the one permitted line of stdout output.
    pub fn emit(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}
