//! GitHub Copilot: rules, commands, agents, instructions, skills and MCP
//! servers only - no hooks, no Claude Code plugins.

use crate::client::generic::{GenericAssistantClient, delegating_client};

delegating_client!(Copilot);

impl Copilot {
    /// A fresh GitHub Copilot client.
    #[must_use]
    pub fn new() -> Self {
        Self(GenericAssistantClient::new(
            "github-copilot",
            "GitHub Copilot",
            ".github",
            ".config/github-copilot",
            "copilot-instructions.md",
        ))
    }
}

impl Default for Copilot {
    fn default() -> Self {
        Self::new()
    }
}
