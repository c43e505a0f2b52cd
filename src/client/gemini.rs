//! Gemini Code Assist: rules, commands, agents, instructions, skills and
//! MCP servers only - no hooks, no Claude Code plugins.

use crate::client::generic::{GenericAssistantClient, delegating_client};

delegating_client!(Gemini);

impl Gemini {
    /// A fresh Gemini Code Assist client.
    #[must_use]
    pub fn new() -> Self {
        Self(GenericAssistantClient::new("gemini", "Gemini Code Assist", ".gemini", ".gemini", "GEMINI.md"))
    }
}

impl Default for Gemini {
    fn default() -> Self {
        Self::new()
    }
}
