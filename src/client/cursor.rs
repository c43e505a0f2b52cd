//! Cursor: rules, commands, agents, instructions, skills and MCP servers
//! only - no hooks, no Claude Code plugins.

use crate::client::generic::{GenericAssistantClient, delegating_client};

delegating_client!(Cursor);

impl Cursor {
    /// A fresh Cursor client.
    #[must_use]
    pub fn new() -> Self {
        Self(GenericAssistantClient::new("cursor", "Cursor", ".cursor", ".cursor", "AGENTS.md"))
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}
