//! # Configuration
//!
//! The bridge's own configuration surface. Deliberately small: the
//! repository owner the bridge serves, the phrase that triggers the comment
//! bridge, and the size of the mirrored context window.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// The default trigger phrase, matched case-insensitively inside review
/// comment bodies.
pub const DEFAULT_TRIGGER_PHRASE: &str = "take this to slack";

/// The default number of thread comments mirrored into the channel.
pub const DEFAULT_CONTEXT_WINDOW: usize = 15;

/// Configuration for a [`crate::PullBridge`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// The code-host account or organization whose repositories the bridge
    /// serves. Channel names embed only the repository name, so the slash
    /// command relay needs the owner from configuration to address the pull
    /// request.
    pub repository_owner: String,

    /// The phrase that fires the comment bridge
    pub trigger_phrase: String,

    /// Most recent N comments of a thread mirrored into the channel
    pub context_window: usize,
}

impl BridgeConfig {
    /// Builds a configuration with the default trigger phrase and window.
    pub fn new(repository_owner: impl Into<String>) -> Self {
        Self {
            repository_owner: repository_owner.into(),
            trigger_phrase: DEFAULT_TRIGGER_PHRASE.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}
