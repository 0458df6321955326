use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable texts and limits for one shell session.
///
/// Every field has a default, so partial configuration files deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Line written once by [`crate::Session::start`] before the first prompt.
    pub greeting: Option<String>,
    /// Text written by the built-in `msg` command.
    pub welcome_message: String,
    /// Text written when no command matches the input.
    pub not_found_message: String,
    /// Text written by a linked context's `exit` command.
    pub farewell_message: String,
    /// Suffix echoed after the aborted input on interrupt.
    pub interrupt_marker: String,
    /// Maximum number of locally retained submissions; oldest entries drop first.
    pub history_limit: Option<usize>,
    /// Redraw period of the built-in `wait` command, in milliseconds.
    pub wait_tick_ms: u64,
    /// How long an interrupted command may keep running before the session drops it, in
    /// milliseconds.
    pub cancel_grace_ms: u64,
}

impl SessionConfig {
    /// Redraw period of the built-in `wait` command.
    pub fn wait_tick(&self) -> Duration {
        Duration::from_millis(self.wait_tick_ms.max(1))
    }

    /// Time an interrupted command gets to observe its cancellation token.
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: None,
            welcome_message: "Hello, World!".to_string(),
            not_found_message: "Command not found.".to_string(),
            farewell_message: "Bye!".to_string(),
            interrupt_marker: "^C".to_string(),
            history_limit: None,
            wait_tick_ms: 500,
            cancel_grace_ms: 1000,
        }
    }
}
