//! Session metadata derived from the conversation log on every save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default cap on the persisted log length.
pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Default number of verbatim messages sent to the model.
pub const DEFAULT_IMPORTANT_MESSAGES: usize = 6;

/// Policy settings for one conversation, echoed into the metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_history: usize,
    pub important_messages: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            important_messages: DEFAULT_IMPORTANT_MESSAGES,
        }
    }
}

/// Statistics record rewritten alongside the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub last_updated: DateTime<Utc>,
    pub total_messages: usize,
    #[serde(alias = "session_info")]
    pub config: SessionConfig,
}

impl SessionMetadata {
    pub fn new(total_messages: usize, config: SessionConfig) -> Self {
        Self {
            last_updated: Utc::now(),
            total_messages,
            config,
        }
    }
}
