//! Context compaction for model calls.
//!
//! When the conversation is longer than the configured number of important
//! messages, everything older than that window is folded into a single
//! system message (the digest) so the payload sent to the model stays bounded
//! no matter how much history is kept on disk.

use super::message::{Message, Role};

/// First line of every digest message.
pub const DIGEST_LABEL: &str = "Summary of earlier conversation:";

/// Marks where the verbatim recent messages begin.
pub const DIGEST_FOOTER: &str = "---\nThe current conversation starts now:";

/// Digest body when nothing was folded.
pub const NO_PRIOR_CONVERSATION: &str = "No earlier conversation.";

/// Maximum excerpts listed per group.
pub const MAX_EXCERPTS: usize = 3;

/// Excerpt length in characters.
pub const EXCERPT_CHARS: usize = 100;

const EXCERPT_SEPARATOR: &str = " | ";

/// A literal digest of older messages: counts and leading excerpts per side.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationDigest {
    /// Number of messages folded into this digest.
    pub messages_summarized: usize,
    /// Total user messages among them.
    pub user_count: usize,
    /// Total assistant/system messages among them.
    pub ai_count: usize,
    /// First user messages, truncated.
    pub user_excerpts: Vec<String>,
    /// First assistant/system messages, truncated.
    pub ai_excerpts: Vec<String>,
}

impl ConversationDigest {
    pub fn from_messages(messages: &[Message]) -> Self {
        let user_count = messages.iter().filter(|m| m.role == Role::User).count();
        let ai_count = messages.len() - user_count;

        Self {
            messages_summarized: messages.len(),
            user_count,
            ai_count,
            user_excerpts: excerpts(messages, |r| r == Role::User),
            ai_excerpts: excerpts(messages, Role::is_ai),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages_summarized == 0
    }

    /// Body text without the label and footer.
    pub fn body(&self) -> String {
        if self.is_empty() {
            return NO_PRIOR_CONVERSATION.to_string();
        }

        let mut parts = Vec::new();
        if self.user_count > 0 {
            parts.push(format!(
                "Earlier user questions ({}): {}",
                self.user_count,
                self.user_excerpts.join(EXCERPT_SEPARATOR)
            ));
        }
        if self.ai_count > 0 {
            parts.push(format!(
                "Earlier answers ({}): {}",
                self.ai_count,
                self.ai_excerpts.join(EXCERPT_SEPARATOR)
            ));
        }
        parts.join("\n")
    }

    /// Full digest text as injected into the model payload.
    pub fn text(&self) -> String {
        format!("{}\n{}\n\n{}", DIGEST_LABEL, self.body(), DIGEST_FOOTER)
    }

    pub fn to_message(&self) -> Message {
        Message::system(self.text())
    }
}

fn excerpts(messages: &[Message], keep: impl Fn(Role) -> bool) -> Vec<String> {
    messages
        .iter()
        .filter(|m| keep(m.role))
        .take(MAX_EXCERPTS)
        .map(|m| m.content.chars().take(EXCERPT_CHARS).collect())
        .collect()
}

/// Build the message list sent to the model.
///
/// Logs of at most `important_messages` entries pass through unchanged.
/// Longer logs become one digest message followed by the newest
/// `important_messages` entries in their original order.
pub fn compact_for_model(log: &[Message], important_messages: usize) -> Vec<Message> {
    if log.len() <= important_messages {
        return log.to_vec();
    }

    let split = log.len() - important_messages;
    let (old, recent) = log.split_at(split);
    let digest = ConversationDigest::from_messages(old);

    tracing::debug!(
        folded = digest.messages_summarized,
        kept = recent.len(),
        "Compacted conversation for model call"
    );

    let mut payload = Vec::with_capacity(recent.len() + 1);
    payload.push(digest.to_message());
    payload.extend_from_slice(recent);
    payload
}
