//! Aggregate statistics over a conversation log.

use serde::{Deserialize, Serialize};

use super::message::{Message, Role};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub ai_messages: usize,
    /// Mean user message length in characters; 0 when there are none.
    pub average_user_length: f64,
    /// Mean assistant/system message length in characters; 0 when there are none.
    pub average_ai_length: f64,
}

impl ConversationStats {
    pub fn from_messages(messages: &[Message]) -> Self {
        let (user, ai): (Vec<&Message>, Vec<&Message>) =
            messages.iter().partition(|m| m.role == Role::User);

        Self {
            total_messages: messages.len(),
            user_messages: user.len(),
            ai_messages: ai.len(),
            average_user_length: average_chars(&user),
            average_ai_length: average_chars(&ai),
        }
    }
}

fn average_chars(messages: &[&Message]) -> f64 {
    if messages.is_empty() {
        return 0.0;
    }
    let total: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    total as f64 / messages.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log() {
        let stats = ConversationStats::from_messages(&[]);
        assert_eq!(stats, ConversationStats::default());
    }

    #[test]
    fn test_counts_and_averages() {
        let log = vec![
            Message::user("abcd"),
            Message::assistant("ab"),
            Message::user("ab"),
            Message::system("abcdef"),
        ];
        let stats = ConversationStats::from_messages(&log);
        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.ai_messages, 2);
        assert!((stats.average_user_length - 3.0).abs() < f64::EPSILON);
        assert!((stats.average_ai_length - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        let stats = ConversationStats::from_messages(&[Message::user("مرحبا")]);
        assert!((stats.average_user_length - 5.0).abs() < f64::EPSILON);
    }
}
