//! History bounding applied before every save.
//!
//! An over-long log keeps its opening exchange (the context anchor) and the
//! most recent messages (the recent window); everything in between is dropped.

use super::message::Message;

/// Number of leading messages preserved across bounding.
pub const CONTEXT_ANCHOR_LEN: usize = 2;

/// Bound `log` to at most `max_history` messages.
///
/// Logs at or under the limit are returned unchanged. Otherwise the result is
/// the first `min(2, max_history)` messages followed by the last
/// `max_history - anchor` messages. The window never reaches back into the
/// anchor, so no message appears twice.
pub fn bound_history(log: Vec<Message>, max_history: usize) -> Vec<Message> {
    if log.len() <= max_history {
        return log;
    }

    let anchor = CONTEXT_ANCHOR_LEN.min(max_history);
    let window = max_history - anchor;
    let window_start = log.len().saturating_sub(window).max(anchor);

    let mut bounded = Vec::with_capacity(max_history);
    let mut rest = log.into_iter();
    bounded.extend(rest.by_ref().take(anchor));
    bounded.extend(rest.skip(window_start - anchor));
    bounded
}
