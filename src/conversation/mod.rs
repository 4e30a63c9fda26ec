//! Conversation history management.
//!
//! ## Policies
//!
//! - **Bounding** (on every save): a log longer than `max_history` keeps its
//!   first two messages and the newest `max_history - 2`.
//! - **Compaction** (on every model call): a log longer than
//!   `important_messages` is sent as one digest message followed by the newest
//!   `important_messages` messages verbatim.
//!
//! Bounding limits what is kept on disk; compaction limits what the model sees.
//! The two are independent.
//!
//! ## Files
//!
//! ```text
//! history.json                 [{"role": "user", "content": "..."}, ...]
//! conversation_metadata.json   {"last_updated": ..., "total_messages": N, "config": {...}}
//! ```

mod bounding;
mod digest;
mod message;
mod metadata;
mod stats;
mod store;

pub use bounding::{CONTEXT_ANCHOR_LEN, bound_history};
pub use digest::{ConversationDigest, DIGEST_LABEL, NO_PRIOR_CONVERSATION, compact_for_model};
pub use message::{Message, Role};
pub use metadata::{
    DEFAULT_IMPORTANT_MESSAGES, DEFAULT_MAX_HISTORY, SessionConfig, SessionMetadata,
};
pub use stats::ConversationStats;
pub use store::ConversationStore;
