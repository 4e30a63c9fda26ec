//! Language-model invocation.
//!
//! [`ChatModel`] is the seam between a turn and the remote API: it receives the
//! system prompt plus the (already compacted) conversation and returns one
//! assistant reply, running up to `max_turns` tool round trips on the way.

pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::conversation::Message;
use crate::errors::ModelError;

pub use openai::OpenAiClient;

/// Default cap on tool round trips per turn.
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// Executes tool calls requested by the model.
///
/// Failures are reported to the model as `{"error": ...}` values rather than
/// aborting the turn.
pub trait ToolExecutor: Send + Sync {
    fn descriptors(&self) -> Vec<ToolDescriptor>;

    fn call(&self, name: &str, arguments: Value) -> Value;
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub max_turns: u32,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    async fn complete(
        &self,
        request: ChatRequest,
        tools: Option<&dyn ToolExecutor>,
    ) -> Result<String, ModelError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory models for exercising turns without a network.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replies from a fixed script and records every request it sees.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: ModelError) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Err(error)])),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_request(&self) -> ChatRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ChatRequest,
            _tools: Option<&dyn ToolExecutor>,
        ) -> Result<String, ModelError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyResponse))
        }
    }
}
