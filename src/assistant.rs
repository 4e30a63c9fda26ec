//! One conversational turn, end to end.
//!
//! ```text
//! ask(question)
//!   ├─ cache hit ──────────────────────────────► cached answer
//!   └─ miss: lock turn → load log → append user message
//!            → compact → model (tools) → append reply
//!            → save (bounding + metadata) → cache insert
//! ```
//!
//! Turns are serialized by an async mutex held from load through save, so two
//! concurrent questions never read the same log and overwrite each other.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::cache::{QuestionCache, fingerprint};
use crate::catalog::ServiceCatalog;
use crate::config::DocbotConfig;
use crate::conversation::{ConversationStats, ConversationStore, Message, compact_for_model};
use crate::errors::{AssistantError, ModelError};
use crate::llm::{ChatModel, ChatRequest, DEFAULT_MAX_TURNS, OpenAiClient, ToolExecutor};
use crate::template::TemplateFiller;
use crate::tools::ToolRegistry;

/// Extra attempts after a retryable model failure.
const MODEL_RETRIES: u32 = 1;
const RETRY_DELAY: Duration = Duration::from_millis(500);

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant for a document services office. You answer \
questions about the available services and their prices, update prices when \
asked, and fill document templates with the current service list.

Reply in Saudi Arabic unless the user writes in another language.

Rules:
- Do not repeat answers to questions that were already answered; refer back \
to the earlier answer instead.
- Use the earlier conversation as context for follow-up questions.
- Use the available tools to look up services rather than guessing prices.";

/// Reply to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Served from the duplicate-question cache without calling the model
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearedItems {
    /// Messages removed from the log
    pub history: usize,
    /// Cache entries dropped
    pub cache: usize,
    /// Whether a metadata record existed and was deleted
    pub metadata: bool,
}

/// Result of a full clear. Failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearOutcome {
    pub status: ClearStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared_items: Option<ClearedItems>,
}

impl ClearOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ClearStatus::Success
    }
}

pub struct Assistant {
    store: ConversationStore,
    cache: QuestionCache,
    model: Arc<dyn ChatModel>,
    tools: Option<Arc<dyn ToolExecutor>>,
    system_prompt: String,
    max_turns: u32,
    turn_lock: Mutex<()>,
}

impl Assistant {
    pub fn new(store: ConversationStore, model: Arc<dyn ChatModel>) -> Self {
        Self {
            store,
            cache: QuestionCache::default(),
            model,
            tools: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_turns: DEFAULT_MAX_TURNS,
            turn_lock: Mutex::new(()),
        }
    }

    pub fn with_cache(mut self, cache: QuestionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Wire up the OpenAI client, store, cache and catalog tools from config.
    ///
    /// The history record is not read here, so a corrupt record can still be cleared.
    pub fn from_config(config: &DocbotConfig, catalog: Arc<ServiceCatalog>) -> Result<Self> {
        let section = &config.toml.model;
        let client = OpenAiClient::new(config.api_key())
            .with_model(config.model())
            .with_base_url(section.base_url.clone())
            .with_timeout(config.model_timeout());

        let store = ConversationStore::new(
            config.history_file(),
            config.metadata_file(),
            config.session_config(),
        );
        let cache = QuestionCache::new(config.toml.cache.capacity, config.toml.cache.retain);

        let mut tools = ToolRegistry::new(catalog);
        let template = config.template_file();
        if template.exists() {
            tools = tools.with_template(TemplateFiller::new(template, config.template_output()));
        } else {
            tracing::debug!(path = %template.display(), "No document template, fill_template disabled");
        }

        let mut assistant = Self::new(store, Arc::new(client))
            .with_cache(cache)
            .with_tools(Arc::new(tools))
            .with_max_turns(section.max_turns);
        if let Some(prompt) = &section.system_prompt {
            assistant = assistant.with_system_prompt(prompt.clone());
        }

        Ok(assistant)
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn cache(&self) -> &QuestionCache {
        &self.cache
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Answer `question`, from cache when it was asked before.
    pub async fn ask(&self, question: &str) -> Result<Answer, AssistantError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }

        let key = fingerprint(question);
        if let Some(text) = self.cache.lookup(&key) {
            tracing::info!(fingerprint = %key, "Cache hit");
            return Ok(Answer { text, cached: true });
        }

        let _turn = self.turn_lock.lock().await;

        // Another turn may have answered the same question while we waited.
        if let Some(text) = self.cache.lookup(&key) {
            tracing::info!(fingerprint = %key, "Cache hit");
            return Ok(Answer { text, cached: true });
        }
        tracing::debug!(fingerprint = %key, "Cache miss");

        let mut log = self.store.load()?;
        log.push(Message::user(question));

        let request = ChatRequest {
            system_prompt: self.system_prompt.clone(),
            messages: compact_for_model(&log, self.store.config().important_messages),
            max_turns: self.max_turns,
        };
        let reply = self.complete(request).await?;

        log.push(Message::assistant(reply.clone()));
        self.store.save(log)?;

        let evicted = self.cache.insert(key, reply.clone());
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.cache.len(), "Evicted cache entries");
        }

        Ok(Answer {
            text: reply,
            cached: false,
        })
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, ModelError> {
        let mut attempt = 0;
        loop {
            match self
                .model
                .complete(request.clone(), self.tools.as_deref())
                .await
            {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < MODEL_RETRIES => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, model = self.model.model(), "Retrying model call");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn history(&self) -> Result<Vec<Message>, AssistantError> {
        Ok(self.store.load()?)
    }

    pub fn stats(&self) -> Result<ConversationStats, AssistantError> {
        Ok(self.store.stats()?)
    }

    /// Clear the history record, the cache and the metadata record, in that order.
    pub async fn clear_all(&self) -> ClearOutcome {
        let _turn = self.turn_lock.lock().await;

        let result = (|| -> Result<ClearedItems, AssistantError> {
            // Unreadable records count as empty and are overwritten.
            let history = match self.store.load() {
                Ok(log) => log.len(),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable conversation history");
                    0
                }
            };
            self.store.clear()?;
            let cache = self.cache.len();
            self.cache.clear();
            let metadata = self.store.remove_metadata()?;
            Ok(ClearedItems {
                history,
                cache,
                metadata,
            })
        })();

        match result {
            Ok(items) => {
                tracing::info!(
                    history = items.history,
                    cache = items.cache,
                    metadata = items.metadata,
                    "Cleared conversation"
                );
                ClearOutcome {
                    status: ClearStatus::Success,
                    message: "Conversation history, cache and metadata cleared".to_string(),
                    cleared_items: Some(items),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to clear conversation");
                ClearOutcome {
                    status: ClearStatus::Error,
                    message: format!("Failed to clear conversation: {}", e),
                    cleared_items: None,
                }
            }
        }
    }
}
