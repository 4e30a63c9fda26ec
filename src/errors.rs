//! Typed error hierarchy for docbot.
//!
//! One enum per subsystem:
//! - `StoreError`: conversation log and metadata persistence
//! - `ModelError`: chat-completion calls and the tool loop
//! - `CatalogError`: service catalog loading and edits
//! - `TemplateError`: document template rendering
//! - `AssistantError`: a full turn, wrapping the above
//! - `WhatsAppError`: outbound WhatsApp Cloud API messages

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the on-disk conversation store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize record for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the language-model client.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("Model request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model returned no message")]
    EmptyResponse,

    #[error("Model still requested tools after {turns} turns")]
    ToolLoopExhausted { turns: u32 },
}

impl ModelError {
    /// Whether retrying the same turn later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Timeout { .. } => true,
            ModelError::Http(e) => e.is_timeout() || e.is_connect(),
            ModelError::Status { status, .. } => *status == 429 || *status >= 500,
            ModelError::MissingApiKey
            | ModelError::EmptyResponse
            | ModelError::ToolLoopExhausted { .. } => false,
        }
    }
}

/// Errors from the service catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Catalog lock poisoned")]
    LockPoisoned,
}

/// Errors from template rendering.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("Failed to write filled document {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from a single assistant turn.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AssistantError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssistantError::Model(e) if e.is_retryable())
    }
}

/// Errors sending a reply through the WhatsApp Cloud API.
#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("WhatsApp sending is not configured (set WHATSAPP_ACCESS_TOKEN and WHATSAPP_PHONE_NUMBER_ID)")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API returned {status}: {body}")]
    Status { status: u16, body: String },
}
