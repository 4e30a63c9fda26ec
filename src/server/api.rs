use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use super::whatsapp::WhatsAppSettings;
use crate::assistant::{Assistant, ClearOutcome};
use crate::catalog::{Service, ServiceCatalog};
use crate::conversation::{ConversationStats, Message};
use crate::errors::{AssistantError, CatalogError};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub catalog: Arc<ServiceCatalog>,
    pub whatsapp: WhatsAppSettings,
}

pub type SharedState = Arc<AppState>;

// ── Request / response payloads ───────────────────────────────────────

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub cached: bool,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<AssistantError> for ApiError {
    fn from(e: AssistantError) -> Self {
        match e {
            AssistantError::EmptyQuestion => ApiError::BadRequest(e.to_string()),
            AssistantError::Model(_) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "Model call failed");
                ApiError::BadGateway(e.to_string())
            }
            AssistantError::Store(_) => {
                tracing::error!(error = %e, "Conversation store failed");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ServiceNotFound(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(chat_page).post(submit_question))
        .route("/api/ask", post(ask))
        .route("/api/history", get(history))
        .route("/api/stats", get(stats))
        .route("/services", get(list_services))
        .route("/services/{index}", get(get_service))
        .route("/clear", post(clear))
        .route("/health", get(health_check))
}

// ── Chat page ─────────────────────────────────────────────────────────

const CHAT_PAGE: &str = r#"<!doctype html>
<html lang="ar" dir="auto">
<head>
  <meta charset="utf-8">
  <title>docbot</title>
  <style>
    body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
    .message { padding: .5rem .75rem; margin: .5rem 0; border-radius: .5rem; white-space: pre-wrap; }
    .user { background: #e8f0fe; }
    .assistant { background: #f1f3f4; }
    form.ask { display: flex; gap: .5rem; }
    form.ask input { flex: 1; }
  </style>
</head>
<body>
  <h1>docbot</h1>
  {% for message in messages %}
  <div class="message {{ message.role }}"><strong>{{ message.role }}:</strong> {{ message.content }}</div>
  {% else %}
  <p>No messages yet.</p>
  {% endfor %}
  <form class="ask" method="post" action="/">
    <input name="question" autocomplete="off" autofocus required>
    <button type="submit">Send</button>
  </form>
  <form method="post" action="/clear"><button type="submit">Clear history</button></form>
</body>
</html>
"#;

fn render_chat_page(messages: &[Message]) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("chat.html", CHAT_PAGE)?;
    env.get_template("chat.html")?
        .render(context! { messages => messages })
}

async fn chat_page(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    let messages = state.assistant.history()?;
    let page = render_chat_page(&messages).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Html(page))
}

async fn submit_question(
    State(state): State<SharedState>,
    Form(form): Form<AskRequest>,
) -> Result<Redirect, ApiError> {
    state.assistant.ask(&form.question).await?;
    Ok(Redirect::to("/"))
}

// ── JSON API ──────────────────────────────────────────────────────────

async fn ask(
    State(state): State<SharedState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let answer = state.assistant.ask(&req.question).await?;
    Ok(Json(AskResponse {
        answer: answer.text,
        cached: answer.cached,
    }))
}

async fn history(State(state): State<SharedState>) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.assistant.history()?))
}

async fn stats(State(state): State<SharedState>) -> Result<Json<ConversationStats>, ApiError> {
    Ok(Json(state.assistant.stats()?))
}

async fn list_services(State(state): State<SharedState>) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.catalog.all()?))
}

async fn get_service(
    State(state): State<SharedState>,
    Path(index): Path<i64>,
) -> Result<Json<Service>, ApiError> {
    state
        .catalog
        .by_index(index)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Service not found".to_string()))
}

async fn clear(State(state): State<SharedState>) -> (StatusCode, Json<ClearOutcome>) {
    let outcome = state.assistant.clear_all().await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
