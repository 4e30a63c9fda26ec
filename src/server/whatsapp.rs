//! WhatsApp Cloud API webhook.
//!
//! `GET /webhook` answers Meta's subscription handshake. `POST /webhook`
//! receives message notifications, runs a turn for the first text message
//! and sends the reply back through the Graph API. Notifications are always
//! acknowledged with `{"status":"ok"}` so Meta does not redeliver them.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::api::SharedState;
use crate::errors::WhatsAppError;
use crate::llm::openai::build_http_client;

const FALLBACK_REPLY: &str = "Sorry, I could not answer right now. Please try again later.";

/// Outbound text messages through the Graph API.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
    access_token: String,
    phone_number_id: String,
}

impl WhatsAppClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
    ) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
        }
    }

    /// Build a client when both credentials are present.
    pub fn from_credentials(
        base_url: &str,
        access_token: Option<String>,
        phone_number_id: Option<String>,
    ) -> Result<Self, WhatsAppError> {
        match (access_token, phone_number_id) {
            (Some(token), Some(phone)) => Ok(Self::new(base_url, token, phone)),
            _ => Err(WhatsAppError::NotConfigured),
        }
    }

    pub async fn send_text(&self, to: &str, body: &str) -> Result<(), WhatsAppError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": {"body": body},
        });
        let response = self
            .client
            .post(format!("{}/{}/messages", self.base_url, self.phone_number_id))
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Webhook settings carried in the server state.
#[derive(Clone, Default)]
pub struct WhatsAppSettings {
    pub verify_token: Option<String>,
    /// `None` when credentials are missing; replies are then dropped
    pub client: Option<WhatsAppClient>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Sender and text of an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingText {
    pub from: String,
    pub body: String,
}

/// Pull `entry[0].changes[0].value.messages[0]` out of a notification.
pub fn extract_text_message(payload: &Value) -> Option<IncomingText> {
    let message = payload.pointer("/entry/0/changes/0/value/messages/0")?;
    let from = message.get("from")?.as_str()?;
    let body = message.pointer("/text/body")?.as_str()?;
    Some(IncomingText {
        from: from.to_string(),
        body: body.to_string(),
    })
}

pub fn webhook_router() -> Router<SharedState> {
    Router::new().route("/webhook", get(verify).post(receive))
}

async fn verify(State(state): State<SharedState>, Query(params): Query<VerifyParams>) -> Response {
    let expected = state.whatsapp.verify_token.as_deref();
    let subscribed = params.mode.as_deref() == Some("subscribe");
    match (expected, params.verify_token.as_deref(), params.challenge) {
        (Some(expected), Some(given), Some(challenge)) if subscribed && expected == given => {
            tracing::info!("WhatsApp webhook verified");
            challenge.into_response()
        }
        _ => {
            tracing::warn!(mode = ?params.mode, "WhatsApp webhook verification failed");
            (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "verification failed"})),
            )
                .into_response()
        }
    }
}

async fn receive(State(state): State<SharedState>, Json(payload): Json<Value>) -> Json<Value> {
    let Some(incoming) = extract_text_message(&payload) else {
        tracing::debug!("Ignoring webhook notification without a text message");
        return Json(json!({"status": "ok"}));
    };
    tracing::info!(from = %incoming.from, "WhatsApp message received");

    let reply = match state.assistant.ask(&incoming.body).await {
        Ok(answer) => answer.text,
        Err(e) => {
            tracing::warn!(error = %e, from = %incoming.from, "Failed to answer WhatsApp message");
            FALLBACK_REPLY.to_string()
        }
    };

    match &state.whatsapp.client {
        Some(client) => {
            if let Err(e) = client.send_text(&incoming.from, &reply).await {
                tracing::error!(error = %e, to = %incoming.from, "Failed to send WhatsApp reply");
            }
        }
        None => tracing::warn!("WhatsApp credentials missing, reply not sent"),
    }

    Json(json!({"status": "ok"}))
}
