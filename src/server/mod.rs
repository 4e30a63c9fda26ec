//! HTTP surface: chat page, JSON API, service catalog and the WhatsApp webhook.

pub mod api;
pub mod whatsapp;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::assistant::Assistant;
use crate::catalog::ServiceCatalog;

pub use api::{ApiError, AppState, SharedState};
pub use whatsapp::{WhatsAppClient, WhatsAppSettings};

/// Configuration for the HTTP server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .merge(whatsapp::webhook_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Start the server and block until Ctrl+C.
pub async fn start_server(
    config: ServerConfig,
    assistant: Arc<Assistant>,
    catalog: Arc<ServiceCatalog>,
    whatsapp: WhatsAppSettings,
) -> Result<()> {
    let history_len = assistant
        .history()
        .context("Failed to load conversation history")?
        .len();
    tracing::info!(messages = history_len, "Conversation history ready");
    if whatsapp.verify_token.is_none() {
        tracing::warn!("No WhatsApp verify token configured, webhook verification will fail");
    }

    let state = Arc::new(AppState {
        assistant,
        catalog,
        whatsapp,
    });
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    println!("docbot running at http://{}", local_addr);
    tracing::info!(%local_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
