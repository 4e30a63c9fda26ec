//! HTTP server command: `docbot serve`.

use anyhow::Result;

use docbot::config::DocbotConfig;
use docbot::server::{ServerConfig, WhatsAppClient, WhatsAppSettings, start_server};

use super::open_assistant;

pub async fn cmd_serve(config: &DocbotConfig, port: Option<u16>, host: Option<String>) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let (assistant, catalog) = open_assistant(config)?;

    let client = match WhatsAppClient::from_credentials(
        &config.toml.whatsapp.graph_base_url,
        config.whatsapp_access_token(),
        config.whatsapp_phone_number_id(),
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::info!("{}; WhatsApp replies disabled", e);
            None
        }
    };
    let whatsapp = WhatsAppSettings {
        verify_token: config.whatsapp_verify_token(),
        client,
    };

    let server = ServerConfig {
        host: host.unwrap_or_else(|| config.toml.server.host.clone()),
        port: port.unwrap_or(config.toml.server.port),
    };
    tracing::info!(model = assistant.model_name(), "Starting docbot server");

    start_server(server, assistant, catalog, whatsapp).await
}
