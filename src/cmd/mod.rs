//! CLI command implementations.
//!
//! | Module     | Commands handled                                 |
//! |------------|--------------------------------------------------|
//! | `serve`    | `Serve`                                          |
//! | `chat`     | `Ask`, `History`, `Stats`, `Clear`               |
//! | `services` | `Services`                                       |
//! | `config`   | `Config`                                         |

pub mod chat;
pub mod config;
pub mod serve;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};

use docbot::assistant::Assistant;
use docbot::catalog::ServiceCatalog;
use docbot::config::DocbotConfig;

pub use chat::{cmd_ask, cmd_clear, cmd_history, cmd_stats};
pub use config::cmd_config;
pub use serve::cmd_serve;
pub use services::cmd_services;

pub(crate) fn load_catalog(config: &DocbotConfig) -> Result<Arc<ServiceCatalog>> {
    let path = config.catalog_file();
    let catalog = ServiceCatalog::load(&path)
        .with_context(|| format!("Failed to load service catalog {}", path.display()))?;
    Ok(Arc::new(catalog))
}

pub(crate) fn open_assistant(config: &DocbotConfig) -> Result<(Arc<Assistant>, Arc<ServiceCatalog>)> {
    let catalog = load_catalog(config)?;
    let assistant = Assistant::from_config(config, catalog.clone())?;
    Ok((Arc::new(assistant), catalog))
}
