//! Configuration view and validation commands: `docbot config`.

use anyhow::{Context, Result};

use docbot::config::{DocbotConfig, DocbotToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &DocbotConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("docbot Configuration");
            println!("====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No docbot.toml found at {}; using defaults.", config_path.display());
            }
            println!();

            let rendered =
                toml::to_string_pretty(&config.toml).context("Failed to render configuration")?;
            println!("{}", rendered.trim_end());
            println!();

            println!("Effective values (with env/CLI overrides):");
            println!("  model = \"{}\"", config.model());
            println!("  history = {}", config.history_file().display());
            println!("  catalog = {}", config.catalog_file().display());
            println!(
                "  OPENAI_API_KEY = {}",
                if config.api_key().is_some() { "set" } else { "not set" }
            );
            println!(
                "  WhatsApp replies = {}",
                if config.whatsapp_access_token().is_some()
                    && config.whatsapp_phone_number_id().is_some()
                {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("docbot.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config.config_dir)
                .with_context(|| format!("Failed to create {}", config.config_dir.display()))?;
            DocbotToml::default().save(&config_path)?;

            println!("Created docbot.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [history] max_history, important_messages");
            println!("  - [model] model, base_url, system_prompt");
            println!("  - [whatsapp] verify_token");
            println!();
        }
    }

    Ok(())
}
