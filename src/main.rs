use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docbot::config::DocbotConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "docbot")]
#[command(version, about = "Document-services chatbot with persistent, bounded conversation history")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Model name. Overrides DOCBOT_MODEL and docbot.toml.
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (chat page, JSON API, WhatsApp webhook)
    Serve {
        /// Port to serve on (defaults to [server] port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (defaults to [server] host)
        #[arg(long)]
        host: Option<String>,
    },
    /// Ask one question and print the answer
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Print the stored conversation
    History,
    /// Print conversation statistics
    Stats,
    /// Clear the conversation history, cache and metadata
    Clear,
    /// List the service catalog
    Services,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default docbot.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = DocbotConfig::with_cli_args(project_dir, cli.verbose, cli.model.clone())?;

    // Only the long-running server keeps a log file.
    let log_dir = matches!(cli.command, Commands::Serve { .. }).then(|| config.log_dir());
    let _guard = docbot::telemetry::init_tracing(cli.verbose, log_dir.as_deref());

    match &cli.command {
        Commands::Serve { port, host } => cmd::cmd_serve(&config, *port, host.clone()).await?,
        Commands::Ask { question } => cmd::cmd_ask(&config, &question.join(" ")).await?,
        Commands::History => cmd::cmd_history(&config)?,
        Commands::Stats => cmd::cmd_stats(&config)?,
        Commands::Clear => cmd::cmd_clear(&config).await?,
        Commands::Services => cmd::cmd_services(&config)?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
