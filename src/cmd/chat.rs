//! Conversation commands: `docbot ask|history|stats|clear`.

use anyhow::{Result, bail};

use docbot::config::DocbotConfig;

use super::open_assistant;

pub async fn cmd_ask(config: &DocbotConfig, question: &str) -> Result<()> {
    let (assistant, _) = open_assistant(config)?;
    let answer = assistant.ask(question).await?;
    if config.verbose && answer.cached {
        eprintln!("(cached)");
    }
    println!("{}", answer.text);
    Ok(())
}

pub fn cmd_history(config: &DocbotConfig) -> Result<()> {
    let (assistant, _) = open_assistant(config)?;
    let history = assistant.history()?;

    if history.is_empty() {
        println!("No conversation history.");
        return Ok(());
    }
    for message in &history {
        println!("[{}] {}", message.role, message.content);
    }
    Ok(())
}

pub fn cmd_stats(config: &DocbotConfig) -> Result<()> {
    let (assistant, _) = open_assistant(config)?;
    let stats = assistant.stats()?;

    println!("Total messages:       {}", stats.total_messages);
    println!("User messages:        {}", stats.user_messages);
    println!("Assistant messages:   {}", stats.ai_messages);
    println!("Avg user length:      {:.1}", stats.average_user_length);
    println!("Avg assistant length: {:.1}", stats.average_ai_length);

    if let Some(metadata) = assistant.store().load_metadata()? {
        println!("Last updated:         {}", metadata.last_updated.to_rfc3339());
    }
    Ok(())
}

pub async fn cmd_clear(config: &DocbotConfig) -> Result<()> {
    let (assistant, _) = open_assistant(config)?;
    let outcome = assistant.clear_all().await;

    if !outcome.is_success() {
        bail!("{}", outcome.message);
    }
    println!("{}", outcome.message);
    if let Some(items) = outcome.cleared_items {
        println!("  history:  {} messages", items.history);
        println!("  cache:    {} entries", items.cache);
        println!(
            "  metadata: {}",
            if items.metadata { "removed" } else { "none" }
        );
    }
    Ok(())
}
