//! Configuration for docbot.
//!
//! Settings are read from `.docbot/docbot.toml` in the project directory, then
//! overridden by environment variables, then by CLI flags. Every field is
//! optional.
//!
//! ```toml
//! [history]
//! file = ".docbot/history.json"
//! metadata_file = ".docbot/conversation_metadata.json"
//! max_history = 20
//! important_messages = 6
//!
//! [cache]
//! capacity = 50
//! retain = 30
//!
//! [model]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! timeout_secs = 60
//! max_turns = 10
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [catalog]
//! file = "service.json"
//!
//! [template]
//! file = "templates/invoice.txt"
//! output = "outputs/filled_invoice.txt"
//!
//! [whatsapp]
//! verify_token = "change-me"
//! graph_base_url = "https://graph.facebook.com/v21.0"
//! ```
//!
//! Secrets are never read from the file: `OPENAI_API_KEY`,
//! `WHATSAPP_ACCESS_TOKEN` and `WHATSAPP_PHONE_NUMBER_ID` come from the
//! environment (a `.env` file in the project directory is loaded first).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_RETAIN};
use crate::conversation::{DEFAULT_IMPORTANT_MESSAGES, DEFAULT_MAX_HISTORY, SessionConfig};
use crate::llm::DEFAULT_MAX_TURNS;
use crate::llm::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

pub const CONFIG_DIR: &str = ".docbot";
pub const CONFIG_FILE: &str = "docbot.toml";

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "DOCBOT_MODEL";
pub const ENV_WHATSAPP_ACCESS_TOKEN: &str = "WHATSAPP_ACCESS_TOKEN";
pub const ENV_WHATSAPP_PHONE_NUMBER_ID: &str = "WHATSAPP_PHONE_NUMBER_ID";
pub const ENV_WHATSAPP_VERIFY_TOKEN: &str = "WHATSAPP_VERIFY_TOKEN";

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySection {
    #[serde(default = "default_history_file")]
    pub file: PathBuf,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,
    /// Cap on the persisted log length
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Messages sent verbatim to the model; older ones are digested
    #[serde(default = "default_important_messages")]
    pub important_messages: usize,
}

fn default_history_file() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("history.json")
}

fn default_metadata_file() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("conversation_metadata.json")
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_important_messages() -> usize {
    DEFAULT_IMPORTANT_MESSAGES
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            file: default_history_file(),
            metadata_file: default_metadata_file(),
            max_history: default_max_history(),
            important_messages: default_important_messages(),
        }
    }
}

/// Duplicate-question cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    /// Entry count that triggers eviction
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Entries kept after eviction
    #[serde(default = "default_cache_retain")]
    pub retain: usize,
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_cache_retain() -> usize {
    DEFAULT_CACHE_RETAIN
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            retain: default_cache_retain(),
        }
    }
}

/// Chat-completion API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Tool round trips allowed per turn
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Replaces the built-in assistant persona
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_turns: default_max_turns(),
            system_prompt: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSection {
    #[serde(default = "default_catalog_file")]
    pub file: PathBuf,
}

fn default_catalog_file() -> PathBuf {
    PathBuf::from("service.json")
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            file: default_catalog_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSection {
    #[serde(default = "default_template_file")]
    pub file: PathBuf,
    #[serde(default = "default_template_output")]
    pub output: PathBuf,
}

fn default_template_file() -> PathBuf {
    PathBuf::from("templates/invoice.txt")
}

fn default_template_output() -> PathBuf {
    PathBuf::from("outputs/filled_invoice.txt")
}

impl Default for TemplateSection {
    fn default() -> Self {
        Self {
            file: default_template_file(),
            output: default_template_output(),
        }
    }
}

/// WhatsApp Cloud API webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

impl Default for WhatsAppSection {
    fn default() -> Self {
        Self {
            verify_token: None,
            graph_base_url: default_graph_base_url(),
        }
    }
}

/// The complete docbot.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocbotToml {
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub template: TemplateSection,
    #[serde(default)]
    pub whatsapp: WhatsAppSection,
}

impl DocbotToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse docbot.toml")
    }

    /// Load `docbot.toml` from `config_dir`, or defaults if it does not exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize docbot.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Human-readable warnings about questionable settings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.history.max_history < 2 {
            warnings.push(format!(
                "history.max_history = {} leaves no room for the two-message context anchor",
                self.history.max_history
            ));
        }
        if self.cache.retain >= self.cache.capacity {
            warnings.push(format!(
                "cache.retain ({}) should be below cache.capacity ({})",
                self.cache.retain, self.cache.capacity
            ));
        }
        if self.model.max_turns == 0 {
            warnings.push("model.max_turns = 0 is treated as 1".to_string());
        }
        if self.model.timeout_secs == 0 {
            warnings.push("model.timeout_secs = 0 fails every model call".to_string());
        }

        warnings
    }
}

/// Resolved runtime configuration: file settings plus environment and CLI overrides.
#[derive(Debug, Clone)]
pub struct DocbotConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: DocbotToml,
    pub verbose: bool,
    /// CLI override for the model name
    pub cli_model: Option<String>,
}

impl DocbotConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let toml = DocbotToml::load_or_default(&config_dir)?;

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            verbose: false,
            cli_model: None,
        })
    }

    /// Load `.env` from the project directory, then build the configuration.
    pub fn with_cli_args(project_dir: PathBuf, verbose: bool, model: Option<String>) -> Result<Self> {
        let env_file = project_dir.join(".env");
        if env_file.exists() {
            dotenvy::from_path(&env_file)
                .with_context(|| format!("Failed to load {}", env_file.display()))?;
        }

        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_model = model;
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn history_file(&self) -> PathBuf {
        self.resolve(&self.toml.history.file)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.resolve(&self.toml.history.metadata_file)
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.resolve(&self.toml.catalog.file)
    }

    pub fn template_file(&self) -> PathBuf {
        self.resolve(&self.toml.template.file)
    }

    pub fn template_output(&self) -> PathBuf {
        self.resolve(&self.toml.template.output)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_history: self.toml.history.max_history,
            important_messages: self.toml.history.important_messages,
        }
    }

    /// Model name (CLI → env → file).
    pub fn model(&self) -> String {
        self.cli_model
            .clone()
            .or_else(|| env_non_empty(ENV_MODEL))
            .unwrap_or_else(|| self.toml.model.model.clone())
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.model.timeout_secs)
    }

    pub fn api_key(&self) -> Option<String> {
        env_non_empty(ENV_API_KEY)
    }

    /// Webhook verify token (env → file).
    pub fn whatsapp_verify_token(&self) -> Option<String> {
        env_non_empty(ENV_WHATSAPP_VERIFY_TOKEN).or_else(|| self.toml.whatsapp.verify_token.clone())
    }

    pub fn whatsapp_access_token(&self) -> Option<String> {
        env_non_empty(ENV_WHATSAPP_ACCESS_TOKEN)
    }

    pub fn whatsapp_phone_number_id(&self) -> Option<String> {
        env_non_empty(ENV_WHATSAPP_PHONE_NUMBER_ID)
    }

    /// File warnings plus missing-secret warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if self.api_key().is_none() {
            warnings.push(format!(
                "{} is not set; questions cannot reach the model",
                ENV_API_KEY
            ));
        }
        warnings
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = DocbotToml::parse("").unwrap();
        assert_eq!(toml.history.max_history, 20);
        assert_eq!(toml.history.important_messages, 6);
        assert_eq!(toml.cache.capacity, 50);
        assert_eq!(toml.cache.retain, 30);
        assert_eq!(toml.model.model, "gpt-4o-mini");
        assert_eq!(toml.model.max_turns, 10);
        assert_eq!(toml.server.port, 8000);
        assert!(toml.whatsapp.verify_token.is_none());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml = DocbotToml::parse(
            r#"
            [history]
            max_history = 8

            [model]
            model = "gpt-4o"
            system_prompt = "Be brief."

            [whatsapp]
            verify_token = "abcd1234"
            "#,
        )
        .unwrap();
        assert_eq!(toml.history.max_history, 8);
        assert_eq!(toml.history.important_messages, 6);
        assert_eq!(toml.model.model, "gpt-4o");
        assert_eq!(toml.model.system_prompt.as_deref(), Some("Be brief."));
        assert_eq!(toml.whatsapp.verify_token.as_deref(), Some("abcd1234"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DocbotToml::parse("[history]\nmax_history = \"many\"").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = DocbotToml::default();
        toml.cache.capacity = 10;
        toml.cache.retain = 4;
        toml.save(&path).unwrap();

        let loaded = DocbotToml::load(&path).unwrap();
        assert_eq!(loaded.cache.capacity, 10);
        assert_eq!(loaded.cache.retain, 4);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = DocbotToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.history.max_history, 20);
    }

    #[test]
    fn test_validate_defaults_clean() {
        assert!(DocbotToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let mut toml = DocbotToml::default();
        toml.history.max_history = 1;
        toml.cache.retain = 50;
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("max_history"));
        assert!(warnings[1].contains("cache.retain"));
    }

    #[test]
    fn test_paths_resolve_against_project_dir() {
        let dir = tempdir().unwrap();
        let config = DocbotConfig::new(dir.path().to_path_buf()).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.history_file(), root.join(".docbot/history.json"));
        assert_eq!(config.catalog_file(), root.join("service.json"));
        assert_eq!(config.config_file(), root.join(".docbot/docbot.toml"));
    }

    #[test]
    fn test_config_reads_project_toml() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_DIR).join(CONFIG_FILE),
            "[history]\nmax_history = 4\nimportant_messages = 2\nfile = \"/tmp/h.json\"\n",
        )
        .unwrap();

        let config = DocbotConfig::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            config.session_config(),
            SessionConfig {
                max_history: 4,
                important_messages: 2
            }
        );
        assert_eq!(config.history_file(), PathBuf::from("/tmp/h.json"));
    }

    #[test]
    fn test_cli_model_overrides_file() {
        let dir = tempdir().unwrap();
        let mut config = DocbotConfig::new(dir.path().to_path_buf()).unwrap();
        config.cli_model = Some("gpt-4.1".to_string());
        assert_eq!(config.model(), "gpt-4.1");
    }
}
