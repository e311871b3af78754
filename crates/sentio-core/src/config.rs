use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SentioError};

/// Top-level configuration for the Sentio service.
///
/// Loaded from `~/.sentio/config.toml` by default. Every section falls back
/// to its defaults when omitted, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentioConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub accounts: AccountConfig,
}

impl SentioConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SentioConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SentioError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP listen port.
    pub port: u16,
    /// Data directory for the SQLite document store.
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 10000,
            data_dir: "~/.sentio/data".to_string(),
        }
    }
}

/// Generative-model client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name passed to the generation endpoint.
    pub model: String,
    /// Base URL of the generation API.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-call timeout in seconds. Expiry counts as a service failure.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Conversation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether chat turns are accepted at all.
    pub enabled: bool,
    /// Name the assistant introduces itself with.
    pub assistant_name: String,
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
    /// Number of recent turns fed to the model as context.
    pub context_turns: usize,
    /// Number of recent turns inspected for topic continuation.
    pub topic_window: usize,
    /// Maximum bullet points kept when the user asks for advice.
    pub max_recommendations: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            assistant_name: "Coprodelito".to_string(),
            max_message_length: 2000,
            context_turns: 5,
            topic_window: 3,
            max_recommendations: 3,
        }
    }
}

/// Keyword sets behind the intent and topic heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Substrings marking a message as gratitude.
    pub gratitude: Vec<String>,
    /// Substrings marking a message as a request for advice.
    pub advice: Vec<String>,
    /// Connective words marking a message as a topic continuation.
    pub connectives: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            gratitude: to_strings(&["gracias", "muchas gracias", "agradecido", "agradecida", "thank"]),
            advice: to_strings(&[
                "consejos",
                "tips",
                "recomendación",
                "qué hago",
                "no sé",
                "ayúdame",
                "advice",
                "what should i do",
            ]),
            connectives: to_strings(&[
                "y", "además", "también", "pero", "aunque", "luego", "and", "also", "too", "but",
                "although", "then",
            ]),
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend: "sqlite" or "memory".
    pub backend: String,
    /// SQLite file name, relative to `general.data_dir`.
    pub db_file: String,
    /// Per-write timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            db_file: "sentio.db".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Account registration rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Regex every registered email must match (after lowercasing).
    pub email_pattern: String,
    /// Exact required password length in characters.
    pub password_length: usize,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            email_pattern: r"^[a-z]+\.[a-z]+@spc\.edu\.pe$".to_string(),
            password_length: 8,
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
