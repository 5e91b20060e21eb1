use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::openai::DEFAULT_BASE_URL;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const MODEL_VAR: &str = "LLM_CHAT_MODEL";
pub const LOG_FILE_VAR: &str = "LLM_CHAT_LOG";
pub const LOG_LEVEL_VAR: &str = "LLM_CHAT_LOG_LEVEL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub base_url: String,
    pub max_message_width: u16,
    pub input_char_limit: usize,
    pub stream_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_message_width: 120,
            input_char_limit: 500,
            stream_timeout_secs: 60,
            log_file: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Load the user config file, falling back to defaults when it does not
    /// exist, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::get_config_path() {
            Ok(path) => Self::load_from(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty(MODEL_VAR) {
            self.model = model;
        }
        if let Some(base_url) = non_empty(BASE_URL_VAR) {
            self.base_url = base_url;
        }
        if let Some(log_file) = non_empty(LOG_FILE_VAR) {
            self.log_file = Some(PathBuf::from(log_file));
        }
        if let Some(level) = non_empty(LOG_LEVEL_VAR) {
            self.log_level = Some(level);
        }
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs.max(1))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("llm-chat-tui").join("config.json"))
    }
}

/// The API credential comes from the environment only and is never stored.
pub fn api_key_from<F>(var: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(API_KEY_VAR)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("{} environment variable not set", API_KEY_VAR))
}
