//! Runtime settings
//!
//! All knobs come from `CONFAB_*` environment variables with sensible
//! defaults, so the CLI runs against a local store out of the box.

use crate::chat::ChatConfig;
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::store::StoreConfig;
use serde::Deserialize;
use std::time::Duration;

/// Process-wide settings for chat, store, and retry behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat endpoint URL (`CONFAB_CHAT_BASE_URL`).
    pub chat_base_url: String,
    /// Bearer token for the chat service (`CONFAB_ACCESS_TOKEN`).
    pub access_token: String,
    /// Assistant identifier (`CONFAB_BOT_ID`).
    pub bot_id: String,
    /// Session store base URL (`CONFAB_STORE_BASE_URL`).
    pub store_base_url: String,
    /// Session store API key (`CONFAB_STORE_API_KEY`).
    pub store_api_key: String,
    /// Chat request timeout in seconds (`CONFAB_CHAT_TIMEOUT_SECS`).
    pub chat_timeout_secs: u64,
    /// Store request timeout in seconds (`CONFAB_STORE_TIMEOUT_SECS`).
    pub store_timeout_secs: u64,
    /// Total attempts per network call (`CONFAB_MAX_ATTEMPTS`).
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds (`CONFAB_RETRY_DELAY_SECS`).
    pub retry_delay_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            chat_base_url: "https://api.coze.cn/v3/chat".to_string(),
            access_token: String::new(),
            bot_id: String::new(),
            store_base_url: "http://localhost:3000/api/open".to_string(),
            store_api_key: String::new(),
            chat_timeout_secs: 30,
            store_timeout_secs: 30,
            max_attempts: 3,
            retry_delay_secs: 1,
        }
    }
}

impl Settings {
    /// Load settings from the environment.
    pub fn load() -> Result<Self> {
        let loaded = config::Config::builder()
            .add_source(config::Environment::with_prefix("CONFAB").try_parsing(true))
            .build()?;
        Ok(loaded.try_deserialize()?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig::new(&self.chat_base_url, &self.access_token, &self.bot_id)
            .with_timeout(Duration::from_secs(self.chat_timeout_secs))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.store_base_url, &self.store_api_key)
            .with_timeout(Duration::from_secs(self.store_timeout_secs))
    }
}
