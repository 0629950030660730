//! Chat invocation module
//!
//! Sends user utterances to the remote assistant, with transient-failure
//! retry and optional incremental delivery through the streaming decoder.

pub mod client;

pub use client::ChatClient;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the chat service.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Full URL of the chat endpoint.
    pub base_url: String,
    /// Bearer access token.
    pub access_token: String,
    /// Target assistant identifier. Required before any message is sent.
    pub bot_id: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ChatConfig {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        bot_id: impl Into<String>,
    ) -> Self {
        ChatConfig {
            base_url: base_url.into(),
            access_token: access_token.into(),
            bot_id: bot_id.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A message sent to the assistant.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub role: String,
    pub content: String,
    pub content_type: String,
}

impl OutboundMessage {
    /// Create a plain-text user message
    pub fn user(content: impl Into<String>) -> Self {
        OutboundMessage {
            role: "user".to_string(),
            content: content.into(),
            content_type: "text".to_string(),
        }
    }
}

/// Fully materialized non-streaming response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: serde_json::Value,
}
