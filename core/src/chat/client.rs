//! Chat client implementation
//!
//! Talks to a chat-completion endpoint that frames streaming responses as
//! `event:`/`data:` lines terminated by a `[DONE]` sentinel.

use super::{ChatConfig, ChatResponse, OutboundMessage};
use crate::error::{ConfabError, Result};
use crate::retry::{retry_async, RetryPolicy};
use crate::sse::{decode_sse, StreamEvent};
use futures::Stream;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Serialize;
use std::pin::Pin;
use tracing::debug;

/// Request body for the chat endpoint.
///
/// `auto_save_history` tells the remote service to keep its own copy of the
/// exchange; local persistence exists only for cross-service continuity.
#[derive(Serialize)]
struct ChatRequest<'a> {
    bot_id: &'a str,
    user_id: &'a str,
    stream: bool,
    auto_save_history: bool,
    additional_messages: Vec<OutboundMessage>,
}

/// Client for the remote assistant.
#[derive(Clone)]
pub struct ChatClient {
    config: ChatConfig,
    retry: RetryPolicy,
    http_client: HttpClient,
}

impl ChatClient {
    /// Create a new chat client.
    pub fn new(config: ChatConfig, retry: RetryPolicy) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfabError::from)?;

        Ok(ChatClient {
            config,
            retry,
            http_client,
        })
    }

    /// Send one user utterance and return the fully materialized response.
    ///
    /// Transient transport failures are retried per the configured policy;
    /// authentication and rate-limit failures surface immediately.
    pub async fn send_message(&self, user_id: &str, content: &str) -> Result<ChatResponse> {
        self.validate(user_id, content)?;

        retry_async(&self.retry, "chat request", || async move {
            let response = self.dispatch(user_id, content, false).await?;
            let response = Self::check_status(response).await?;
            let body: ChatResponse = response.json().await?;
            Ok(body)
        })
        .await
    }

    /// Send one user utterance and return a lazy, finite, non-restartable
    /// sequence of decoded stream events.
    ///
    /// Only the connection phase is retried; once the stream is handed out,
    /// a mid-stream failure propagates to the consumer.
    pub async fn send_message_stream(
        &self,
        user_id: &str,
        content: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>> {
        self.validate(user_id, content)?;

        let response = retry_async(&self.retry, "chat stream request", || async move {
            let response = self.dispatch(user_id, content, true).await?;
            Self::check_status(response).await
        })
        .await?;

        debug!("chat stream opened for user {user_id}");
        Ok(Box::pin(decode_sse(response.bytes_stream())))
    }

    /// Fail fast on missing input before any network call is attempted.
    fn validate(&self, user_id: &str, content: &str) -> Result<()> {
        if user_id.is_empty() {
            return Err(ConfabError::Parameter("user_id"));
        }
        if content.is_empty() {
            return Err(ConfabError::Parameter("content"));
        }
        if self.config.bot_id.is_empty() {
            return Err(ConfabError::Parameter("bot_id"));
        }
        Ok(())
    }

    async fn dispatch(&self, user_id: &str, content: &str, stream: bool) -> Result<Response> {
        let body = ChatRequest {
            bot_id: &self.config.bot_id,
            user_id,
            stream,
            auto_save_history: true,
            additional_messages: vec![OutboundMessage::user(content)],
        };

        let response = self
            .http_client
            .post(&self.config.base_url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await?;
        Ok(response)
    }

    /// Fixed status-to-failure-kind mapping: 401 is an authentication
    /// failure, 429 a rate limit, any other non-success carries status and
    /// body text.
    async fn check_status(response: Response) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(ConfabError::TokenInvalid),
            StatusCode::TOO_MANY_REQUESTS => Err(ConfabError::RateLimited),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ConfabError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
