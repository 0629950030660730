//! Session store client
//!
//! HTTP client for the external conversation store. The store keys records
//! by its own internal id; the caller-visible `conversationId` can only be
//! resolved by listing a user's records (there is no lookup-by-external-id
//! endpoint). All calls go through the backoff executor; only transport
//! failures are retried.

use crate::error::{ConfabError, Result};
use crate::retry::{retry_async, RetryPolicy};
use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Connection settings for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store API, e.g. `http://localhost:3000/api/open`.
    pub base_url: String,
    /// Value sent in the `X-API-Key` header.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        StoreConfig {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Lifecycle state of a conversation record.
///
/// Valid transitions: `active -> {finished, interrupted}` and
/// `interrupted -> active` (on resumption). `finished` is terminal.
/// Transitions are driven by the caller, never by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Finished,
    Interrupted,
}

impl ConversationStatus {
    pub fn can_transition_to(self, next: ConversationStatus) -> bool {
        use ConversationStatus::*;
        matches!(
            (self, next),
            (Active, Finished) | (Active, Interrupted) | (Interrupted, Active)
        )
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationStatus::Active => write!(f, "active"),
            ConversationStatus::Finished => write!(f, "finished"),
            ConversationStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// One turn of the persisted conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Turn {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Persisted session payload: ordered message turns plus an opaque map
/// describing how far a multi-step interaction progressed. A missing field
/// means "no progress yet", not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub messages: Vec<Turn>,
    #[serde(default)]
    pub workflow_status: serde_json::Map<String, serde_json::Value>,
}

/// A conversation record as the store returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Store-assigned internal id, used for update/read paths.
    pub id: String,
    /// Caller-assigned external id, stable for the conversation's life.
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    pub status: ConversationStatus,
    #[serde(default)]
    pub session_data: Option<SessionData>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update payload. Omitted fields are not sent, leaving the
/// server-side values untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_data: Option<SessionData>,
}

impl ConversationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn status(mut self, status: ConversationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn session_data(mut self, data: SessionData) -> Self {
        self.session_data = Some(data);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none() && self.session_data.is_none()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversation<'a> {
    user_id: &'a str,
    conversation_id: &'a str,
    title: &'a str,
    status: ConversationStatus,
    session_data: &'a SessionData,
}

#[derive(Deserialize)]
struct RecordEnvelope {
    data: ConversationRecord,
}

#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    data: Vec<ConversationRecord>,
}

#[derive(Deserialize, Default)]
struct ReadEnvelope {
    #[serde(default)]
    data: ReadRecord,
}

#[derive(Deserialize, Default)]
struct ReadRecord {
    #[serde(rename = "sessionData", default)]
    session_data: Option<SessionData>,
}

/// HTTP client for the session store.
#[derive(Clone)]
pub struct SessionStoreClient {
    config: StoreConfig,
    retry: RetryPolicy,
    http_client: HttpClient,
}

impl SessionStoreClient {
    pub fn new(config: StoreConfig, retry: RetryPolicy) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfabError::from)?;

        Ok(SessionStoreClient {
            config,
            retry,
            http_client,
        })
    }

    /// `POST /conversations` — create a record. The store assigns the
    /// internal id and returns the created record envelope.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
        title: &str,
        status: ConversationStatus,
        session_data: &SessionData,
    ) -> Result<ConversationRecord> {
        let path = "/conversations";
        let url = format!("{}{}", self.config.base_url, path);
        let body = CreateConversation {
            user_id,
            conversation_id,
            title,
            status,
            session_data,
        };

        let url = url.as_str();
        let body = &body;
        let record = retry_async(&self.retry, "store create", || async move {
            let response = self
                .http_client
                .post(url)
                .header("X-API-Key", &self.config.api_key)
                .json(body)
                .send()
                .await?;
            let response = Self::check_status(response, path).await?;
            let envelope: RecordEnvelope = response.json().await?;
            Ok(envelope.data)
        })
        .await?;

        info!("conversation {conversation_id} stored for user {user_id}");
        Ok(record)
    }

    /// `GET /conversations/user/{userId}` — all records for a user, in the
    /// order the store provides them.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>> {
        let path = format!("/conversations/user/{}", urlencoding::encode(user_id));
        let url = format!("{}{}", self.config.base_url, path);

        let url = url.as_str();
        let path = path.as_str();
        retry_async(&self.retry, "store list", || async move {
            let response = self
                .http_client
                .get(url)
                .header("X-API-Key", &self.config.api_key)
                .send()
                .await?;
            let response = Self::check_status(response, path).await?;
            let envelope: ListEnvelope = response.json().await?;
            Ok(envelope.data)
        })
        .await
    }

    /// `PUT /conversations/{internalId}` — partial update of a record.
    pub async fn update_conversation(
        &self,
        internal_id: &str,
        patch: &ConversationPatch,
    ) -> Result<ConversationRecord> {
        let path = format!("/conversations/{}", urlencoding::encode(internal_id));
        let url = format!("{}{}", self.config.base_url, path);

        let url = url.as_str();
        let path = path.as_str();
        let record = retry_async(&self.retry, "store update", || async move {
            let response = self
                .http_client
                .put(url)
                .header("X-API-Key", &self.config.api_key)
                .json(patch)
                .send()
                .await?;
            let response = Self::check_status(response, path).await?;
            let envelope: RecordEnvelope = response.json().await?;
            Ok(envelope.data)
        })
        .await?;

        info!("conversation record {internal_id} updated");
        Ok(record)
    }

    /// `GET /conversations/{internalId}?userId={userId}` — session data of
    /// one record. A 404 means "no such session" and maps to `None`.
    pub async fn read_session_data(
        &self,
        internal_id: &str,
        user_id: &str,
    ) -> Result<Option<SessionData>> {
        let path = format!("/conversations/{}", urlencoding::encode(internal_id));
        let url = format!("{}{}", self.config.base_url, path);

        let url = url.as_str();
        let path = path.as_str();
        retry_async(&self.retry, "store read", || async move {
            let response = self
                .http_client
                .get(url)
                .query(&[("userId", user_id)])
                .header("X-API-Key", &self.config.api_key)
                .send()
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = Self::check_status(response, path).await?;
            let envelope: ReadEnvelope = response.json().await?;
            Ok(envelope.data.session_data)
        })
        .await
    }

    async fn check_status(response: Response, path: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ConfabError::StoreCall {
                path: path.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_data_defaults_when_fields_absent() {
        let data: SessionData = serde_json::from_str("{}").unwrap();
        assert!(data.messages.is_empty());
        assert!(data.workflow_status.is_empty());
    }

    #[test]
    fn record_parses_store_shape() {
        let record: ConversationRecord = serde_json::from_value(json!({
            "id": "db42",
            "conversationId": "conv1",
            "userId": "u1",
            "title": "Interview",
            "status": "interrupted",
            "sessionData": {
                "messages": [{"role": "user", "content": "hi"}],
                "workflow_status": {"currentStep": "Q2"}
            }
        }))
        .unwrap();

        assert_eq!(record.id, "db42");
        assert_eq!(record.conversation_id, "conv1");
        assert_eq!(record.status, ConversationStatus::Interrupted);
        let data = record.session_data.unwrap();
        assert_eq!(data.messages.len(), 1);
        assert_eq!(data.workflow_status["currentStep"], "Q2");
    }

    #[test]
    fn patch_serializes_only_supplied_fields() {
        let patch = ConversationPatch::new().status(ConversationStatus::Finished);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, json!({"status": "finished"}));

        let full = ConversationPatch::new()
            .title("t")
            .session_data(SessionData::default());
        let json = serde_json::to_value(&full).unwrap();
        assert!(json.get("title").is_some());
        assert!(json.get("sessionData").is_some());
        assert!(json.get("status").is_none());
    }

    #[test]
    fn status_transitions_follow_lifecycle() {
        use ConversationStatus::*;
        assert!(Active.can_transition_to(Finished));
        assert!(Active.can_transition_to(Interrupted));
        assert!(Interrupted.can_transition_to(Active));
        assert!(!Finished.can_transition_to(Active));
        assert!(!Finished.can_transition_to(Interrupted));
        assert!(!Interrupted.can_transition_to(Finished));
    }
}
