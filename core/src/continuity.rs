//! Conversation continuity manager
//!
//! Orchestrates incremental persistence of in-progress conversations,
//! external-to-internal id resolution, and reconstruction of a resumption
//! context after an interruption. The store stays the source of truth;
//! resolved internal ids are memoized only as a per-manager shortcut and
//! dropped as soon as the store disagrees.
//!
//! Status transitions are caller-driven: a successful resume does NOT flip
//! `interrupted -> active` by itself. The surrounding caller is expected to
//! issue `update` with the new status once the resumed exchange succeeds.

use crate::chat::{ChatClient, ChatResponse};
use crate::error::{ConfabError, Result};
use crate::store::{
    ConversationPatch, ConversationRecord, ConversationStatus, SessionData, SessionStoreClient,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{info, warn};

/// Manages conversation persistence and resumption for one store/chat pair.
pub struct ContinuityManager {
    store: SessionStoreClient,
    chat: ChatClient,
    /// (user id, external id) -> internal id, memoized across resolutions.
    id_cache: Mutex<HashMap<(String, String), String>>,
}

impl ContinuityManager {
    pub fn new(store: SessionStoreClient, chat: ChatClient) -> Self {
        ContinuityManager {
            store,
            chat,
            id_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Persist the first turn of a new conversation.
    ///
    /// Not idempotent: calling twice with the same external id creates two
    /// distinct records. Call once per conversation, then `update`.
    pub async fn save(
        &self,
        user_id: &str,
        external_id: &str,
        title: &str,
        status: ConversationStatus,
        session_data: &SessionData,
    ) -> Result<ConversationRecord> {
        let record = self
            .store
            .create_conversation(user_id, external_id, title, status, session_data)
            .await?;
        self.cache_insert(user_id, external_id, &record.id);
        Ok(record)
    }

    /// Apply a partial update to an existing conversation.
    ///
    /// Resolves the external id first; with no matching record this fails
    /// with [`ConfabError::ConversationNotFound`] and issues no write. Call
    /// after every turn that changes session data, so an interruption loses
    /// at most the in-flight turn.
    pub async fn update(
        &self,
        user_id: &str,
        external_id: &str,
        patch: &ConversationPatch,
    ) -> Result<ConversationRecord> {
        let internal_id = self
            .resolve_internal_id(user_id, external_id)
            .await?
            .ok_or_else(|| ConfabError::ConversationNotFound(external_id.to_string()))?;

        match self.store.update_conversation(&internal_id, patch).await {
            Err(ConfabError::StoreCall { status: 404, .. }) => {
                // Stale memoized id; the store is authoritative.
                self.cache_remove(user_id, external_id);
                Err(ConfabError::ConversationNotFound(external_id.to_string()))
            }
            Err(err) => {
                warn!("persisting conversation {external_id} failed: {err}");
                Err(err)
            }
            Ok(record) => Ok(record),
        }
    }

    /// All conversation records for a user, in store order.
    pub async fn list(&self, user_id: &str) -> Result<Vec<ConversationRecord>> {
        self.store.list_conversations(user_id).await
    }

    /// Session data for one conversation, or `None` when no such session
    /// exists. An unresolvable external id and a 404 on the resolved
    /// internal id are indistinguishable to the caller.
    pub async fn get(&self, user_id: &str, external_id: &str) -> Result<Option<SessionData>> {
        let Some(internal_id) = self.resolve_internal_id(user_id, external_id).await? else {
            return Ok(None);
        };

        let data = self.store.read_session_data(&internal_id, user_id).await?;
        if data.is_none() {
            self.cache_remove(user_id, external_id);
        }
        Ok(data)
    }

    /// Resume an interrupted conversation.
    ///
    /// Pulls the persisted session, synthesizes a resumption prompt from its
    /// history and workflow progress, and sends it as a non-streaming chat
    /// call. Continuity comes purely from the injected context; the remote
    /// service starts a fresh conversation of its own.
    pub async fn resume(&self, user_id: &str, external_id: &str) -> Result<ChatResponse> {
        let session = self
            .get(user_id, external_id)
            .await?
            .ok_or_else(|| ConfabError::ConversationNotFound(external_id.to_string()))?;

        let prompt = build_resumption_prompt(&session)?;
        info!(
            "resuming conversation {external_id} for user {user_id} ({} prior turns)",
            session.messages.len()
        );
        self.chat.send_message(user_id, &prompt).await
    }

    /// Resolve an external id to the store's internal id by scanning the
    /// user's record listing. The store exposes no direct lookup endpoint.
    async fn resolve_internal_id(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> Result<Option<String>> {
        if let Some(hit) = self
            .id_cache
            .lock()
            .get(&(user_id.to_string(), external_id.to_string()))
            .cloned()
        {
            return Ok(Some(hit));
        }

        let records = self.store.list_conversations(user_id).await?;
        let found = records
            .into_iter()
            .find(|record| record.conversation_id == external_id)
            .map(|record| record.id);

        if let Some(internal_id) = &found {
            self.cache_insert(user_id, external_id, internal_id);
        }
        Ok(found)
    }

    fn cache_insert(&self, user_id: &str, external_id: &str, internal_id: &str) {
        self.id_cache.lock().insert(
            (user_id.to_string(), external_id.to_string()),
            internal_id.to_string(),
        );
    }

    fn cache_remove(&self, user_id: &str, external_id: &str) {
        self.id_cache
            .lock()
            .remove(&(user_id.to_string(), external_id.to_string()));
    }
}

/// Synthesize the directive utterance that re-establishes context after an
/// interruption. History and workflow progress are embedded verbatim as
/// JSON; missing progress is an empty map, never an error.
pub fn build_resumption_prompt(session: &SessionData) -> Result<String> {
    let history = serde_json::to_string(&session.messages)?;
    let workflow = serde_json::to_string(&session.workflow_status)?;

    Ok(format!(
        "Resume the user's previous session and continue the unfinished work.\n\
         1. Prior conversation history: {history}\n\
         2. Workflow progress: {workflow}\n\
         3. Requirements:\n\
            - Pick up from the existing context; do not repeat earlier questions or answers.\n\
            - If a multi-step flow was interrupted, continue from the first unanswered step.\n\
            - Tell the user their previous session has been restored and you are continuing."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Turn;
    use serde_json::json;

    #[test]
    fn prompt_embeds_history_and_workflow_step() {
        let mut workflow = serde_json::Map::new();
        workflow.insert("currentStep".to_string(), json!("Q3"));
        let session = SessionData {
            messages: vec![
                Turn::new("user", "tell me about the role"),
                Turn::new("assistant", "it is a backend position"),
                Turn::new("user", "what stack?"),
            ],
            workflow_status: workflow,
        };

        let prompt = build_resumption_prompt(&session).unwrap();
        assert!(prompt.contains("tell me about the role"));
        assert!(prompt.contains("it is a backend position"));
        assert!(prompt.contains("what stack?"));
        assert!(prompt.contains("Q3"));
        assert!(prompt.contains("do not repeat earlier questions"));
    }

    #[test]
    fn prompt_with_no_progress_uses_empty_workflow() {
        let session = SessionData {
            messages: vec![Turn::new("user", "hi")],
            workflow_status: serde_json::Map::new(),
        };

        let prompt = build_resumption_prompt(&session).unwrap();
        assert!(prompt.contains("Workflow progress: {}"));
    }

    #[test]
    fn prompt_from_default_session_does_not_fail() {
        let prompt = build_resumption_prompt(&SessionData::default()).unwrap();
        assert!(prompt.contains("Prior conversation history: []"));
    }
}
