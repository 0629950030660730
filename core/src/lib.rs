//! Confab core
//!
//! Client-side layer for conducting a conversation with a chat-completion
//! service while persisting and resuming conversation state in an external
//! session store. Built from four pieces: a backoff executor every network
//! call goes through, a streaming decoder for line-framed responses, the
//! chat client itself, and a continuity manager that keeps session state in
//! the store and rebuilds context after an interruption.

pub mod chat;
pub mod config;
pub mod continuity;
pub mod error;
pub mod retry;
pub mod sse;
pub mod store;

pub use chat::{ChatClient, ChatConfig, ChatResponse, OutboundMessage};
pub use config::Settings;
pub use continuity::{build_resumption_prompt, ContinuityManager};
pub use error::{ConfabError, Result};
pub use retry::{retry_async, RetryPolicy};
pub use sse::{decode_sse, StreamEvent, DONE_SENTINEL};
pub use store::{
    ConversationPatch, ConversationRecord, ConversationStatus, SessionData, SessionStoreClient,
    StoreConfig, Turn,
};
