//! Structured error types for Confab
//!
//! One taxonomy shared by every component so the retry layer can decide
//! retryability from the error kind alone.

use thiserror::Error;

/// Primary error type for Confab operations
#[derive(Error, Debug)]
pub enum ConfabError {
    /// Required caller input is missing or malformed. Never retried.
    #[error("parameter {0} is missing or invalid")]
    Parameter(&'static str),

    /// Access token rejected by the chat service (401). Credentials must be
    /// refreshed out of band.
    #[error("access token invalid or expired")]
    TokenInvalid,

    /// Chat service rate limit hit (429). Surfaced so the caller can apply
    /// its own cooldown.
    #[error("rate limit exceeded, try again later")]
    RateLimited,

    /// Network-level failure (connect, timeout, broken body). The only
    /// retryable kind.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Chat service returned a non-success status outside the mapped ones.
    #[error("chat API call failed ({status}): {body}")]
    Api { status: u16, body: String },

    /// Session store returned a non-success status.
    #[error("session store call failed: {path} (status {status})")]
    StoreCall { path: String, status: u16 },

    /// An update or resume targeted an external conversation id with no
    /// matching record. Read-path lookups degrade to `None` instead.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// Payload could not be serialized or parsed
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<reqwest::Error> for ConfabError {
    fn from(err: reqwest::Error) -> Self {
        ConfabError::Transport(err.to_string())
    }
}

impl ConfabError {
    /// Whether the backoff executor may retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConfabError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, ConfabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(ConfabError::Transport("reset".into()).is_retryable());
        assert!(!ConfabError::TokenInvalid.is_retryable());
        assert!(!ConfabError::RateLimited.is_retryable());
        assert!(!ConfabError::Parameter("user_id").is_retryable());
        assert!(!ConfabError::Api {
            status: 500,
            body: "oops".into()
        }
        .is_retryable());
        assert!(!ConfabError::ConversationNotFound("conv1".into()).is_retryable());
    }
}
