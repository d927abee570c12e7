//! Chat service integration
//!
//! The rest of the crate only sees the three capabilities defined here.
//! `ChatClient` and `WebhookNotifier` are the HTTP-backed implementations.

pub mod client;
pub mod message;
pub mod webhook;

use async_trait::async_trait;
use tracing::{debug, warn};

pub use client::ChatClient;
pub use webhook::WebhookNotifier;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("credential was rejected by the chat service")]
    Unauthorized,

    #[error("group `{0}` does not exist")]
    GroupNotFound(String),

    #[error("lookup timed out")]
    LookupTimeout,

    #[error("message delivery failed: {0}")]
    DeliveryError(String),

    #[error("chat service request failed: {0}")]
    Http(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChatError::LookupTimeout
        } else {
            ChatError::Http(err.to_string())
        }
    }
}

/// Resolves a bearer credential to the caller's stable identity
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<String, ChatError>;
}

/// Lists the member identities of a group
#[async_trait]
pub trait GroupMembership: Send + Sync {
    async fn members(&self, group_id: &str) -> Result<Vec<String>, ChatError>;
}

/// Best-effort message delivery to the chat service
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), ChatError>;
}

/// Sends `message` once and logs a failure instead of returning it
pub async fn notify_best_effort(notifier: &dyn Notifier, message: &str) {
    match notifier.send(message).await {
        Ok(()) => debug!("chat notification sent"),
        Err(e) => warn!(error = %e, "chat notification failed"),
    }
}
