//! Webhook poster for chat notifications
//!
//! Messages are posted as plain text and signed with HMAC-SHA1 over the body.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha1::Sha1;
use tracing::{debug, info, instrument};

use super::{ChatError, Notifier};
use crate::config::ChatConfig;

type HmacSha1 = Hmac<Sha1>;

/// Header the chat service reads the body signature from
pub const SIGNATURE_HEADER: &str = "X-TRAQ-Signature";

#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    secret: String,
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    /// `None` when webhook credentials are not configured
    endpoint: Option<Endpoint>,
}

impl WebhookNotifier {
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        let endpoint = match (&config.webhook_id, &config.webhook_secret) {
            (Some(id), Some(secret)) => Some(Endpoint {
                url: format!(
                    "{}/webhooks/{}?embed=1",
                    config.api_base_url.trim_end_matches('/'),
                    id
                ),
                secret: secret.clone(),
            }),
            _ => None,
        };

        Ok(Self { client, endpoint })
    }

    /// A notifier that drops every message (for testing)
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            endpoint: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// Hex-encoded HMAC-SHA1 of `message` keyed with `secret`
pub fn sign(secret: &str, message: &str) -> Result<String, ChatError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| ChatError::DeliveryError(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip_all)]
    async fn send(&self, message: &str) -> Result<(), ChatError> {
        let Some(endpoint) = &self.endpoint else {
            debug!("chat notifications disabled, skipping");
            return Ok(());
        };

        let signature = sign(&endpoint.secret, message)?;
        let res = self
            .client
            .post(&endpoint.url)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(SIGNATURE_HEADER, signature)
            .body(message.to_string())
            .send()
            .await
            .map_err(|e| ChatError::DeliveryError(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(ChatError::DeliveryError(format!(
                "webhook returned {}",
                status
            )));
        }

        info!(status = status.as_u16(), "chat notification delivered");
        Ok(())
    }
}
