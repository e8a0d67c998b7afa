//! Webhook notifier
//!
//! Posts each message as JSON to a mail relay:
//!
//! ```json
//! { "from": "...", "to": "...", "subject": "...", "text": "..." }
//! ```

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{flagged_message, Notifier, NotifyError, FLAGGED_SUBJECT};

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

pub struct WebhookNotifier {
    endpoint: String,
    from: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(endpoint: String, from: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("notewarden/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            endpoint,
            from,
            http_client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn check_address(address: &str) -> Result<(), NotifyError> {
    let (local, domain) = address
        .split_once('@')
        .ok_or_else(|| NotifyError::InvalidAddress(address.to_string()))?;
    if local.is_empty() || domain.is_empty() {
        return Err(NotifyError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, address: &str, content: &str) -> Result<(), NotifyError> {
        check_address(address)?;

        let message = RelayMessage {
            from: &self.from,
            to: address,
            subject: FLAGGED_SUBJECT,
            text: flagged_message(content),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        debug!("Relay accepted notification for {}", address);
        Ok(())
    }
}
