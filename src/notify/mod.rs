//! Outbound notifications
//!
//! A [`Notifier`] delivers the "your content was flagged" message to an
//! author. Delivery is fire-and-forget from the caller's point of view:
//! errors come back as [`NotifyError`] so they can be logged, and are never
//! turned into a request failure.

pub mod webhook;

use std::sync::Mutex;
use tracing::info;

pub use webhook::WebhookNotifier;

/// Subject line of the flagged-content message
pub const FLAGGED_SUBJECT: &str = "Your Note/Comment Has Been Flagged";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification rejected with status {0}")]
    Rejected(u16),

    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Send `content` to `address`
    async fn notify(&self, address: &str, content: &str) -> Result<(), NotifyError>;
}

/// Plain-text body of the flagged-content message
pub fn flagged_message(content: &str) -> String {
    format!(
        "Hello,\n\n\
         Your note/comment has been flagged due to downvotes. Please review its content:\n\n\
         \"{}\"\n\n\
         If you believe this was a mistake, please contact support.",
        content
    )
}

// ============================================================================
// Log notifier (dev mode)
// ============================================================================

/// Writes notifications to the log instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, address: &str, content: &str) -> Result<(), NotifyError> {
        info!(
            to = %address,
            subject = FLAGGED_SUBJECT,
            "Flag notification: {}",
            flagged_message(content)
        );
        Ok(())
    }
}

// ============================================================================
// Test doubles
// ============================================================================

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(address, content)` pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, address: &str, content: &str) -> Result<(), NotifyError> {
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sent.push((address.to_string(), content.to_string()));
        Ok(())
    }
}

/// Fails every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNotifier;

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _address: &str, _content: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("relay unreachable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flagged_message_quotes_content() {
        let text = flagged_message("Week 3 summary");
        assert!(text.contains("\"Week 3 summary\""));
        assert!(text.contains("contact support"));
    }

    #[tokio::test]
    async fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify("a@example.com", "one").await.unwrap();
        notifier.notify("b@example.com", "two").await.unwrap();

        assert_eq!(
            notifier.sent(),
            vec![
                ("a@example.com".to_string(), "one".to_string()),
                ("b@example.com".to_string(), "two".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_notifier() {
        tokio_test::assert_err!(FailingNotifier.notify("a@example.com", "x").await);
        tokio_test::assert_ok!(LogNotifier.notify("a@example.com", "x").await);
    }
}
