use crate::errors::SendError;
use crate::message::OutboundMessage;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Delivers an assembled message to a push backend.
///
/// `send` is called exactly once per accepted request and is never retried;
/// the returned string is the backend's message id.
#[async_trait]
pub trait Sender: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the sender can accept messages. Drives the `/ready` endpoint.
    fn is_ready(&self) -> bool {
        true
    }

    async fn send(&self, message: &OutboundMessage) -> Result<String, SendError>;
}

/// Dry-run sender that only logs what would have been sent.
#[derive(Default)]
pub struct LogSender {
    sequence: AtomicU64,
}

impl LogSender {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Sender for LogSender {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<String, SendError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let rendered = serde_json::to_string(message).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to encode message");
        })?;

        tracing::info!(
            target_kind = message.target.kind().field(),
            payload = %rendered,
            "Dry run, message not delivered"
        );
        Ok(format!("dry-run/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Target;

    #[tokio::test]
    async fn test_log_sender_ids_increase() {
        let sender = LogSender::new();
        let message = OutboundMessage {
            target: Target::Topic("news".to_string()),
            notification: None,
            data: None,
            android: None,
            webpush: None,
            apns: None,
        };

        assert!(sender.is_ready());
        assert_eq!(sender.send(&message).await.unwrap(), "dry-run/1");
        assert_eq!(sender.send(&message).await.unwrap(), "dry-run/2");
    }
}
