use crate::errors::SendError;
use crate::message::OutboundMessage;
use crate::sender::Sender;
use async_trait::async_trait;
use std::sync::Mutex;

/// Sender that records every message and answers with a fixed outcome.
pub struct MockSender {
    outcome: Result<String, String>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MockSender {
    pub fn succeeding(message_id: &str) -> Self {
        Self {
            outcome: Ok(message_id.to_string()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Fails every send with a transport error carrying `error`.
    pub fn failing(error: &str) -> Self {
        Self {
            outcome: Err(error.to_string()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sender for MockSender {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<String, SendError> {
        self.sent.lock().unwrap().push(message.clone());
        self.outcome.clone().map_err(SendError::Transport)
    }
}
