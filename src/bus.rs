use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::chat::ChatMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// A message landed durably in the store (with its server-assigned
    /// id and timestamp).
    MessageAppended(ChatMessage),

    /// A durable append failed after the optimistic enqueue. The text
    /// is echoed back so the client can offer a retry.
    SendFailed {
        text: String,
        sender_id: String,
        reason: String,
    },

    /// A system notification for the UI (e.g. a generator came online).
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        // We ignore the error if there are no receivers
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
