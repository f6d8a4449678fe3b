use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::bus::{Event, EventBus};
use crate::chat::ChatMessage;
use crate::error::AppError;
use crate::identity::Participant;
use crate::store::Store;

/// The optimistic write queue. `enqueue` returns synchronously so the
/// composing UI can clear its input immediately; the durable append
/// happens out of band in the worker, with the store assigning the
/// authoritative timestamp when the write lands. In-flight writes are
/// not cancellable and complete independently of any UI lifecycle.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<ChatMessage>,
}

impl Outbox {
    /// Spawn the worker and hand back the enqueue side.
    pub fn spawn(store: Store, bus: Arc<EventBus>) -> Self {
        let (tx, mut rx) = mpsc::channel::<ChatMessage>(100);

        tokio::spawn(async move {
            while let Some(pending) = rx.recv().await {
                match store.append(&pending).await {
                    Ok(acked) => {
                        bus.publish(Event::MessageAppended(acked));
                    }
                    Err(e) => {
                        // Nothing durable was written, so there is
                        // nothing to roll back; surface the failure on
                        // the bus so the sender can retry.
                        error!("durable append failed: {e:#}");
                        bus.publish(Event::SendFailed {
                            text: pending.text,
                            sender_id: pending.sender_id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            info!("outbox worker stopped");
        });

        Self { tx }
    }

    /// Validate and enqueue. Empty or whitespace-only text is rejected
    /// without touching the queue or the store.
    pub fn enqueue(&self, text: &str, sender: &Participant) -> Result<(), AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("A message cannot be empty.".into()));
        }

        let pending = ChatMessage::compose(text, sender);
        self.tx
            .try_send(pending)
            .map_err(|e| AppError::RemoteWrite(e.to_string()))
    }
}
