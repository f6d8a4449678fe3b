use std::sync::Arc;

use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::bus::{Event, EventBus};
use crate::chat::Snapshot;
use crate::error::AppError;
use crate::store::Store;

/// What a feed subscriber sees. Snapshots are always complete
/// replacements of the prior state, never deltas; `SendFailed` is the
/// visible counterpart of a durable append that did not land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    Snapshot(Snapshot),
    SendFailed {
        text: String,
        sender_id: String,
        reason: String,
    },
}

/// A standing subscription over the shared conversation: an immediate
/// loading state, then the full ordered snapshot, then a fresh full
/// snapshot every time the collection changes. Read-only; dropping the
/// stream cancels the subscription.
pub struct Feed {
    store: Store,
    bus: Arc<EventBus>,
}

impl Feed {
    pub fn new(store: Store, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// A failed read is terminal for the stream: the item is an error
    /// and the stream ends. Retry policy belongs to the transport, not
    /// here.
    pub fn subscribe(&self) -> impl Stream<Item = Result<FeedEvent, AppError>> + Send + 'static {
        let store = self.store.clone();
        let mut rx = self.bus.subscribe();

        async_stream::stream! {
            yield Ok(FeedEvent::Snapshot(Snapshot::loading()));

            match store.snapshot().await {
                Ok(messages) => yield Ok(FeedEvent::Snapshot(Snapshot::ready(messages))),
                Err(e) => {
                    yield Err(AppError::RemoteRead(e.to_string()));
                    return;
                }
            }

            loop {
                let refresh = match rx.recv().await {
                    Ok(Event::MessageAppended(_)) => true,
                    Ok(Event::SendFailed { text, sender_id, reason }) => {
                        yield Ok(FeedEvent::SendFailed { text, sender_id, reason });
                        false
                    }
                    Ok(_) => false,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // A full-snapshot re-query absorbs anything we missed.
                        warn!("feed lagged behind by {skipped} events, re-reading");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if refresh {
                    match store.snapshot().await {
                        Ok(messages) => {
                            yield Ok(FeedEvent::Snapshot(Snapshot::ready(messages)))
                        }
                        Err(e) => {
                            yield Err(AppError::RemoteRead(e.to_string()));
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;
    use crate::identity;
    use futures::StreamExt;

    async fn feed() -> (Feed, Store, Arc<EventBus>) {
        let store = Store::open_in_memory().await.unwrap();
        store.init().await.unwrap();
        let bus = Arc::new(EventBus::new());
        (Feed::new(store.clone(), bus.clone()), store, bus)
    }

    fn expect_snapshot(item: Option<Result<FeedEvent, AppError>>) -> Snapshot {
        match item.unwrap().unwrap() {
            FeedEvent::Snapshot(s) => s,
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_emission_is_loading_then_the_full_snapshot() {
        let (feed, store, _bus) = feed().await;
        store
            .append(&ChatMessage::compose("hello", &identity::vishnu()))
            .await
            .unwrap();

        let mut stream = Box::pin(feed.subscribe());
        let loading = expect_snapshot(stream.next().await);
        assert!(loading.is_loading);
        assert!(loading.messages.is_empty());

        let ready = expect_snapshot(stream.next().await);
        assert!(!ready.is_loading);
        assert_eq!(ready.messages.len(), 1);
        assert_eq!(ready.messages[0].text, "hello");
    }

    #[tokio::test]
    async fn later_appends_never_reorder_earlier_messages() {
        let (feed, store, bus) = feed().await;
        let first = store
            .append(&ChatMessage::compose("T1", &identity::vishnu()))
            .await
            .unwrap();

        let mut stream = Box::pin(feed.subscribe());
        let _ = stream.next().await; // loading
        let initial = expect_snapshot(stream.next().await);
        assert_eq!(initial.messages, vec![first.clone()]);

        let second = store
            .append(&ChatMessage::compose("T2", &identity::vaishakhanandini()))
            .await
            .unwrap();
        bus.publish(Event::MessageAppended(second.clone()));

        let updated = expect_snapshot(stream.next().await);
        assert_eq!(updated.messages, vec![first, second]);
    }

    #[tokio::test]
    async fn resubscribing_without_writes_is_idempotent() {
        let (feed, store, _bus) = feed().await;
        store
            .append(&ChatMessage::compose("only", &identity::vishnu()))
            .await
            .unwrap();

        let mut a = Box::pin(feed.subscribe());
        let _ = a.next().await;
        let snap_a = expect_snapshot(a.next().await);
        drop(a);

        let mut b = Box::pin(feed.subscribe());
        let _ = b.next().await;
        let snap_b = expect_snapshot(b.next().await);

        assert_eq!(snap_a, snap_b);
    }

    #[tokio::test]
    async fn send_failures_reach_subscribers() {
        let (feed, _store, bus) = feed().await;

        let mut stream = Box::pin(feed.subscribe());
        let _ = stream.next().await; // loading
        let _ = stream.next().await; // empty snapshot

        bus.publish(Event::SendFailed {
            text: "lost".into(),
            sender_id: "p1".into(),
            reason: "disk full".into(),
        });

        match stream.next().await.unwrap().unwrap() {
            FeedEvent::SendFailed { text, .. } => assert_eq!(text, "lost"),
            other => panic!("expected send failure, got {other:?}"),
        }
    }
}
