use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Participant;

/// A chat message. `id` and `timestamp` are assigned by the store when
/// the write lands durably; a locally composed copy carries neither
/// (`timestamp: None` serializes as `null`, which the UI renders as
/// "sending…"). Messages are never mutated or deleted after durable
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    pub sender_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub avatar: String,
    pub name: String,
}

impl ChatMessage {
    /// Build the optimistic local copy the instant the sender submits.
    /// Display metadata is snapshotted from the participant here and
    /// never re-resolved later.
    pub fn compose(text: impl Into<String>, sender: &Participant) -> Self {
        Self {
            id: None,
            text: text.into(),
            sender_id: sender.id.clone(),
            timestamp: None,
            avatar: sender.avatar.clone(),
            name: sender.name.clone(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timestamp.is_none()
    }
}

/// Which side of the chat a message renders on, relative to the viewer.
/// A pure function of (sender, viewer), recomputed per render and never
/// stored on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Me,
    Them,
}

pub fn side_for(message: &ChatMessage, viewer_id: &str) -> Side {
    if message.sender_id == viewer_id {
        Side::Me
    } else {
        Side::Them
    }
}

/// One emission of the live feed: a complete, ordered materialization
/// of the conversation. Never a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
}

impl Snapshot {
    /// The state before the first read completes.
    pub fn loading() -> Self {
        Self {
            messages: Vec::new(),
            is_loading: true,
        }
    }

    pub fn ready(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            is_loading: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;

    #[test]
    fn composed_messages_are_pending_and_unidentified() {
        let msg = ChatMessage::compose("miss you", &identity::vishnu());
        assert!(msg.is_pending());
        assert!(msg.id.is_none());
        assert_eq!(msg.sender_id, "p1");
        assert_eq!(msg.name, "Vishnu");
    }

    #[test]
    fn pending_timestamp_serializes_as_null() {
        let msg = ChatMessage::compose("hi", &identity::vaishakhanandini());
        let v = serde_json::to_value(&msg).unwrap();
        assert!(v["timestamp"].is_null());
    }

    #[test]
    fn side_is_relative_to_the_viewer() {
        let msg = ChatMessage::compose("hi", &identity::vishnu());
        assert_eq!(side_for(&msg, "p1"), Side::Me);
        assert_eq!(side_for(&msg, "p2"), Side::Them);
    }
}
