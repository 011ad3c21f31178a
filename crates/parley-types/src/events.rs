use serde::{Deserialize, Serialize};

use crate::models::MessageStatus;

/// Change notifications emitted by the in-memory message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    /// The full message set of a chat was replaced by a fresh snapshot
    ChatSnapshot { chat_id: String, message_count: usize },

    /// A message was inserted or replaced wholesale
    MessageUpserted { chat_id: String, message_id: String },

    /// A translation was merged into a message
    TranslationApplied {
        chat_id: String,
        message_id: String,
        language: String,
    },

    /// Delivery status changed
    StatusChanged {
        chat_id: String,
        message_id: String,
        status: MessageStatus,
    },

    /// Reactions, deletion flags or detected language changed
    MessagePatched { chat_id: String, message_id: String },

    /// Chat metadata (unread count, last message) changed
    ChatUpdated { chat_id: String },

    /// All local state for a chat was dropped
    ChatPurged { chat_id: String },
}

impl StoreEvent {
    pub fn chat_id(&self) -> &str {
        match self {
            Self::ChatSnapshot { chat_id, .. }
            | Self::MessageUpserted { chat_id, .. }
            | Self::TranslationApplied { chat_id, .. }
            | Self::StatusChanged { chat_id, .. }
            | Self::MessagePatched { chat_id, .. }
            | Self::ChatUpdated { chat_id }
            | Self::ChatPurged { chat_id } => chat_id,
        }
    }

    /// Events that can bring messages the viewer has not seen yet.
    pub fn may_add_messages(&self) -> bool {
        matches!(self, Self::ChatSnapshot { .. } | Self::MessageUpserted { .. })
    }
}

/// User-facing notifications raised by the view-model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Notice {
    /// Blocking alert for a failed user-initiated action
    Alert { title: String, message: String },

    /// The viewer lost access to a chat (e.g. removed from a group)
    RemovedFromChat {
        chat_id: String,
        chat_name: Option<String>,
    },
}

impl Notice {
    pub fn alert(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Alert {
            title: title.into(),
            message: message.into(),
        }
    }
}
