use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp as it arrives from the document store.
///
/// Documents written by different client versions carry epoch milliseconds,
/// `{seconds, nanoseconds}` objects or RFC 3339 strings. The raw shape is kept
/// so that a value that does not resolve to a valid instant can still be
/// represented; consumers call [`RawTimestamp::resolve`] and decide what to do
/// with `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Document {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(alias = "_nanoseconds", default)]
        nanoseconds: u32,
    },
    Text(String),
}

impl RawTimestamp {
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Document { seconds, nanoseconds } => DateTime::from_timestamp(*seconds, *nanoseconds),
            Self::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        }
    }

    pub fn millis(&self) -> Option<i64> {
        self.resolve().map(|t| t.timestamp_millis())
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Millis(t.timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    #[default]
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Forward-only delivery progression. `Failed` is reachable only from
    /// `Sending`, and the explicit retry action moves `Failed` back to
    /// `Sending`.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Sending, Sent)
                | (Sending, Delivered)
                | (Sending, Read)
                | (Sending, Failed)
                | (Sent, Delivered)
                | (Sent, Read)
                | (Delivered, Read)
                | (Failed, Sending)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Casual,
    Neutral,
    Formal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalPhrase {
    pub phrase: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_meaning: Option<String>,
}

/// Idioms, slang and cultural references found in a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalAnalysis {
    #[serde(default)]
    pub cultural_phrases: Vec<CulturalPhrase>,
    #[serde(default)]
    pub slang_terms: Vec<CulturalPhrase>,
    /// Whole-message explanation. Older cached analyses predate this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<RawTimestamp>,
}

impl CulturalAnalysis {
    pub fn has_explanation(&self) -> bool {
        self.message_explanation
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.cultural_phrases.is_empty() && self.slang_terms.is_empty() && !self.has_explanation()
    }
}

/// A translation of one message into one target language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formality_level: Option<Formality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_analysis: Option<CulturalAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_at: Option<RawTimestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub timestamp: RawTimestamp,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    /// Body for text messages, caption for images.
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: MessageStatus,
    /// emoji -> user ids
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub deleted_for: Vec<String>,
    #[serde(default)]
    pub deleted_for_everyone: bool,
    /// language code -> translation
    #[serde(default)]
    pub translations: BTreeMap<String, TranslationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
}

impl Message {
    pub fn text(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        timestamp: impl Into<RawTimestamp>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            timestamp: timestamp.into(),
            kind: MessageType::Text,
            text: text.into(),
            image_url: None,
            status: MessageStatus::Sent,
            reactions: BTreeMap::new(),
            deleted_for: Vec::new(),
            deleted_for_everyone: false,
            translations: BTreeMap::new(),
            detected_language: None,
        }
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.resolve()
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }

    pub fn is_visible_to(&self, user_id: &str) -> bool {
        !self.deleted_for.iter().any(|u| u == user_id)
    }

    pub fn translation(&self, language: &str) -> Option<&TranslationRecord> {
        self.translations.get(language)
    }

    /// Text messages with a non-empty body that are still readable.
    pub fn is_translatable(&self) -> bool {
        self.kind == MessageType::Text && !self.deleted_for_everyone && !self.text.trim().is_empty()
    }

    /// Toggle `user_id`'s reaction: removes it if present, adds it if not.
    /// Returns true if the reaction was added.
    pub fn toggle_reaction(&mut self, user_id: &str, emoji: &str) -> bool {
        let users = self.reactions.entry(emoji.to_string()).or_default();
        if let Some(pos) = users.iter().position(|u| u == user_id) {
            users.remove(pos);
            if users.is_empty() {
                self.reactions.remove(emoji);
            }
            false
        } else {
            users.push(user_id.to_string());
            true
        }
    }
}

impl From<i64> for RawTimestamp {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatType {
    #[default]
    #[serde(rename = "one-on-one")]
    OneOnOne,
    #[serde(rename = "group")]
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: ChatType,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_icon: Option<String>,
    #[serde(default)]
    pub group_admins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_timestamp: Option<RawTimestamp>,
    /// user id -> unread count
    #[serde(default)]
    pub unread_count: BTreeMap<String, u32>,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        self.kind == ChatType::Group
    }

    pub fn unread_for(&self, user_id: &str) -> u32 {
        self.unread_count.get(user_id).copied().unwrap_or(0)
    }

    /// Group name for groups, otherwise the other participant's id.
    pub fn display_name(&self, viewer_id: &str) -> String {
        if let Some(name) = self.group_name.as_ref().filter(|_| self.is_group()) {
            return name.clone();
        }
        self.participants
            .iter()
            .find(|u| u.as_str() != viewer_id)
            .cloned()
            .unwrap_or_else(|| self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_shapes_resolve() {
        let ms: RawTimestamp = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(ms.millis(), Some(1_700_000_000_000));

        let doc: RawTimestamp =
            serde_json::from_str(r#"{"seconds":1700000000,"nanoseconds":500000000}"#).unwrap();
        assert_eq!(doc.millis(), Some(1_700_000_000_500));

        let admin: RawTimestamp =
            serde_json::from_str(r#"{"_seconds":1700000000,"_nanoseconds":0}"#).unwrap();
        assert_eq!(admin.millis(), Some(1_700_000_000_000));

        let text: RawTimestamp = serde_json::from_str(r#""2023-11-14T22:13:20Z""#).unwrap();
        assert_eq!(text.millis(), Some(1_700_000_000_000));
    }

    #[test]
    fn unparseable_timestamps_resolve_to_none() {
        assert!(RawTimestamp::Text("yesterday".into()).resolve().is_none());
        assert!(RawTimestamp::Millis(i64::MAX).resolve().is_none());
    }

    #[test]
    fn message_document_uses_camel_case() {
        let json = r#"{
            "id": "m1",
            "chatId": "c1",
            "senderId": "u1",
            "timestamp": 1700000000000,
            "type": "text",
            "text": "hola",
            "status": "delivered",
            "reactions": {"👍": ["u2"]},
            "deletedFor": ["u3"],
            "translations": {"en": {"text": "hello", "formalityLevel": "casual"}},
            "detectedLanguage": "es"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.status, MessageStatus::Delivered);
        assert_eq!(msg.translation("en").map(|t| t.text.as_str()), Some("hello"));
        assert!(!msg.is_visible_to("u3"));
        assert!(msg.is_visible_to("u2"));
        assert!(!msg.deleted_for_everyone);
    }

    #[test]
    fn toggle_reaction_adds_then_removes() {
        let mut msg = Message::text("m1", "c1", "u1", 0_i64, "hi");
        assert!(msg.toggle_reaction("u2", "🔥"));
        assert_eq!(msg.reactions["🔥"], vec!["u2".to_string()]);
        assert!(!msg.toggle_reaction("u2", "🔥"));
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn status_progression() {
        assert!(MessageStatus::Sending.can_transition_to(MessageStatus::Sent));
        assert!(MessageStatus::Failed.can_transition_to(MessageStatus::Sending));
        assert!(!MessageStatus::Read.can_transition_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Sent.can_transition_to(MessageStatus::Failed));
    }

    #[test]
    fn chat_display_name() {
        let chat: Chat = serde_json::from_str(
            r#"{"id":"c1","type":"one-on-one","participants":["me","ana"]}"#,
        )
        .unwrap();
        assert_eq!(chat.display_name("me"), "ana");
        assert!(!chat.is_group());
    }
}
