//! Typed cache helpers over the raw row queries.
//!
//! Documents are stored as JSON payloads next to the columns needed for
//! lookups. Rows whose payload no longer deserializes are skipped with a
//! warning rather than failing the whole read.

use std::collections::HashMap;

use anyhow::Result;
use parley_types::models::{Chat, CulturalAnalysis, Message, TranslationRecord};
use tracing::warn;

use crate::Database;
use crate::models::{MessageRow, ScrollPositionRow};

const AUTO_TRANSLATE_PREFIX: &str = "@auto_translate_";

/// Preference key for the per-chat auto-translate flag.
pub fn auto_translate_key(chat_id: &str) -> String {
    format!("{}{}", AUTO_TRANSLATE_PREFIX, chat_id)
}

impl Database {
    pub fn cache_chat(&self, chat: &Chat) -> Result<()> {
        let payload = serde_json::to_string(chat)?;
        self.upsert_chat(&chat.id, &payload)
    }

    pub fn cached_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        Ok(self
            .get_chat(chat_id)?
            .and_then(|payload| decode_or_warn("chat", chat_id, &payload)))
    }

    pub fn cache_messages(&self, messages: &[Message]) -> Result<()> {
        let rows = messages
            .iter()
            .map(|m| -> Result<MessageRow> {
                Ok(MessageRow {
                    id: m.id.clone(),
                    chat_id: m.chat_id.clone(),
                    sender_id: m.sender_id.clone(),
                    sent_at: m.timestamp.millis(),
                    payload: serde_json::to_string(m)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.upsert_messages(&rows)
    }

    /// Cached messages of a chat with every cached translation merged in.
    pub fn cached_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let rows = self.get_messages(chat_id)?;
        let mut translations: HashMap<String, Vec<(String, TranslationRecord)>> = HashMap::new();
        for row in self.get_translations_for_chat(chat_id)? {
            if let Some(record) = decode_or_warn::<TranslationRecord>("translation", &row.message_id, &row.payload) {
                translations
                    .entry(row.message_id)
                    .or_default()
                    .push((row.language, record));
            }
        }

        let messages = rows
            .into_iter()
            .filter_map(|row| {
                let mut msg: Message = decode_or_warn("message", &row.id, &row.payload)?;
                if let Some(cached) = translations.remove(&row.id) {
                    msg.translations.extend(cached);
                }
                Some(msg)
            })
            .collect();

        Ok(messages)
    }

    pub fn cached_message(&self, message_id: &str) -> Result<Option<Message>> {
        let Some(row) = self.get_message(message_id)? else {
            return Ok(None);
        };
        let Some(mut msg) = decode_or_warn::<Message>("message", &row.id, &row.payload) else {
            return Ok(None);
        };
        for t in self.get_translations_for_messages(&[row.id.clone()])? {
            if let Some(record) = decode_or_warn("translation", &t.message_id, &t.payload) {
                msg.translations.insert(t.language, record);
            }
        }
        Ok(Some(msg))
    }

    pub fn save_translation(
        &self,
        chat_id: &str,
        message_id: &str,
        language: &str,
        record: &TranslationRecord,
    ) -> Result<()> {
        let payload = serde_json::to_string(record)?;
        self.upsert_translation(message_id, language, chat_id, &payload)
    }

    pub fn save_cultural_analysis(&self, chat_id: &str, message_id: &str, analysis: &CulturalAnalysis) -> Result<()> {
        let payload = serde_json::to_string(analysis)?;
        self.upsert_cultural_analysis(message_id, chat_id, &payload)
    }

    pub fn cached_cultural_analysis(&self, chat_id: &str, message_id: &str) -> Result<Option<CulturalAnalysis>> {
        Ok(self
            .get_cultural_analysis(message_id, chat_id)?
            .and_then(|row| decode_or_warn("cultural analysis", &row.message_id, &row.payload)))
    }

    pub fn scroll_position(&self, chat_id: &str) -> Result<Option<ScrollPositionRow>> {
        self.get_scroll_position(chat_id)
    }

    pub fn auto_translate_enabled(&self, chat_id: &str) -> Result<bool> {
        Ok(self
            .get_preference(&auto_translate_key(chat_id))?
            .is_some_and(|v| v == "true"))
    }

    pub fn set_auto_translate(&self, chat_id: &str, enabled: bool) -> Result<()> {
        self.set_preference(&auto_translate_key(chat_id), if enabled { "true" } else { "false" })
    }
}

fn decode_or_warn<T: serde::de::DeserializeOwned>(kind: &str, id: &str, payload: &str) -> Option<T> {
    match serde_json::from_str(payload) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Skipping unreadable cached {} {}: {}", kind, id, e);
            None
        }
    }
}
