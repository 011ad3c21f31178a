use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parley_types::events::StoreEvent;
use parley_types::models::{Chat, Message, MessageStatus, RawTimestamp, TranslationRecord};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ViewError, ViewResult};

type ChatMessages = HashMap<String, Message>;

/// In-memory messages and chats, keyed by id, with change notifications.
///
/// Every mutation patches a single message or chat under the write lock and
/// then broadcasts a [`StoreEvent`]. Writers never replace another chat's
/// state or a whole message array, so concurrent patches to different
/// messages, or to different translations of one message, all survive.
#[derive(Clone)]
pub struct MessageStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    events_tx: broadcast::Sender<StoreEvent>,

    /// chat_id -> (message_id -> message)
    messages: RwLock<HashMap<String, ChatMessages>>,

    /// chat_id -> chat
    chats: RwLock<HashMap<String, Chat>>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep translations that exist locally but not in `incoming`. A tombstone
/// takes nothing from the local copy.
fn merge_message(existing: Option<Message>, mut incoming: Message) -> Message {
    if incoming.deleted_for_everyone {
        return incoming;
    }
    if let Some(existing) = existing {
        for (lang, record) in existing.translations {
            incoming.translations.entry(lang).or_insert(record);
        }
        if incoming.detected_language.is_none() {
            incoming.detected_language = existing.detected_language;
        }
    }
    incoming
}

impl MessageStore {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(StoreInner {
                events_tx,
                messages: RwLock::new(HashMap::new()),
                chats: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events_tx.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.inner.events_tx.send(event);
    }

    // -- Reads --

    /// Snapshot of a chat's messages in no particular order.
    pub async fn messages(&self, chat_id: &str) -> Vec<Message> {
        self.inner
            .messages
            .read()
            .await
            .get(chat_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn message(&self, chat_id: &str, message_id: &str) -> Option<Message> {
        self.inner
            .messages
            .read()
            .await
            .get(chat_id)
            .and_then(|m| m.get(message_id))
            .cloned()
    }

    pub async fn message_ids(&self, chat_id: &str) -> HashSet<String> {
        self.inner
            .messages
            .read()
            .await
            .get(chat_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn chat(&self, chat_id: &str) -> Option<Chat> {
        self.inner.chats.read().await.get(chat_id).cloned()
    }

    // -- Message writes --

    /// Replace a chat's message set with a fresh snapshot. Translations and
    /// detected languages already merged locally are carried over.
    pub async fn replace_snapshot(&self, chat_id: &str, snapshot: Vec<Message>) {
        let message_count = snapshot.len();
        {
            let mut messages = self.inner.messages.write().await;
            let mut previous = messages.remove(chat_id).unwrap_or_default();
            let next: ChatMessages = snapshot
                .into_iter()
                .map(|m| {
                    let merged = merge_message(previous.remove(&m.id), m);
                    (merged.id.clone(), merged)
                })
                .collect();
            messages.insert(chat_id.to_string(), next);
        }

        debug!(chat_id, message_count, "chat snapshot replaced");
        self.emit(StoreEvent::ChatSnapshot {
            chat_id: chat_id.to_string(),
            message_count,
        });
    }

    /// Insert or replace one message, keeping local translations.
    pub async fn upsert(&self, message: Message) {
        let chat_id = message.chat_id.clone();
        let message_id = message.id.clone();
        {
            let mut messages = self.inner.messages.write().await;
            let chat = messages.entry(chat_id.clone()).or_default();
            let merged = merge_message(chat.remove(&message_id), message.clone());
            chat.insert(message_id.clone(), merged);
        }

        self.emit(StoreEvent::MessageUpserted {
            chat_id: chat_id.clone(),
            message_id,
        });
        self.record_last_message(&message).await;
    }

    pub async fn upsert_many(&self, messages: Vec<Message>) {
        for message in messages {
            self.upsert(message).await;
        }
    }

    /// Add a locally composed message with a fresh id in `Sending` state.
    pub async fn stage_outgoing(&self, chat_id: &str, sender_id: &str, text: &str) -> Message {
        let mut message = Message::text(
            Uuid::new_v4().to_string(),
            chat_id,
            sender_id,
            RawTimestamp::from(Utc::now()),
            text,
        );
        message.status = MessageStatus::Sending;
        self.upsert(message.clone()).await;
        message
    }

    async fn patch<T>(
        &self,
        chat_id: &str,
        message_id: &str,
        f: impl FnOnce(&mut Message) -> ViewResult<T>,
    ) -> ViewResult<T> {
        let mut messages = self.inner.messages.write().await;
        let message = messages
            .get_mut(chat_id)
            .and_then(|m| m.get_mut(message_id))
            .ok_or_else(|| ViewError::MessageNotFound(message_id.to_string()))?;
        f(message)
    }

    /// Merge one translation into a message. Other languages are untouched.
    pub async fn apply_translation(
        &self,
        chat_id: &str,
        message_id: &str,
        language: &str,
        record: TranslationRecord,
        detected_language: Option<String>,
    ) -> ViewResult<()> {
        self.patch(chat_id, message_id, |m| {
            m.translations.insert(language.to_string(), record);
            if detected_language.is_some() {
                m.detected_language = detected_language;
            }
            Ok(())
        })
        .await?;

        self.emit(StoreEvent::TranslationApplied {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
            language: language.to_string(),
        });
        Ok(())
    }

    pub async fn set_detected_language(&self, chat_id: &str, message_id: &str, language: &str) -> ViewResult<()> {
        self.patch(chat_id, message_id, |m| {
            m.detected_language = Some(language.to_string());
            Ok(())
        })
        .await?;
        self.emit_patched(chat_id, message_id);
        Ok(())
    }

    /// Move a message along the delivery progression. Setting the current
    /// status again is a no-op and emits nothing.
    pub async fn set_status(&self, chat_id: &str, message_id: &str, status: MessageStatus) -> ViewResult<()> {
        let changed = self
            .patch(chat_id, message_id, |m| {
                if m.status == status {
                    return Ok(false);
                }
                if !m.status.can_transition_to(status) {
                    return Err(ViewError::InvalidTransition {
                        from: m.status,
                        to: status,
                    });
                }
                m.status = status;
                Ok(true)
            })
            .await?;

        if changed {
            self.emit(StoreEvent::StatusChanged {
                chat_id: chat_id.to_string(),
                message_id: message_id.to_string(),
                status,
            });
        }
        Ok(())
    }

    /// User-initiated retry of a failed send.
    pub async fn retry(&self, chat_id: &str, message_id: &str) -> ViewResult<()> {
        self.set_status(chat_id, message_id, MessageStatus::Sending).await
    }

    /// Returns true if the reaction was added, false if it was removed.
    pub async fn toggle_reaction(&self, chat_id: &str, message_id: &str, user_id: &str, emoji: &str) -> ViewResult<bool> {
        let added = self
            .patch(chat_id, message_id, |m| Ok(m.toggle_reaction(user_id, emoji)))
            .await?;
        self.emit_patched(chat_id, message_id);
        Ok(added)
    }

    pub async fn delete_for_me(&self, chat_id: &str, message_id: &str, user_id: &str) -> ViewResult<()> {
        self.patch(chat_id, message_id, |m| {
            if !m.deleted_for.iter().any(|u| u == user_id) {
                m.deleted_for.push(user_id.to_string());
            }
            Ok(())
        })
        .await?;
        self.emit_patched(chat_id, message_id);
        Ok(())
    }

    /// Tombstone a message: content and translations are dropped, the row stays.
    pub async fn delete_for_everyone(&self, chat_id: &str, message_id: &str) -> ViewResult<()> {
        self.patch(chat_id, message_id, |m| {
            m.deleted_for_everyone = true;
            m.text.clear();
            m.image_url = None;
            m.translations.clear();
            m.reactions.clear();
            Ok(())
        })
        .await?;
        self.emit_patched(chat_id, message_id);
        Ok(())
    }

    fn emit_patched(&self, chat_id: &str, message_id: &str) {
        self.emit(StoreEvent::MessagePatched {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
        });
    }

    /// Drop all messages and metadata of a chat.
    pub async fn purge_chat(&self, chat_id: &str) {
        self.inner.messages.write().await.remove(chat_id);
        self.inner.chats.write().await.remove(chat_id);
        self.emit(StoreEvent::ChatPurged {
            chat_id: chat_id.to_string(),
        });
    }

    // -- Chat writes --

    pub async fn upsert_chat(&self, chat: Chat) {
        let chat_id = chat.id.clone();
        self.inner.chats.write().await.insert(chat_id.clone(), chat);
        self.emit(StoreEvent::ChatUpdated { chat_id });
    }

    /// Reset the viewer's unread count. Returns false if the chat is unknown.
    pub async fn mark_read(&self, chat_id: &str, user_id: &str) -> bool {
        let changed = {
            let mut chats = self.inner.chats.write().await;
            let Some(chat) = chats.get_mut(chat_id) else {
                return false;
            };
            chat.unread_count.insert(user_id.to_string(), 0) != Some(0)
        };
        if changed {
            self.emit(StoreEvent::ChatUpdated {
                chat_id: chat_id.to_string(),
            });
        }
        true
    }

    /// Update the chat's last-message fields if `message` is newer.
    async fn record_last_message(&self, message: &Message) {
        let Some(sent_at) = message.timestamp.millis() else {
            return;
        };
        let updated = {
            let mut chats = self.inner.chats.write().await;
            let Some(chat) = chats.get_mut(&message.chat_id) else {
                return;
            };
            let current = chat.last_message_timestamp.as_ref().and_then(RawTimestamp::millis);
            if current.is_some_and(|c| c > sent_at) {
                false
            } else {
                chat.last_message_text = Some(message.text.clone());
                chat.last_message_sender_id = Some(message.sender_id.clone());
                chat.last_message_timestamp = Some(message.timestamp.clone());
                true
            }
        };
        if updated {
            self.emit(StoreEvent::ChatUpdated {
                chat_id: message.chat_id.clone(),
            });
        }
    }
}
