//! Async face of the local cache. Every call runs on the blocking pool.

use std::sync::Arc;

use parley_db::Database;
use parley_db::models::ScrollPositionRow;
use parley_types::models::{Chat, CulturalAnalysis, Message, TranslationRecord};

use crate::error::ViewResult;

#[derive(Clone)]
pub struct Cache {
    db: Arc<Database>,
}

impl Cache {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    async fn run<T, F>(&self, f: F) -> ViewResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        Ok(tokio::task::spawn_blocking(move || f(&db)).await??)
    }

    pub async fn chat(&self, chat_id: &str) -> ViewResult<Option<Chat>> {
        let chat_id = chat_id.to_string();
        self.run(move |db| db.cached_chat(&chat_id)).await
    }

    pub async fn store_chat(&self, chat: Chat) -> ViewResult<()> {
        self.run(move |db| db.cache_chat(&chat)).await
    }

    pub async fn messages(&self, chat_id: &str) -> ViewResult<Vec<Message>> {
        let chat_id = chat_id.to_string();
        self.run(move |db| db.cached_messages(&chat_id)).await
    }

    pub async fn store_messages(&self, messages: Vec<Message>) -> ViewResult<()> {
        self.run(move |db| db.cache_messages(&messages)).await
    }

    pub async fn save_translation(
        &self,
        chat_id: &str,
        message_id: &str,
        language: &str,
        record: TranslationRecord,
    ) -> ViewResult<()> {
        let (chat_id, message_id, language) = (chat_id.to_string(), message_id.to_string(), language.to_string());
        self.run(move |db| db.save_translation(&chat_id, &message_id, &language, &record))
            .await
    }

    pub async fn cultural_analysis(&self, chat_id: &str, message_id: &str) -> ViewResult<Option<CulturalAnalysis>> {
        let (chat_id, message_id) = (chat_id.to_string(), message_id.to_string());
        self.run(move |db| db.cached_cultural_analysis(&chat_id, &message_id))
            .await
    }

    pub async fn save_cultural_analysis(
        &self,
        chat_id: &str,
        message_id: &str,
        analysis: CulturalAnalysis,
    ) -> ViewResult<()> {
        let (chat_id, message_id) = (chat_id.to_string(), message_id.to_string());
        self.run(move |db| db.save_cultural_analysis(&chat_id, &message_id, &analysis))
            .await
    }

    pub async fn scroll_position(&self, chat_id: &str) -> ViewResult<Option<ScrollPositionRow>> {
        let chat_id = chat_id.to_string();
        self.run(move |db| db.scroll_position(&chat_id)).await
    }

    pub async fn save_scroll_position(&self, chat_id: &str, offset: f64, anchor: Option<String>) -> ViewResult<()> {
        let chat_id = chat_id.to_string();
        self.run(move |db| db.save_scroll_position(&chat_id, offset, anchor.as_deref()))
            .await
    }

    pub async fn auto_translate_enabled(&self, chat_id: &str) -> ViewResult<bool> {
        let chat_id = chat_id.to_string();
        self.run(move |db| db.auto_translate_enabled(&chat_id)).await
    }

    pub async fn set_auto_translate(&self, chat_id: &str, enabled: bool) -> ViewResult<()> {
        let chat_id = chat_id.to_string();
        self.run(move |db| db.set_auto_translate(&chat_id, enabled)).await
    }

    pub async fn purge_chat(&self, chat_id: &str) -> ViewResult<usize> {
        let chat_id = chat_id.to_string();
        self.run(move |db| db.purge_chat(&chat_id)).await
    }
}
