use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, TimeZone, Utc};
use parley_types::api::LanguageShare;
use parley_types::events::Notice;
use parley_types::models::{CulturalAnalysis, Message, MessageStatus};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::auto_translate::{AutoTranslator, SweepReport};
use crate::context::ViewContext;
use crate::cultural::CulturalAnalysisLoader;
use crate::error::{ViewError, ViewResult};
use crate::grouping::{BubbleFlags, GroupingConfig};
use crate::materialize::{ListItem, materialize_with_unread, visible_messages};
use crate::scroll::{KeyboardTracker, RenderWindow, RenderWindowConfig, ScrollConfig, ScrollTracker};
use crate::translation::{TranslationController, TranslationState};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub scroll: ScrollConfig,
    pub render: RenderWindowConfig,
    pub grouping: GroupingConfig,
    /// Spawn the background auto-translate listener. Without it, new
    /// messages are only translated by an explicit [`ChatSession::sweep`].
    pub listen: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scroll: ScrollConfig::default(),
            render: RenderWindowConfig::default(),
            grouping: GroupingConfig::default(),
            listen: true,
        }
    }
}

/// Local cleanup once the viewer has lost access to a chat. Shared by the
/// session and its listener task.
struct Eviction {
    ctx: ViewContext,
    chat_id: String,
    cancel: CancellationToken,
    auto: Arc<AutoTranslator>,
    removed: AtomicBool,
}

impl Eviction {
    async fn handle(&self, err: &ViewError) -> bool {
        if !err.is_permission_denied() || self.removed.swap(true, Ordering::SeqCst) {
            return false;
        }

        warn!(chat_id = %self.chat_id, "lost access to chat: {}", err);
        let chat_name = self
            .ctx
            .store
            .chat(&self.chat_id)
            .await
            .map(|c| c.display_name(&self.ctx.user_id));

        self.cancel.cancel();
        self.ctx.store.purge_chat(&self.chat_id).await;
        self.auto.forget(&self.chat_id).await;
        match self.ctx.cache.purge_chat(&self.chat_id).await {
            Ok(rows) => info!(chat_id = %self.chat_id, rows, "purged local chat state"),
            Err(e) => warn!(chat_id = %self.chat_id, "failed to purge cached chat: {}", e),
        }

        self.ctx.notify(Notice::RemovedFromChat {
            chat_id: self.chat_id.clone(),
            chat_name,
        });
        true
    }
}

/// One open chat screen.
///
/// Owns the cancellation token for everything started on the chat's behalf:
/// the auto-translate listener and any manual translation still in flight.
/// Closing or dropping the session cancels them.
pub struct ChatSession {
    ctx: ViewContext,
    chat_id: String,
    cancel: CancellationToken,
    auto: Arc<AutoTranslator>,
    translations: TranslationController,
    cultural: CulturalAnalysisLoader,
    grouping: GroupingConfig,
    scroll: ScrollTracker,
    keyboard: KeyboardTracker,
    window: RenderWindow,
    /// Unread count when the chat was opened, for the divider
    unread_at_open: usize,
    eviction: Arc<Eviction>,
    listener: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Load cached state, restore the saved scroll offset, mark the chat read
    /// and start listening for new messages.
    pub async fn open(ctx: ViewContext, chat_id: &str, config: SessionConfig) -> ViewResult<Self> {
        let cancel = CancellationToken::new();

        if ctx.store.chat(chat_id).await.is_none() {
            if let Some(chat) = ctx.cache.chat(chat_id).await? {
                ctx.store.upsert_chat(chat).await;
            }
        }

        let known = ctx.store.message_ids(chat_id).await;
        let cached: Vec<Message> = ctx
            .cache
            .messages(chat_id)
            .await?
            .into_iter()
            .filter(|m| !known.contains(&m.id))
            .collect();
        let loaded = cached.len();
        ctx.store.upsert_many(cached).await;

        // With nothing loaded, the first snapshot from the server seeds instead.
        let auto = Arc::new(AutoTranslator::new(ctx.clone()));
        let known = ctx.store.message_ids(chat_id).await;
        if !known.is_empty() {
            auto.seed(chat_id, known).await;
        }

        let mut scroll = ScrollTracker::new(config.scroll);
        if let Some(saved) = ctx.cache.scroll_position(chat_id).await? {
            scroll.restore(saved.scroll_offset);
        }

        let unread_at_open = ctx
            .store
            .chat(chat_id)
            .await
            .map(|c| c.unread_for(&ctx.user_id) as usize)
            .unwrap_or(0);
        ctx.store.mark_read(chat_id, &ctx.user_id).await;

        let eviction = Arc::new(Eviction {
            ctx: ctx.clone(),
            chat_id: chat_id.to_string(),
            cancel: cancel.clone(),
            auto: auto.clone(),
            removed: AtomicBool::new(false),
        });

        let listener = config.listen.then(|| {
            // Subscribe before spawning so no event between here and the
            // first poll is missed.
            let events = ctx.store.subscribe();
            let auto = auto.clone();
            let eviction = eviction.clone();
            let chat_id = chat_id.to_string();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = auto.run(chat_id, events, cancel).await {
                    eviction.handle(&e).await;
                }
            })
        });

        let total = ctx.store.message_ids(chat_id).await.len();
        info!(chat_id, loaded, unread = unread_at_open, "Chat session opened");

        Ok(Self {
            translations: TranslationController::new(ctx.clone(), cancel.clone()),
            cultural: CulturalAnalysisLoader::new(ctx.clone()),
            ctx,
            chat_id: chat_id.to_string(),
            cancel,
            auto,
            grouping: config.grouping,
            scroll,
            keyboard: KeyboardTracker::default(),
            window: RenderWindow::new(config.render, total),
            unread_at_open,
            eviction,
            listener,
        })
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn context(&self) -> &ViewContext {
        &self.ctx
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_removed(&self) -> bool {
        self.eviction.removed.load(Ordering::SeqCst)
    }

    pub fn translations(&self) -> &TranslationController {
        &self.translations
    }

    pub fn auto_translator(&self) -> &AutoTranslator {
        &self.auto
    }

    pub fn scroll(&mut self) -> &mut ScrollTracker {
        &mut self.scroll
    }

    pub fn keyboard(&mut self) -> &mut KeyboardTracker {
        &mut self.keyboard
    }

    pub fn window(&mut self) -> &mut RenderWindow {
        &mut self.window
    }

    // -- Thread --

    /// The thread as rendered rows in the device's local calendar.
    pub async fn thread(&self) -> Vec<ListItem> {
        self.thread_in(&Local).await
    }

    pub async fn thread_in<Tz: TimeZone>(&self, tz: &Tz) -> Vec<ListItem> {
        let messages = self.ctx.store.messages(&self.chat_id).await;
        materialize_with_unread(visible_messages(&messages, &self.ctx.user_id), self.unread_at_open, tz)
    }

    /// Rows paired with their avatar, time label and sender name flags.
    pub async fn annotated_thread_in<Tz: TimeZone>(&self, tz: &Tz) -> Vec<(ListItem, BubbleFlags)> {
        let items = self.thread_in(tz).await;
        let is_group = self
            .ctx
            .store
            .chat(&self.chat_id)
            .await
            .is_some_and(|c| c.is_group());
        let flags = self.grouping.annotate(&items, is_group, &self.ctx.user_id);
        items.into_iter().zip(flags).collect()
    }

    /// Merge fresh messages from the server into the cache and the store.
    /// The listener picks up the new ids.
    pub async fn ingest(&mut self, messages: Vec<Message>) -> ViewResult<()> {
        let messages: Vec<Message> = messages
            .into_iter()
            .filter(|m| m.chat_id == self.chat_id)
            .collect();
        if messages.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.ctx.cache.store_messages(messages.clone()).await {
            warn!(chat_id = %self.chat_id, "failed to cache incoming messages: {}", e);
        }
        self.ctx.store.upsert_many(messages).await;
        let total = self.ctx.store.message_ids(&self.chat_id).await.len();
        self.window.set_total(total);
        Ok(())
    }

    /// Run an auto-translate sweep over the current messages now.
    pub async fn sweep(&self) -> ViewResult<SweepReport> {
        let messages = self.ctx.store.messages(&self.chat_id).await;
        let result = self.auto.observe(&self.chat_id, &messages, &self.cancel).await;
        self.check(result).await
    }

    // -- Translation --

    pub async fn toggle_translation(&self, message_id: &str) -> ViewResult<TranslationState> {
        let result = self.translations.toggle(&self.chat_id, message_id).await;
        self.check(result).await
    }

    pub async fn cultural_context(&self, message_id: &str) -> ViewResult<CulturalAnalysis> {
        let result = self.cultural.load(&self.chat_id, message_id).await;
        self.check(result).await
    }

    pub fn cultural_loader(&self) -> &CulturalAnalysisLoader {
        &self.cultural
    }

    pub async fn auto_translate_enabled(&self) -> ViewResult<bool> {
        self.ctx.cache.auto_translate_enabled(&self.chat_id).await
    }

    /// Turning auto-translate on only affects messages that arrive afterwards.
    pub async fn set_auto_translate(&self, enabled: bool) -> ViewResult<()> {
        self.ctx.cache.set_auto_translate(&self.chat_id, enabled).await?;
        info!(chat_id = %self.chat_id, enabled, "auto-translate preference changed");
        Ok(())
    }

    pub async fn detect_languages(&self) -> ViewResult<Vec<LanguageShare>> {
        let result = self.auto.detect_chat_languages(&self.chat_id).await;
        self.check(result).await
    }

    // -- Message actions --

    pub async fn stage_message(&self, text: &str) -> Message {
        self.ctx
            .store
            .stage_outgoing(&self.chat_id, &self.ctx.user_id, text)
            .await
    }

    pub async fn mark_sent(&self, message_id: &str) -> ViewResult<()> {
        self.ctx
            .store
            .set_status(&self.chat_id, message_id, MessageStatus::Sent)
            .await
    }

    pub async fn mark_failed(&self, message_id: &str) -> ViewResult<()> {
        self.ctx
            .store
            .set_status(&self.chat_id, message_id, MessageStatus::Failed)
            .await
    }

    pub async fn retry(&self, message_id: &str) -> ViewResult<()> {
        self.ctx.store.retry(&self.chat_id, message_id).await
    }

    pub async fn toggle_reaction(&self, message_id: &str, emoji: &str) -> ViewResult<bool> {
        self.ctx
            .store
            .toggle_reaction(&self.chat_id, message_id, &self.ctx.user_id, emoji)
            .await
    }

    pub async fn delete_for_me(&self, message_id: &str) -> ViewResult<()> {
        self.ctx
            .store
            .delete_for_me(&self.chat_id, message_id, &self.ctx.user_id)
            .await
    }

    pub async fn delete_for_everyone(&self, message_id: &str) -> ViewResult<()> {
        self.ctx.store.delete_for_everyone(&self.chat_id, message_id).await
    }

    // -- Errors and lifecycle --

    async fn check<T>(&self, result: ViewResult<T>) -> ViewResult<T> {
        if let Err(e) = &result {
            self.handle_error(e).await;
        }
        result
    }

    /// Turn a permission failure into local cleanup. Returns true if the
    /// viewer was removed from the chat.
    pub async fn handle_error(&self, err: &ViewError) -> bool {
        self.eviction.handle(err).await
    }

    /// Save the scroll position and stop all session work.
    pub async fn close(mut self) -> ViewResult<()> {
        if !self.is_removed() {
            let anchor = self
                .thread_in(&Utc)
                .await
                .iter()
                .rev()
                .find_map(ListItem::as_message)
                .map(|m| m.id.clone());
            self.ctx
                .cache
                .save_scroll_position(&self.chat_id, self.scroll.offset(), anchor)
                .await?;
        }

        self.cancel.cancel();
        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.await {
                error!(chat_id = %self.chat_id, "auto-translate listener failed: {}", e);
            }
        }
        info!(chat_id = %self.chat_id, "Chat session closed");
        Ok(())
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
