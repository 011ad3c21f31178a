//! Background translation of newly arrived messages.
//!
//! Each change to a chat's message set is diffed against the ids already
//! observed for that chat. Only the new ids are considered, so history is
//! never re-scanned. The first non-empty observation of a chat just records
//! what is there.

use std::collections::{HashMap, HashSet};

use parley_types::api::LanguageShare;
use parley_types::events::StoreEvent;
use parley_types::models::Message;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::ViewContext;
use crate::error::{ViewError, ViewResult};
use crate::translation::{languages_match, translate_into_store};

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Ids not observed before this sweep
    pub new_messages: usize,
    pub translated: usize,
    /// Already in the viewer's language
    pub same_language: usize,
    /// Own, non-text, already translated or in flight elsewhere
    pub skipped: usize,
    pub failed: usize,
    /// First observation of the chat; nothing was translated
    pub seeded: bool,
    /// Auto-translate is off for the chat
    pub disabled: bool,
    pub cancelled: bool,
}

enum Outcome {
    Translated,
    SameLanguage,
    Skipped,
}

pub struct AutoTranslator {
    ctx: ViewContext,
    /// chat_id -> message ids already observed
    seen: Mutex<HashMap<String, HashSet<String>>>,
}

impl AutoTranslator {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record `ids` as observed without translating them.
    pub async fn seed<I>(&self, chat_id: &str, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.seen
            .lock()
            .await
            .entry(chat_id.to_string())
            .or_default()
            .extend(ids);
    }

    pub async fn forget(&self, chat_id: &str) {
        self.seen.lock().await.remove(chat_id);
    }

    /// Diff `messages` against the observed ids and translate the new ones.
    ///
    /// A permission failure stops the sweep and is returned; the viewer has
    /// lost access to the chat. Other failures are counted and logged.
    pub async fn observe(
        &self,
        chat_id: &str,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> ViewResult<SweepReport> {
        let mut report = SweepReport::default();

        // Diff and mark seen under one lock so overlapping sweeps split the work.
        let fresh: Vec<&Message> = {
            let mut seen = self.seen.lock().await;
            if !seen.contains_key(chat_id) {
                // Nothing loaded yet. The first history to arrive is the seed.
                if messages.is_empty() {
                    return Ok(report);
                }
                seen.insert(chat_id.to_string(), messages.iter().map(|m| m.id.clone()).collect());
                report.seeded = true;
                return Ok(report);
            }
            let ids = seen.entry(chat_id.to_string()).or_default();
            messages.iter().filter(|m| ids.insert(m.id.clone())).collect()
        };

        report.new_messages = fresh.len();
        if fresh.is_empty() {
            return Ok(report);
        }

        match self.ctx.cache.auto_translate_enabled(chat_id).await {
            Ok(true) => {}
            Ok(false) => {
                report.disabled = true;
                return Ok(report);
            }
            Err(e) => {
                warn!(chat_id, "could not read auto-translate preference: {}", e);
                report.disabled = true;
                return Ok(report);
            }
        }

        debug!(chat_id, count = fresh.len(), "auto-translate sweep");
        for message in fresh {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.process(message, cancel).await {
                Ok(Outcome::Translated) => report.translated += 1,
                Ok(Outcome::SameLanguage) => report.same_language += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(ViewError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) if e.is_permission_denied() => {
                    warn!(chat_id, message_id = %message.id, "auto-translate stopped: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(chat_id, message_id = %message.id, "auto-translate failed: {}", e);
                }
            }
        }

        if report.translated > 0 {
            info!(chat_id, translated = report.translated, "auto-translated new messages");
        }
        Ok(report)
    }

    async fn process(&self, message: &Message, cancel: &CancellationToken) -> ViewResult<Outcome> {
        let language = &self.ctx.language;
        if message.is_from(&self.ctx.user_id) || !message.is_translatable() {
            return Ok(Outcome::Skipped);
        }

        // A manual translation may have landed since the snapshot was taken.
        let current = self
            .ctx
            .store
            .message(&message.chat_id, &message.id)
            .await
            .unwrap_or_else(|| message.clone());
        if current.translation(language).is_some() {
            return Ok(Outcome::Skipped);
        }

        let Some(_claim) = self.ctx.in_flight.claim(&current.id) else {
            return Ok(Outcome::Skipped);
        };

        let detected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ViewError::Cancelled),
            res = self.ctx.backend.quick_detect_language(&current.text) => res?,
        };

        if languages_match(&detected.language, language) {
            debug!(message_id = %current.id, detected = %detected.language, "already in preferred language");
            if let Err(e) = self
                .ctx
                .store
                .set_detected_language(&current.chat_id, &current.id, &detected.language)
                .await
            {
                debug!(message_id = %current.id, "could not record detected language: {}", e);
            }
            return Ok(Outcome::SameLanguage);
        }

        let mut source = current;
        source.detected_language = Some(detected.language);
        translate_into_store(&self.ctx, &source, cancel).await?;
        Ok(Outcome::Translated)
    }

    /// React to store changes of `chat_id` until cancelled. Returns the
    /// permission failure that ended the loop, if any.
    pub async fn run(
        &self,
        chat_id: String,
        mut events: broadcast::Receiver<StoreEvent>,
        cancel: CancellationToken,
    ) -> ViewResult<()> {
        loop {
            let resync = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => event.chat_id() == chat_id && event.may_add_messages(),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(chat_id = %chat_id, "auto-translate listener lagged by {} events", n);
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            if resync {
                let messages = self.ctx.store.messages(&chat_id).await;
                self.observe(&chat_id, &messages, &cancel).await?;
            }
        }
        debug!(chat_id = %chat_id, "auto-translate listener stopped");
        Ok(())
    }

    /// Languages spoken in a chat, for the chat info summary.
    pub async fn detect_chat_languages(&self, chat_id: &str) -> ViewResult<Vec<LanguageShare>> {
        Ok(self.ctx.backend.detect_chat_languages(chat_id).await?)
    }
}
