use dashmap::DashMap;
use parley_api::TranslationOutcome;
use parley_types::api::{AdjustFormalityRequest, TranslateMessageRequest, TranslatePreviewRequest};
use parley_types::models::{Formality, Message, TranslationRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::ViewContext;
use crate::error::{ViewError, ViewResult};

/// Per-message translation view state, derived from the message, the
/// in-flight registry and the viewer's toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationState {
    NoTranslation,
    Pending,
    AvailableHidden,
    AvailableShown,
}

#[derive(Debug, Clone, Copy, Default)]
struct ViewFlags {
    hidden: bool,
    swapped: bool,
}

/// Texts to render for one bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationDisplay<'a> {
    pub state: TranslationState,
    pub primary: &'a str,
    pub secondary: Option<&'a str>,
}

/// Compare language tags by primary subtag, ignoring case ("en-US" == "EN").
pub fn languages_match(a: &str, b: &str) -> bool {
    fn primary(tag: &str) -> &str {
        tag.trim().split(['-', '_']).next().unwrap_or_default()
    }
    let (a, b) = (primary(a), primary(b));
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Call `translateMessage` for `message` in the viewer's language, then write
/// the result to the cache and merge it into the store. Nothing is written
/// once `cancel` fires.
pub(crate) async fn translate_into_store(
    ctx: &ViewContext,
    message: &Message,
    cancel: &CancellationToken,
) -> ViewResult<TranslationRecord> {
    let req = TranslateMessageRequest {
        message_id: message.id.clone(),
        chat_id: message.chat_id.clone(),
        text: message.text.clone(),
        target_language: ctx.language.clone(),
        source_language: message.detected_language.clone(),
    };

    let TranslationOutcome {
        translation,
        detected_language,
    } = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ViewError::Cancelled),
        res = ctx.backend.translate_message(&req) => res?,
    };

    if cancel.is_cancelled() {
        return Err(ViewError::Cancelled);
    }

    if let Err(e) = ctx
        .cache
        .save_translation(&message.chat_id, &message.id, &ctx.language, translation.clone())
        .await
    {
        warn!(message_id = %message.id, "failed to cache translation: {}", e);
    }

    ctx.store
        .apply_translation(
            &message.chat_id,
            &message.id,
            &ctx.language,
            translation.clone(),
            detected_language,
        )
        .await?;

    Ok(translation)
}

/// User-driven translation of individual bubbles and composer text.
pub struct TranslationController {
    ctx: ViewContext,
    cancel: CancellationToken,
    views: DashMap<String, ViewFlags>,
}

impl TranslationController {
    pub fn new(ctx: ViewContext, cancel: CancellationToken) -> Self {
        Self {
            ctx,
            cancel,
            views: DashMap::new(),
        }
    }

    fn flags(&self, message_id: &str) -> ViewFlags {
        self.views.get(message_id).map(|f| *f).unwrap_or_default()
    }

    pub fn state(&self, message: &Message) -> TranslationState {
        if message.translation(&self.ctx.language).is_some() {
            if self.flags(&message.id).hidden {
                TranslationState::AvailableHidden
            } else {
                TranslationState::AvailableShown
            }
        } else if self.ctx.in_flight.contains(&message.id) {
            TranslationState::Pending
        } else {
            TranslationState::NoTranslation
        }
    }

    /// The translate button: reveals or hides an existing translation, or
    /// requests one. A failed request alerts the user and leaves the message
    /// untranslated.
    pub async fn toggle(&self, chat_id: &str, message_id: &str) -> ViewResult<TranslationState> {
        let message = self
            .ctx
            .store
            .message(chat_id, message_id)
            .await
            .ok_or_else(|| ViewError::MessageNotFound(message_id.to_string()))?;

        match self.state(&message) {
            TranslationState::AvailableShown => {
                self.views.entry(message.id.clone()).or_default().hidden = true;
                Ok(TranslationState::AvailableHidden)
            }
            TranslationState::AvailableHidden => {
                self.views.entry(message.id.clone()).or_default().hidden = false;
                Ok(TranslationState::AvailableShown)
            }
            TranslationState::Pending => Ok(TranslationState::Pending),
            TranslationState::NoTranslation => self.request(&message).await,
        }
    }

    async fn request(&self, message: &Message) -> ViewResult<TranslationState> {
        if !message.is_translatable() {
            return Err(ViewError::NotTranslatable(message.id.clone()));
        }
        let Some(_claim) = self.ctx.in_flight.claim(&message.id) else {
            return Ok(TranslationState::Pending);
        };

        debug!(message_id = %message.id, language = %self.ctx.language, "requesting translation");
        match translate_into_store(&self.ctx, message, &self.cancel).await {
            Ok(_) => {
                self.views.insert(message.id.clone(), ViewFlags::default());
                Ok(TranslationState::AvailableShown)
            }
            Err(ViewError::Cancelled) => Err(ViewError::Cancelled),
            Err(e) => {
                self.ctx.alert_failure("Translation failed", &e);
                Err(e)
            }
        }
    }

    /// Swap which text is primary. Only meaningful while shown; returns the
    /// new swap state.
    pub fn toggle_swap(&self, message_id: &str) -> bool {
        let mut flags = self.views.entry(message_id.to_string()).or_default();
        flags.swapped = !flags.swapped;
        flags.swapped
    }

    pub fn display<'a>(&self, message: &'a Message) -> TranslationDisplay<'a> {
        let state = self.state(message);
        let translated = message.translation(&self.ctx.language).map(|t| t.text.as_str());

        match (state, translated) {
            (TranslationState::AvailableShown, Some(text)) if self.flags(&message.id).swapped => TranslationDisplay {
                state,
                primary: text,
                secondary: Some(&message.text),
            },
            (TranslationState::AvailableShown, Some(text)) => TranslationDisplay {
                state,
                primary: &message.text,
                secondary: Some(text),
            },
            _ => TranslationDisplay {
                state,
                primary: &message.text,
                secondary: None,
            },
        }
    }

    /// Translate composer text before it is sent.
    pub async fn translate_preview(
        &self,
        text: &str,
        target_language: &str,
        formality: Option<Formality>,
    ) -> ViewResult<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let req = TranslatePreviewRequest {
            text: text.to_string(),
            target_language: target_language.to_string(),
            formality_level: formality,
        };
        self.ctx
            .backend
            .translate_preview(&req)
            .await
            .map_err(|e| {
                let e = ViewError::from(e);
                self.ctx.alert_failure("Preview failed", &e);
                e
            })
    }

    /// Rewrite composer text at another formality level.
    pub async fn adjust_formality(&self, text: &str, language: &str, formality: Formality) -> ViewResult<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let req = AdjustFormalityRequest {
            text: text.to_string(),
            language: language.to_string(),
            formality_level: formality,
        };
        self.ctx
            .backend
            .adjust_formality(&req)
            .await
            .map_err(|e| {
                let e = ViewError::from(e);
                self.ctx.alert_failure("Could not adjust formality", &e);
                e
            })
    }
}
