use dashmap::DashMap;
use parley_types::api::AnalyzeCulturalContextRequest;
use parley_types::models::CulturalAnalysis;
use tracing::{debug, warn};

use crate::context::ViewContext;
use crate::error::{ViewError, ViewResult};

#[derive(Debug, Clone, PartialEq)]
pub enum CulturalState {
    Loading,
    Ready(CulturalAnalysis),
    Failed(String),
}

/// Loads cultural context for a message, preferring the local cache.
///
/// A cached analysis only counts if it carries a whole-message explanation;
/// analyses cached before that field existed are fetched again. Cached
/// entries never expire.
pub struct CulturalAnalysisLoader {
    ctx: ViewContext,
    states: DashMap<String, CulturalState>,
}

impl CulturalAnalysisLoader {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            states: DashMap::new(),
        }
    }

    pub fn state(&self, message_id: &str) -> Option<CulturalState> {
        self.states.get(message_id).map(|s| s.clone())
    }

    pub async fn load(&self, chat_id: &str, message_id: &str) -> ViewResult<CulturalAnalysis> {
        match self.ctx.cache.cultural_analysis(chat_id, message_id).await {
            Ok(Some(analysis)) if analysis.has_explanation() => {
                debug!(chat_id, message_id, "cultural analysis served from cache");
                self.states
                    .insert(message_id.to_string(), CulturalState::Ready(analysis.clone()));
                return Ok(analysis);
            }
            Ok(_) => {}
            Err(e) => warn!(chat_id, message_id, "cultural analysis cache read failed: {}", e),
        }

        let message = self
            .ctx
            .store
            .message(chat_id, message_id)
            .await
            .ok_or_else(|| ViewError::MessageNotFound(message_id.to_string()))?;
        if !message.is_translatable() {
            return Err(ViewError::NotTranslatable(message_id.to_string()));
        }

        self.states.insert(message_id.to_string(), CulturalState::Loading);
        let req = AnalyzeCulturalContextRequest {
            message_id: message.id.clone(),
            chat_id: message.chat_id.clone(),
            text: message.text.clone(),
            user_language: self.ctx.language.clone(),
            source_language: message.detected_language.clone(),
        };

        match self.ctx.backend.analyze_cultural_context(&req).await {
            Ok(analysis) => {
                if let Err(e) = self
                    .ctx
                    .cache
                    .save_cultural_analysis(chat_id, message_id, analysis.clone())
                    .await
                {
                    warn!(chat_id, message_id, "failed to cache cultural analysis: {}", e);
                }
                self.states
                    .insert(message_id.to_string(), CulturalState::Ready(analysis.clone()));
                Ok(analysis)
            }
            Err(e) => {
                let e = ViewError::from(e);
                self.states
                    .insert(message_id.to_string(), CulturalState::Failed(e.to_string()));
                self.ctx.alert_failure("Cultural context unavailable", &e);
                Err(e)
            }
        }
    }
}
