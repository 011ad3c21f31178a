use async_trait::async_trait;
use parley_types::api::{
    AdjustFormalityRequest, AnalyzeCulturalContextRequest, LanguageShare, TranslateMessageRequest,
    TranslatePreviewRequest,
};
use parley_types::models::{CulturalAnalysis, TranslationRecord};

use crate::error::ApiResult;

/// Result of `translateMessage`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    pub translation: TranslationRecord,
    pub detected_language: Option<String>,
}

/// Result of `quickDetectLanguage`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedLanguage {
    pub language: String,
    pub confidence: Option<f64>,
}

/// The remote functions the view-model calls, by name.
///
/// Implementations return the payload of a successful call; a result with
/// `success: false` is an error.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `translateMessage`
    async fn translate_message(&self, req: &TranslateMessageRequest) -> ApiResult<TranslationOutcome>;

    /// `translatePreview`
    async fn translate_preview(&self, req: &TranslatePreviewRequest) -> ApiResult<String>;

    /// `adjustFormality`
    async fn adjust_formality(&self, req: &AdjustFormalityRequest) -> ApiResult<String>;

    /// `quickDetectLanguage`
    async fn quick_detect_language(&self, text: &str) -> ApiResult<DetectedLanguage>;

    /// `analyzeCulturalContext`
    async fn analyze_cultural_context(&self, req: &AnalyzeCulturalContextRequest) -> ApiResult<CulturalAnalysis>;

    /// `detectChatLanguages`
    async fn detect_chat_languages(&self, chat_id: &str) -> ApiResult<Vec<LanguageShare>>;
}
