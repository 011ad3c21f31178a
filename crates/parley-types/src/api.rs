use serde::{Deserialize, Serialize};

use crate::models::{CulturalAnalysis, Formality, TranslationRecord};

// Argument and result shapes of the remote callable functions. Every result
// carries a `success` flag; payload fields are optional because a failed call
// returns only `success: false` and an `error` string.

// -- translateMessage --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateMessageRequest {
    pub message_id: String,
    pub chat_id: String,
    pub text: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateMessageResponse {
    pub success: bool,
    #[serde(default)]
    pub translation: Option<TranslationRecord>,
    #[serde(default)]
    pub detected_language: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// -- translatePreview --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatePreviewRequest {
    pub text: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formality_level: Option<Formality>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatePreviewResponse {
    pub success: bool,
    #[serde(default)]
    pub translated_text: Option<String>,
    #[serde(default)]
    pub detected_language: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// -- adjustFormality --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustFormalityRequest {
    pub text: String,
    pub language: String,
    pub formality_level: Formality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustFormalityResponse {
    pub success: bool,
    #[serde(default)]
    pub adjusted_text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// -- quickDetectLanguage --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickDetectLanguageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickDetectLanguageResponse {
    pub success: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

// -- analyzeCulturalContext --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeCulturalContextRequest {
    pub message_id: String,
    pub chat_id: String,
    pub text: String,
    /// Language the explanation should be written in.
    pub user_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeCulturalContextResponse {
    pub success: bool,
    #[serde(default)]
    pub analysis: Option<CulturalAnalysis>,
    #[serde(default)]
    pub error: Option<String>,
}

// -- detectChatLanguages --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectChatLanguagesRequest {
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageShare {
    pub language: String,
    #[serde(default)]
    pub message_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectChatLanguagesResponse {
    pub success: bool,
    #[serde(default)]
    pub languages: Vec<LanguageShare>,
    #[serde(default)]
    pub error: Option<String>,
}
