#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_api::{ApiError, ApiResult, Backend, DetectedLanguage, TranslationOutcome};
use parley_db::Database;
use parley_types::api::{
    AdjustFormalityRequest, AnalyzeCulturalContextRequest, LanguageShare, TranslateMessageRequest,
    TranslatePreviewRequest,
};
use parley_types::events::Notice;
use parley_types::models::{CulturalAnalysis, Message, TranslationRecord};
use parley_view::{Cache, MessageStore, ViewContext};
use tokio::sync::{Notify, mpsc};

pub const ME: &str = "me";
pub const CHAT: &str = "c1";
pub const TEN: i64 = 1_709_632_800_000; // 2024-03-05 10:00:00 UTC

/// Backend double that records every call and answers from canned data.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    /// text -> detected language; anything else is "es"
    languages: Mutex<HashMap<String, String>>,
    /// texts whose translation fails with a remote error
    failing: Mutex<HashSet<String>>,
    permission_denied: Mutex<bool>,
    cultural: Mutex<Option<CulturalAnalysis>>,
    /// When set, `translateMessage` waits here after recording the call
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn detect_as(&self, text: &str, language: &str) {
        self.languages
            .lock()
            .unwrap()
            .insert(text.to_string(), language.to_string());
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn deny_all(&self) {
        *self.permission_denied.lock().unwrap() = true;
    }

    pub fn analysis(&self, analysis: CulturalAnalysis) {
        *self.cultural.lock().unwrap() = Some(analysis);
    }

    pub fn hold_translations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, function: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == function).count()
    }

    fn record(&self, function: &str) -> ApiResult<()> {
        self.calls.lock().unwrap().push(function.to_string());
        if *self.permission_denied.lock().unwrap() {
            return Err(ApiError::PermissionDenied("not a participant".into()));
        }
        Ok(())
    }
}

fn remote(function: &str, message: &str) -> ApiError {
    ApiError::Remote {
        function: function.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn translate_message(&self, req: &TranslateMessageRequest) -> ApiResult<TranslationOutcome> {
        self.record("translateMessage")?;
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().unwrap().contains(&req.text) {
            return Err(remote("translateMessage", "model unavailable"));
        }
        Ok(TranslationOutcome {
            translation: TranslationRecord {
                text: format!("[{}] {}", req.target_language, req.text),
                formality_level: None,
                cultural_analysis: None,
                translated_at: None,
            },
            detected_language: req.source_language.clone().or(Some("es".into())),
        })
    }

    async fn translate_preview(&self, req: &TranslatePreviewRequest) -> ApiResult<String> {
        self.record("translatePreview")?;
        Ok(format!("[{}] {}", req.target_language, req.text))
    }

    async fn adjust_formality(&self, req: &AdjustFormalityRequest) -> ApiResult<String> {
        self.record("adjustFormality")?;
        Ok(format!("{:?}: {}", req.formality_level, req.text))
    }

    async fn quick_detect_language(&self, text: &str) -> ApiResult<DetectedLanguage> {
        self.record("quickDetectLanguage")?;
        let language = self
            .languages
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| "es".to_string());
        Ok(DetectedLanguage {
            language,
            confidence: Some(0.9),
        })
    }

    async fn analyze_cultural_context(&self, _req: &AnalyzeCulturalContextRequest) -> ApiResult<CulturalAnalysis> {
        self.record("analyzeCulturalContext")?;
        self.cultural
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| remote("analyzeCulturalContext", "analysis failed"))
    }

    async fn detect_chat_languages(&self, _chat_id: &str) -> ApiResult<Vec<LanguageShare>> {
        self.record("detectChatLanguages")?;
        Ok(vec![
            LanguageShare {
                language: "es".into(),
                message_count: 3,
            },
            LanguageShare {
                language: "en".into(),
                message_count: 1,
            },
        ])
    }
}

pub fn context(backend: Arc<FakeBackend>) -> (ViewContext, mpsc::UnboundedReceiver<Notice>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    ViewContext::new(ME, "en", MessageStore::new(), Cache::new(db), backend)
}

pub fn msg(id: &str, sender: &str, offset_ms: i64, text: &str) -> Message {
    Message::text(id, CHAT, sender, TEN + offset_ms, text)
}
