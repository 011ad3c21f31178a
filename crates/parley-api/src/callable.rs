use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use parley_types::api::{
    AdjustFormalityRequest, AdjustFormalityResponse, AnalyzeCulturalContextRequest,
    AnalyzeCulturalContextResponse, DetectChatLanguagesRequest, DetectChatLanguagesResponse,
    LanguageShare, QuickDetectLanguageRequest, QuickDetectLanguageResponse, TranslateMessageRequest,
    TranslateMessageResponse, TranslatePreviewRequest, TranslatePreviewResponse,
};
use parley_types::models::CulturalAnalysis;

use crate::backend::{Backend, DetectedLanguage, TranslationOutcome};
use crate::error::{ApiError, ApiResult};

/// Remote function names.
pub mod functions {
    pub const TRANSLATE_MESSAGE: &str = "translateMessage";
    pub const TRANSLATE_PREVIEW: &str = "translatePreview";
    pub const ADJUST_FORMALITY: &str = "adjustFormality";
    pub const QUICK_DETECT_LANGUAGE: &str = "quickDetectLanguage";
    pub const ANALYZE_CULTURAL_CONTEXT: &str = "analyzeCulturalContext";
    pub const DETECT_CHAT_LANGUAGES: &str = "detectChatLanguages";
}

use functions::*;

#[derive(Serialize)]
struct CallableRequest<'a, T: Serialize + ?Sized> {
    data: &'a T,
}

#[derive(Deserialize)]
struct CallableEnvelope {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<CallableErrorBody>,
}

#[derive(Deserialize)]
struct CallableErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// HTTPS client for callable functions: `POST <base>/<name>` with
/// `{"data": args}`, answered by `{"result": ...}` or `{"error": {...}}`.
#[derive(Clone)]
pub struct CallableClient {
    http: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl CallableClient {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, auth_token))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            auth_token,
        }
    }

    pub fn endpoint(&self, function: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), function)
    }

    /// Invoke `function` with `args` and decode its `result`.
    pub async fn call<Req, Resp>(&self, function: &str, args: &Req) -> ApiResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(self.endpoint(function))
            .json(&CallableRequest { data: args });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        debug!(function, "calling remote function");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        decode_response(function, status, &body)
    }
}

/// Map an HTTP status and body to the callable result or an [`ApiError`].
pub fn decode_response<Resp: DeserializeOwned>(function: &str, status: u16, body: &str) -> ApiResult<Resp> {
    let parsed = serde_json::from_str::<CallableEnvelope>(body);

    if let Ok(CallableEnvelope { error: Some(err), .. }) = &parsed {
        return Err(match err.status.as_str() {
            "PERMISSION_DENIED" | "UNAUTHENTICATED" => ApiError::PermissionDenied(err.message.clone()),
            _ => ApiError::Callable {
                function: function.to_string(),
                status: err.status.clone(),
                message: err.message.clone(),
            },
        });
    }

    if status == 401 || status == 403 {
        return Err(ApiError::PermissionDenied(body.to_string()));
    }

    if !(200..300).contains(&status) {
        warn!(function, status, "remote function returned an error status");
        return Err(ApiError::Status {
            status,
            body: body.to_string(),
        });
    }

    let result = parsed?.result.ok_or_else(|| missing(function, "result"))?;
    Ok(serde_json::from_value(result)?)
}

fn missing(function: &str, field: &'static str) -> ApiError {
    ApiError::MissingField {
        function: function.to_string(),
        field,
    }
}

/// Common `success`/`error` fields of every function result.
trait CallableResult: Sized {
    fn success(&self) -> bool;
    fn error(&self) -> Option<&str>;

    fn ensure_success(self, function: &str) -> ApiResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ApiError::Remote {
                function: function.to_string(),
                message: self.error().unwrap_or("unknown error").to_string(),
            })
        }
    }
}

macro_rules! callable_result {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CallableResult for $ty {
                fn success(&self) -> bool {
                    self.success
                }

                fn error(&self) -> Option<&str> {
                    self.error.as_deref()
                }
            }
        )*
    };
}

callable_result!(
    TranslateMessageResponse,
    TranslatePreviewResponse,
    AdjustFormalityResponse,
    QuickDetectLanguageResponse,
    AnalyzeCulturalContextResponse,
    DetectChatLanguagesResponse,
);

#[async_trait]
impl Backend for CallableClient {
    async fn translate_message(&self, req: &TranslateMessageRequest) -> ApiResult<TranslationOutcome> {
        let resp: TranslateMessageResponse = self.call(TRANSLATE_MESSAGE, req).await?;
        let resp = resp.ensure_success(TRANSLATE_MESSAGE)?;
        let translation = resp
            .translation
            .ok_or_else(|| missing(TRANSLATE_MESSAGE, "translation"))?;
        Ok(TranslationOutcome {
            translation,
            detected_language: resp.detected_language,
        })
    }

    async fn translate_preview(&self, req: &TranslatePreviewRequest) -> ApiResult<String> {
        let resp: TranslatePreviewResponse = self.call(TRANSLATE_PREVIEW, req).await?;
        resp.ensure_success(TRANSLATE_PREVIEW)?
            .translated_text
            .ok_or_else(|| missing(TRANSLATE_PREVIEW, "translatedText"))
    }

    async fn adjust_formality(&self, req: &AdjustFormalityRequest) -> ApiResult<String> {
        let resp: AdjustFormalityResponse = self.call(ADJUST_FORMALITY, req).await?;
        resp.ensure_success(ADJUST_FORMALITY)?
            .adjusted_text
            .ok_or_else(|| missing(ADJUST_FORMALITY, "adjustedText"))
    }

    async fn quick_detect_language(&self, text: &str) -> ApiResult<DetectedLanguage> {
        let req = QuickDetectLanguageRequest { text: text.to_string() };
        let resp: QuickDetectLanguageResponse = self.call(QUICK_DETECT_LANGUAGE, &req).await?;
        let resp = resp.ensure_success(QUICK_DETECT_LANGUAGE)?;
        let language = resp
            .language
            .ok_or_else(|| missing(QUICK_DETECT_LANGUAGE, "language"))?;
        Ok(DetectedLanguage {
            language,
            confidence: resp.confidence,
        })
    }

    async fn analyze_cultural_context(&self, req: &AnalyzeCulturalContextRequest) -> ApiResult<CulturalAnalysis> {
        let resp: AnalyzeCulturalContextResponse = self.call(ANALYZE_CULTURAL_CONTEXT, req).await?;
        resp.ensure_success(ANALYZE_CULTURAL_CONTEXT)?
            .analysis
            .ok_or_else(|| missing(ANALYZE_CULTURAL_CONTEXT, "analysis"))
    }

    async fn detect_chat_languages(&self, chat_id: &str) -> ApiResult<Vec<LanguageShare>> {
        let req = DetectChatLanguagesRequest {
            chat_id: chat_id.to_string(),
        };
        let resp: DetectChatLanguagesResponse = self.call(DETECT_CHAT_LANGUAGES, &req).await?;
        Ok(resp.ensure_success(DETECT_CHAT_LANGUAGES)?.languages)
    }
}
