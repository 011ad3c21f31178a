/// Cache row types — these map directly to SQLite rows.
/// Document payloads stay as JSON text; `cache.rs` converts them to
/// parley-types models.

pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sent_at: Option<i64>,
    pub payload: String,
}

pub struct TranslationRow {
    pub message_id: String,
    pub language: String,
    pub payload: String,
}

pub struct CulturalAnalysisRow {
    pub message_id: String,
    pub chat_id: String,
    pub payload: String,
    pub analyzed_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPositionRow {
    pub chat_id: String,
    pub scroll_offset: f64,
    pub anchor_message_id: Option<String>,
}
