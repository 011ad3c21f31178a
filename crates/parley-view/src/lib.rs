pub mod auto_translate;
pub mod cache;
pub mod context;
pub mod cultural;
pub mod error;
pub mod grouping;
pub mod inflight;
pub mod materialize;
pub mod scroll;
pub mod session;
pub mod store;
pub mod translation;

pub use auto_translate::{AutoTranslator, SweepReport};
pub use cache::Cache;
pub use context::ViewContext;
pub use cultural::{CulturalAnalysisLoader, CulturalState};
pub use error::{ViewError, ViewResult};
pub use grouping::{
    BubbleFlags, GroupingConfig, group_annotations, should_show_avatar, should_show_sender_name,
    should_show_timestamp,
};
pub use inflight::{InFlightClaim, InFlightRegistry};
pub use materialize::{ListItem, materialize, materialize_in, materialize_with_unread, visible_messages};
pub use scroll::{KeyboardTracker, RenderWindow, RenderWindowConfig, ScrollCommand, ScrollConfig, ScrollTracker};
pub use session::{ChatSession, SessionConfig};
pub use store::MessageStore;
pub use translation::{TranslationController, TranslationDisplay, TranslationState, languages_match};
