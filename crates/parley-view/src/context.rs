use std::sync::Arc;

use parley_api::Backend;
use parley_types::events::Notice;
use tokio::sync::mpsc;
use tracing::warn;

use crate::cache::Cache;
use crate::error::ViewError;
use crate::inflight::InFlightRegistry;
use crate::store::MessageStore;

/// Everything the per-chat components share: who is looking, in which
/// language, and the handles to the store, cache and remote functions.
#[derive(Clone)]
pub struct ViewContext {
    pub user_id: String,
    /// Preferred reading language of the viewer
    pub language: String,
    pub store: MessageStore,
    pub cache: Cache,
    pub backend: Arc<dyn Backend>,
    pub in_flight: InFlightRegistry,
    notices_tx: mpsc::UnboundedSender<Notice>,
}

impl ViewContext {
    pub fn new(
        user_id: impl Into<String>,
        language: impl Into<String>,
        store: MessageStore,
        cache: Cache,
        backend: Arc<dyn Backend>,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let ctx = Self {
            user_id: user_id.into(),
            language: language.into(),
            store,
            cache,
            backend,
            in_flight: InFlightRegistry::new(),
            notices_tx,
        };
        (ctx, notices_rx)
    }

    pub fn notify(&self, notice: Notice) {
        let _ = self.notices_tx.send(notice);
    }

    /// Raise a blocking alert for a failed user action. Permission failures
    /// are left to the session, which turns them into a removal notice.
    pub fn alert_failure(&self, title: &str, err: &ViewError) {
        warn!("{}: {}", title, err);
        if !err.is_permission_denied() {
            self.notify(Notice::alert(title, err.to_string()));
        }
    }
}
