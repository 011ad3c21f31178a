use parley_api::ApiError;
use parley_types::models::MessageStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local cache read or write failed
    #[error(transparent)]
    Cache(#[from] anyhow::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("message {0} not found")]
    MessageNotFound(String),

    #[error("message {0} has no translatable text")]
    NotTranslatable(String),

    #[error("cannot move a message from {from:?} to {to:?}")]
    InvalidTransition { from: MessageStatus, to: MessageStatus },
}

impl ViewError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_permission_denied())
    }
}

pub type ViewResult<T> = Result<T, ViewError>;
