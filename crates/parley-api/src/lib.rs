//! Client for the remote callable functions.
//!
//! The view-model depends on [`Backend`] only; [`CallableClient`] is the
//! HTTPS implementation used in production.

pub mod backend;
pub mod callable;
pub mod error;

pub use backend::{Backend, DetectedLanguage, TranslationOutcome};
pub use callable::CallableClient;
pub use error::{ApiError, ApiResult};
