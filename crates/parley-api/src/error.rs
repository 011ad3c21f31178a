use thiserror::Error;

/// Errors raised while calling a remote function.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (DNS, TLS, timeout, connection reset)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status without a callable error body
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// The caller is not allowed to act on the resource (e.g. removed from a group)
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Error envelope returned by the function runtime
    #[error("{function} failed with {status}: {message}")]
    Callable {
        function: String,
        status: String,
        message: String,
    },

    /// The function ran but reported `success: false`
    #[error("{function} reported failure: {message}")]
    Remote { function: String, message: String },

    /// `success: true` but a payload field the caller needs is absent
    #[error("{function} response is missing `{field}`")]
    MissingField { function: String, field: &'static str },

    /// Response body is not the expected JSON shape
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Failures worth a user retry: transport errors and server-side 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Callable { status, .. } => status == "UNAVAILABLE" || status == "DEADLINE_EXCEEDED",
            _ => false,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
