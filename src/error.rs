use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Result of a call through the API client.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub const NETWORK_ERROR_STATUS: u16 = 503;
pub const INTERNAL_ERROR_STATUS: u16 = 500;
pub const VALIDATION_ERROR_STATUS: u16 = 422;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid visibility value: {0:?}")]
    InvalidVisibility(String),

    #[error("Invalid prompt path: {0}")]
    InvalidPromptPath(String),

    #[error("Not signed in. Run `prompt-news login <username>` first.")]
    NotSignedIn,

    #[error("Already signed in. Run `prompt-news logout` to switch accounts.")]
    AlreadySignedIn,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Broad classification of an [`ApiError`].
///
/// The status code alone cannot tell "the server said 503" apart from "the
/// server could not be reached", so callers branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 401 from the backend. The stored token has already been cleared.
    Unauthorized,
    /// Any other non-2xx response from the backend.
    Rejected,
    /// Request rejected locally before it was sent.
    Validation,
    /// The backend could not be reached.
    Network,
    /// Anything else: undecodable bodies, client construction failures.
    Internal,
}

/// Structured error returned by every API call: `{status, message, detail?}`.
///
/// Network failures carry status 503, which a reachable backend can also
/// send. Branch on [`ApiError::kind`], never on `status`, to tell them apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (HTTP {status}){}", detail_suffix(.detail))]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(
        kind: ApiErrorKind,
        status: u16,
        message: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            detail,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(ApiErrorKind::Unauthorized, 401, "Unauthorized access", None)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(
            ApiErrorKind::Network,
            NETWORK_ERROR_STATUS,
            "Network error",
            Some(detail.into()),
        )
    }

    pub fn internal(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(
            ApiErrorKind::Internal,
            INTERNAL_ERROR_STATUS,
            message,
            Some(detail.into()),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorKind::Validation,
            VALIDATION_ERROR_STATUS,
            message,
            None,
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    pub fn is_network(&self) -> bool {
        self.kind == ApiErrorKind::Network
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            ApiError::network(err.to_string())
        } else {
            ApiError::internal("Internal error", err.to_string())
        }
    }
}
