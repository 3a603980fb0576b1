use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("search engine unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("engine rejected query: {reason}")]
    InvalidQuery { reason: String },

    #[error("engine did not respond in time during {operation}")]
    Timeout { operation: String },

    #[error("internal search failure: {0}")]
    Internal(String),
}

impl SearchError {
    /// Transport-level failures the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Timeout { .. })
    }

    /// Status code a transport boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidQuery { .. } => 400,
            Self::ServiceUnavailable(_) => 503,
            Self::Timeout { .. } => 504,
            Self::Internal(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::InvalidQuery { .. } => "invalid_query",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                operation: error
                    .url()
                    .map(|url| url.path().to_string())
                    .unwrap_or_else(|| "request".to_string()),
            }
        } else if error.is_decode() || error.is_body() {
            Self::Internal(format!("malformed engine response: {error}"))
        } else if error.is_connect() || error.is_request() {
            // Refused, reset or closed before a response arrived.
            Self::ServiceUnavailable(error.to_string())
        } else {
            Self::Internal(error.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(error: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {error}"))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid certificate bundle: {0}")]
    Certificate(String),

    #[error("http client setup failed: {0}")]
    Client(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("hit has no identifier")]
    MissingId,

    #[error("hit {0} has no raw text")]
    MissingText(String),
}
