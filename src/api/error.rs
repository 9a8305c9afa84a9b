use thiserror::Error;

/// Errors from a single Miniflux API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Coarse failure category surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No connectivity, DNS/TLS failure or timeout.
    Transport,
    /// The server rejected the credentials or token (401/403).
    Unauthorized,
    /// Non-2xx status or a body that does not match the expected shape.
    Decode,
    /// No usable base URL or token has been configured.
    NotConfigured,
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Timeout(_) | ApiError::Network(_) => FailureKind::Transport,
            ApiError::HttpStatus(401) | ApiError::HttpStatus(403) => FailureKind::Unauthorized,
            ApiError::HttpStatus(_) | ApiError::ResponseTooLarge(_) | ApiError::Decode(_) => {
                FailureKind::Decode
            }
            ApiError::InvalidBaseUrl(_) | ApiError::InsecureBaseUrl => FailureKind::NotConfigured,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FailureKind::Transport => "server unreachable",
            FailureKind::Unauthorized => "not authorized",
            FailureKind::Decode => "unexpected server response",
            FailureKind::NotConfigured => "not configured",
        };
        f.write_str(text)
    }
}
