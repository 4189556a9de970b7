use thiserror::Error;

/// Top-level error type for the `mxfw-api` crate.
///
/// Covers every failure mode of the Dashboard API surface: credentials,
/// transport, rate limiting, structured API errors, and payload decoding.
/// `mxfw-core` classifies these into deployment outcomes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// API key rejected by the Dashboard (HTTP 401).
    #[error("Invalid API key")]
    InvalidApiKey,

    /// API key header could not be constructed.
    #[error("Invalid API key header value: {0}")]
    InvalidApiKeyHeader(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying `reqwest::Client` could not be built.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Dashboard ───────────────────────────────────────────────────
    /// Rate limited and out of retry attempts.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Structured error from the Dashboard API (`{"errors": [...]}`).
    #[error("Dashboard API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Request body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Connection failures, timeouts, rate limiting, and server-side
    /// (5xx) errors are transient; everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status associated with this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::InvalidApiKey => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
