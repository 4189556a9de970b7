// ── Core error types ──
//
// Domain errors from mxfw-core. Per-device failures are converted into a
// `DeploymentResult` at the task boundary; only run-level failures (no
// organization inventory at all) escape `Orchestrator::run`. The
// `From<mxfw_api::Error>` impl classifies transport errors so callers can
// tell transient from permanent failures without touching HTTP details.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup / validation ──────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("{count} invalid rule(s) for {device}")]
    ValidationFailed { device: String, count: usize },

    // ── Dashboard errors (wrapped, not exposed raw) ──────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Transient API error: {message}")]
    Transient {
        message: String,
        status: Option<u16>,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    /// The appliance returned a rule this deployer cannot represent.
    #[error("Unrecognized remote rule: {message}")]
    UnrecognizedRule { message: String },

    // ── Deployment ───────────────────────────────────────────────────
    #[error("Backup to {} failed: {message}", path.display())]
    Backup { path: PathBuf, message: String },

    #[error("Deployment cancelled")]
    Cancelled,

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` when retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<mxfw_api::Error> for CoreError {
    fn from(err: mxfw_api::Error) -> Self {
        let status = err.status();
        let message = err.to_string();
        if matches!(
            err,
            mxfw_api::Error::InvalidApiKey | mxfw_api::Error::InvalidApiKeyHeader(_)
        ) {
            CoreError::AuthenticationFailed { message }
        } else if err.is_transient() {
            CoreError::Transient { message, status }
        } else {
            CoreError::Api { message, status }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient() {
        let err = CoreError::from(mxfw_api::Error::RateLimited {
            retry_after_secs: 3,
        });
        assert!(err.is_transient());
        assert!(matches!(err, CoreError::Transient { status: Some(429), .. }));
    }

    #[test]
    fn server_error_is_transient_client_error_is_not() {
        let server = CoreError::from(mxfw_api::Error::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(server.is_transient());

        let client = CoreError::from(mxfw_api::Error::Api {
            status: 400,
            message: "bad request".into(),
        });
        assert!(!client.is_transient());
        assert!(matches!(client, CoreError::Api { status: Some(400), .. }));
    }

    #[test]
    fn invalid_key_is_authentication() {
        let err = CoreError::from(mxfw_api::Error::InvalidApiKey);
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}
