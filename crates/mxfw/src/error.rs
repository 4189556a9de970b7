//! CLI error types with miette diagnostics.
//!
//! Maps config, rule-sheet, and core failures into user-facing errors with
//! actionable help text. Per-device failures never surface here; they are
//! reported as outcome lines and only decide the exit code.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use mxfw_config::ConfigError;
use mxfw_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("No Dashboard API key configured")]
    #[diagnostic(
        code(mxfw::no_credentials),
        help(
            "Set MERAKI_DASHBOARD_API_KEY, pass --api-key,\n\
             or store one with: mxfw config set-key"
        )
    )]
    NoCredentials,

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(mxfw::auth_failed),
        help("Verify the API key has access to the organizations being deployed.")
    )]
    AuthFailed { message: String },

    // ── Rule sheet ───────────────────────────────────────────────────
    #[error("Rule sheet {}: {reason}", path.display())]
    #[diagnostic(
        code(mxfw::rule_sheet),
        help(
            "Expected a CSV export with the header:\n\
             Device, Rule#, Comment, Policy, Protocol, Src Type, Src Value, \
             Dst Type, Dst Value, Src Port, Dst Port"
        )
    )]
    RuleSheet { path: PathBuf, reason: String },

    #[error("Rule sheet {} contains no rules", path.display())]
    #[diagnostic(code(mxfw::empty_rule_sheet))]
    EmptyRuleSheet { path: PathBuf },

    // ── Dashboard ────────────────────────────────────────────────────
    #[error("Could not reach the Dashboard: {message}")]
    #[diagnostic(
        code(mxfw::connection_failed),
        help("Retries were exhausted. Check connectivity and try again later.")
    )]
    Connection { message: String },

    #[error("Dashboard API error: {message}")]
    #[diagnostic(code(mxfw::api_error))]
    Api { message: String },

    // ── Deployment ───────────────────────────────────────────────────
    #[error("{failed} of {total} device(s) did not deploy")]
    #[diagnostic(
        code(mxfw::deployment_incomplete),
        help("See the per-device outcome lines above.")
    )]
    DeploymentIncomplete { failed: usize, total: usize },

    #[error("Deployment aborted")]
    #[diagnostic(code(mxfw::aborted))]
    Aborted,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mxfw::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(mxfw::config),
        help("Inspect the configuration with: mxfw config show")
    )]
    Config(Box<ConfigError>),

    #[error("Configuration file already exists at {}", path.display())]
    #[diagnostic(code(mxfw::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: PathBuf },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Live deployment requires confirmation")]
    #[diagnostic(
        code(mxfw::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes,

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(mxfw::serialization))]
    Serialization(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoCredentials | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Connection { .. } => exit_code::CONNECTION,
            Self::RuleSheet { .. }
            | Self::EmptyRuleSheet { .. }
            | Self::Validation { .. }
            | Self::Config(_)
            | Self::ConfigExists { .. }
            | Self::NonInteractiveRequiresYes => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials => Self::NoCredentials,
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Transient { message, .. } => Self::Connection { message },
            CoreError::Cancelled => Self::Aborted,
            other => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

impl From<mxfw_api::Error> for CliError {
    fn from(err: mxfw_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::NoCredentials.exit_code(), exit_code::AUTH);
        assert_eq!(
            CliError::RuleSheet {
                path: "rules.csv".into(),
                reason: "x".into()
            }
            .exit_code(),
            exit_code::USAGE
        );
        assert_eq!(
            CliError::DeploymentIncomplete { failed: 1, total: 2 }.exit_code(),
            exit_code::GENERAL
        );
    }

    #[test]
    fn transient_core_errors_are_connection_failures() {
        let err = CliError::from(CoreError::Transient {
            message: "timed out".into(),
            status: None,
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }
}
