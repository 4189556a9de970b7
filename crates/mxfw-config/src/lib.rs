//! Configuration for the mxfw deployer.
//!
//! TOML file + environment loading (figment), API key resolution
//! (env + keyring + plaintext), and translation to the transport and
//! deployment settings consumed by `mxfw-api` and `mxfw-core`. The CLI
//! adds flag overrides on top.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mxfw_api::{DEFAULT_BASE_URL, RetryPolicy, TransportConfig};
use mxfw_core::{DEFAULT_MAX_WORKERS, DeployConfig, DeployMode};

/// Keyring service name; the key is stored under [`KEYRING_USER`].
pub const KEYRING_SERVICE: &str = "mxfw";
pub const KEYRING_USER: &str = "api-key";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no Dashboard API key configured")]
    NoCredentials,

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Devices deployed concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Where pre-update backups are written. Defaults to the working directory.
    pub backup_dir: Option<PathBuf>,

    /// Organizations to inventory. Empty means all.
    #[serde(default)]
    pub org_ids: Vec<String>,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: None,
            base_url: default_base_url(),
            timeout: default_timeout(),
            max_workers: default_max_workers(),
            backup_dir: None,
            org_ids: Vec::new(),
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetrySettings {
    /// Attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS.get()
}
fn default_max_attempts() -> u32 {
    4
}
fn default_base_delay_ms() -> u64 {
    500
}

impl Config {
    /// Copy with the plaintext key masked, for display.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| "********".into()),
            ..self.clone()
        }
    }

    /// Check values figment cannot: URL shape and non-zero counts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("{e}: {}", self.base_url),
        })?;
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Validation {
                field: "max_workers".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation {
                field: "retry.max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// HTTP transport settings for the Dashboard client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.timeout),
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
                ..RetryPolicy::default()
            },
        }
    }

    /// Orchestrator settings for a run in `mode`.
    pub fn deploy_config(&self, mode: DeployMode) -> Result<DeployConfig, ConfigError> {
        let max_workers =
            NonZeroUsize::new(self.max_workers).ok_or_else(|| ConfigError::Validation {
                field: "max_workers".into(),
                reason: "must be at least 1".into(),
            })?;
        Ok(DeployConfig {
            mode,
            max_workers,
            backup_dir: self.backup_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            org_ids: self.org_ids.clone(),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "mxfw", "mxfw").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mxfw");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file + environment.
///
/// Environment keys use the `MXFW_` prefix; nested keys are separated by a
/// double underscore (`MXFW_RETRY__MAX_ATTEMPTS`). Values are not
/// validated here: callers apply command-line overrides first, then call
/// [`Config::validate`].
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MXFW_").split("__"));

    Ok(figment.extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(config: &Config) -> Result<SecretString, ConfigError> {
    // 1. api_key_env → env var lookup
    if let Some(ref env_name) = config.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = config.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials)
}

/// Store the API key in the system keyring.
pub fn store_api_key(key: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?.set_password(key)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.max_workers, 5);
        assert_eq!(cfg.retry.max_attempts, 4);
        cfg.validate().unwrap();
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
max_workers = 8
backup_dir = "/var/backups/mxfw"
org_ids = ["123", "456"]

[retry]
max_attempts = 2
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.max_workers, 8);
        assert_eq!(cfg.org_ids, vec!["123", "456"]);
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.retry.base_delay_ms, 500);

        let deploy = cfg.deploy_config(DeployMode::Live).unwrap();
        assert_eq!(deploy.max_workers.get(), 8);
        assert_eq!(deploy.backup_dir, PathBuf::from("/var/backups/mxfw"));
        assert!(deploy.is_live());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.timeout, 30);
    }

    #[test]
    fn invalid_file_values_load_and_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_workers = 0\nbase_url = \"not a url\"\n").unwrap();

        let mut cfg = load_config_from(&path).unwrap();
        assert!(cfg.validate().is_err());

        cfg.max_workers = 3;
        cfg.base_url = DEFAULT_BASE_URL.into();
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = Config {
            max_workers: 0,
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "max_workers"
        ));
    }

    #[test]
    fn bad_base_url_rejected() {
        let cfg = Config {
            base_url: "not a url".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn transport_uses_retry_settings() {
        let cfg = Config {
            timeout: 12,
            retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 50,
            },
            ..Config::default()
        };
        let transport = cfg.transport();
        assert_eq!(transport.timeout, Duration::from_secs(12));
        assert_eq!(transport.retry.max_attempts, 3);
        assert_eq!(transport.retry.base_delay, Duration::from_millis(50));
    }

    #[test]
    fn redacted_masks_plaintext_key() {
        let cfg = Config {
            api_key: Some("secret".into()),
            ..Config::default()
        };
        assert_eq!(cfg.redacted().api_key.as_deref(), Some("********"));
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            org_ids: vec!["42".into()],
            ..Config::default()
        };
        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap().org_ids, vec!["42"]);
    }

    #[test]
    fn plaintext_key_is_last_resort() {
        let cfg = Config {
            api_key: Some("plain".into()),
            ..Config::default()
        };
        // The keyring may or may not hold a key on the test host; either way
        // a key must resolve.
        let key = resolve_api_key(&cfg).unwrap();
        assert!(!key.expose_secret().is_empty());
    }
}
