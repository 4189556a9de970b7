// ── Deployment configuration ──
//
// Everything a run needs, passed explicitly into the orchestrator.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default number of devices deployed concurrently.
pub const DEFAULT_MAX_WORKERS: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

/// Whether a run mutates appliances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployMode {
    /// Diff against the current rule set; never mutate.
    #[default]
    DryRun,
    /// Back up, then replace the rule set.
    Live,
}

/// Explicit run configuration for the deployment orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub mode: DeployMode,
    /// Upper bound on concurrently running device tasks.
    pub max_workers: NonZeroUsize,
    /// Directory receiving pre-update backups.
    pub backup_dir: PathBuf,
    /// Organizations to inventory. Empty means every organization the key can see.
    pub org_ids: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            mode: DeployMode::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            backup_dir: PathBuf::from("."),
            org_ids: Vec::new(),
        }
    }
}

impl DeployConfig {
    pub fn is_live(&self) -> bool {
        self.mode == DeployMode::Live
    }

    /// Whether an organization falls inside the configured scope.
    pub fn includes_org(&self, org_id: &str) -> bool {
        self.org_ids.is_empty() || self.org_ids.iter().any(|id| id == org_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_dry_run_with_five_workers() {
        let config = DeployConfig::default();
        assert!(!config.is_live());
        assert_eq!(config.max_workers.get(), 5);
    }

    #[test]
    fn org_scope() {
        let mut config = DeployConfig::default();
        assert!(config.includes_org("123"));
        config.org_ids = vec!["42".into()];
        assert!(config.includes_org("42"));
        assert!(!config.includes_org("123"));
    }
}
