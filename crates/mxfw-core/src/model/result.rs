// ── Deployment outcome domain types ──

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::expanded::ExpandedRule;

/// Why a device was not deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    DeviceNotFound,
    InvalidRules { count: usize },
    Cancelled,
    /// Another sheet group resolves to the same network. Each push replaces
    /// the whole network rule set, so none of them is pushed.
    SharedNetwork { network_id: String, with: Vec<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound => f.write_str("device not found"),
            Self::InvalidRules { count: 1 } => f.write_str("1 invalid rule"),
            Self::InvalidRules { count } => write!(f, "{count} invalid rules"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::SharedNetwork { network_id, with } => {
                write!(f, "network {network_id} is also targeted by {}", with.join(", "))
            }
        }
    }
}

/// What happened to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Pushed { rules: usize, backup: PathBuf },
    DryRun {
        added: Vec<ExpandedRule>,
        removed: Vec<ExpandedRule>,
    },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pushed { .. } => "pushed",
            Self::DryRun { .. } => "dry-run",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Per-device outcome, produced exactly once per device group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
    pub device_ref: String,
    pub device_name: Option<String>,
    /// Rules the sheet expanded to for this device, in push order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expanded: Vec<ExpandedRule>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl DeploymentResult {
    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Pushed { .. } | Outcome::DryRun { .. }
        )
    }

    /// Device name when resolved, otherwise the sheet reference.
    pub fn display_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(&self.device_ref)
    }

    /// Short human summary of the outcome.
    pub fn detail(&self) -> String {
        match &self.outcome {
            Outcome::Pushed { rules, backup } => {
                format!("{rules} rules pushed (backup: {})", backup.display())
            }
            Outcome::DryRun { added, removed } if added.is_empty() && removed.is_empty() => {
                "no changes".to_owned()
            }
            Outcome::DryRun { added, removed } => {
                format!("+{} / -{} rules", added.len(), removed.len())
            }
            Outcome::Skipped { reason } => reason.to_string(),
            Outcome::Failed { error } => error.clone(),
        }
    }
}

impl fmt::Display for DeploymentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.display_name(),
            self.outcome.label(),
            self.detail()
        )
    }
}
