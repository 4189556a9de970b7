// ── Deployment orchestrator ──
//
// One task per device group, bounded by a semaphore. Each task resolves
// its appliance, expands its rows, validates them as a unit, then either
// diffs (dry-run) or backs up and replaces the rule set (live). Tasks
// never print: progress flows to a single consumer as `DeployEvent`s, and
// every task's outcome is captured independently, panics included.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use indexmap::IndexMap;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backup::write_backup;
use crate::config::DeployConfig;
use crate::convert::{from_wire, to_wire};
use crate::diff::RuleDiff;
use crate::error::CoreError;
use crate::expand::{expand, order_rows};
use crate::model::{
    DeploymentResult, Device, ExpandedRule, Expansion, InvalidRule, Outcome, RuleRow, SkipReason,
};
use crate::objects::ObjectResolver;
use crate::provider::Dashboard;
use crate::topology::{DeviceIndex, TopologyResolver, normalize_ref};

// ── Events ──────────────────────────────────────────────────────────

/// Progress reported by device tasks, in per-device order.
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// The device resolved and its topology was loaded.
    DeviceStarted {
        device_ref: String,
        device_name: String,
        dual_uplink: bool,
    },
    RuleExpanded {
        device: String,
        rule: ExpandedRule,
    },
    RuleInvalid {
        device: String,
        rule: InvalidRule,
    },
    DiffComputed {
        device: String,
        diff: RuleDiff,
    },
    BackupWritten {
        device: String,
        path: PathBuf,
    },
    Finished(DeploymentResult),
}

// ── Plan ────────────────────────────────────────────────────────────

/// Rows destined for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRules {
    /// Reference as first written in the sheet (trimmed).
    pub reference: String,
    pub rows: Vec<RuleRow>,
}

/// Rows grouped per device reference, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePlan {
    groups: IndexMap<String, DeviceRules>,
}

impl RulePlan {
    pub fn from_rows(rows: impl IntoIterator<Item = RuleRow>) -> Self {
        let mut groups: IndexMap<String, DeviceRules> = IndexMap::new();
        for row in rows {
            groups
                .entry(normalize_ref(&row.device_ref))
                .or_insert_with(|| DeviceRules {
                    reference: row.device_ref.trim().to_owned(),
                    rows: Vec::new(),
                })
                .rows
                .push(row);
        }
        Self { groups }
    }

    pub fn groups(&self) -> impl Iterator<Item = &DeviceRules> {
        self.groups.values()
    }

    /// Number of device groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total rows across all groups.
    pub fn rule_count(&self) -> usize {
        self.groups.values().map(|g| g.rows.len()).sum()
    }
}

// ── Orchestrator ────────────────────────────────────────────────────

/// Drives deployment of a [`RulePlan`] across devices.
pub struct Orchestrator<D> {
    api: Arc<D>,
    config: Arc<DeployConfig>,
    events: mpsc::UnboundedSender<DeployEvent>,
    cancel: CancellationToken,
}

impl<D: Dashboard> Orchestrator<D> {
    /// Build an orchestrator and the receiving end of its event stream.
    ///
    /// The stream closes once [`run`](Self::run) returns.
    pub fn new(api: Arc<D>, config: DeployConfig) -> (Self, mpsc::UnboundedReceiver<DeployEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            api,
            config: Arc::new(config),
            events,
            cancel: CancellationToken::new(),
        };
        (orchestrator, rx)
    }

    /// Use an externally owned cancellation token (e.g. wired to Ctrl-C).
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Deploy every device group, returning outcomes in completion order.
    ///
    /// Only a failure to inventory organizations at all is returned as an
    /// error; everything per-device becomes a [`DeploymentResult`].
    pub async fn run(self, plan: RulePlan) -> Result<Vec<DeploymentResult>, CoreError> {
        let started = Instant::now();
        let topology = TopologyResolver::new(Arc::clone(&self.api));

        let index = match until_cancelled(&self.cancel, topology.load_index(&self.config)).await {
            Ok(index) => Arc::new(index?),
            Err(_) => {
                warn!("cancelled before inventory completed");
                return Ok(self.skip_all(plan));
            }
        };

        info!(
            devices = plan.len(),
            rows = plan.rule_count(),
            workers = self.config.max_workers.get(),
            mode = ?self.config.mode,
            "starting deployment"
        );

        let mut results = Vec::with_capacity(plan.len());
        let shared = shared_networks(&plan, &index);

        let permits = Arc::new(Semaphore::new(self.config.max_workers.get()));
        let mut tasks = JoinSet::new();
        let mut references = HashMap::new();

        for (key, group) in plan.groups {
            if let Some((device, reason)) = shared.get(&key) {
                warn!(device = %group.reference, %reason, "not deploying");
                let result = DeploymentResult {
                    device_ref: group.reference,
                    device_name: Some(device.display_name().to_owned()),
                    expanded: Vec::new(),
                    outcome: Outcome::Skipped {
                        reason: reason.clone(),
                    },
                };
                let _ = self.events.send(DeployEvent::Finished(result.clone()));
                results.push(result);
                continue;
            }
            let task = DeviceTask {
                api: Arc::clone(&self.api),
                topology: topology.clone(),
                objects: ObjectResolver::new(Arc::clone(&self.api)),
                index: Arc::clone(&index),
                config: Arc::clone(&self.config),
                events: self.events.clone(),
                cancel: self.cancel.clone(),
            };
            let permits = Arc::clone(&permits);
            let reference = group.reference.clone();
            let handle = tasks.spawn(async move { task.run(group, permits).await });
            references.insert(handle.id(), reference);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let result = match joined {
                Ok((_, result)) => result,
                Err(e) => {
                    let device_ref = references.remove(&e.id()).unwrap_or_default();
                    warn!(device = %device_ref, error = %e, "device task aborted");
                    DeploymentResult {
                        device_ref,
                        device_name: None,
                        expanded: Vec::new(),
                        outcome: Outcome::Failed {
                            error: if e.is_panic() {
                                "device task panicked".to_owned()
                            } else {
                                e.to_string()
                            },
                        },
                    }
                }
            };
            let _ = self.events.send(DeployEvent::Finished(result.clone()));
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            succeeded,
            failed = results.len() - succeeded,
            elapsed = ?started.elapsed(),
            "deployment finished"
        );
        Ok(results)
    }

    fn skip_all(&self, plan: RulePlan) -> Vec<DeploymentResult> {
        plan.groups
            .into_values()
            .map(|group| {
                let result = DeploymentResult {
                    device_ref: group.reference,
                    device_name: None,
                    expanded: Vec::new(),
                    outcome: Outcome::Skipped {
                        reason: SkipReason::Cancelled,
                    },
                };
                let _ = self.events.send(DeployEvent::Finished(result.clone()));
                result
            })
            .collect()
    }
}

/// Groups whose device shares its network with another group, keyed by
/// group key, with the resolved device and the skip reason.
///
/// A push replaces the whole network rule set, so two groups on one
/// network (serial and name of one appliance, or both units of a warm
/// spare pair) would overwrite each other.
fn shared_networks(
    plan: &RulePlan,
    index: &DeviceIndex,
) -> HashMap<String, (Arc<Device>, SkipReason)> {
    let mut by_network: IndexMap<String, Vec<(&str, &str, Arc<Device>)>> = IndexMap::new();
    for (key, group) in &plan.groups {
        if let Some(device) = index.resolve(&group.reference) {
            by_network
                .entry(device.network_id.clone())
                .or_default()
                .push((key.as_str(), group.reference.as_str(), device));
        }
    }

    let mut shared = HashMap::new();
    for (network_id, members) in by_network {
        if members.len() < 2 {
            continue;
        }
        for (key, reference, device) in &members {
            let with = members
                .iter()
                .filter(|(_, other, _)| other != reference)
                .map(|(_, other, _)| (*other).to_owned())
                .collect();
            let reason = SkipReason::SharedNetwork {
                network_id: network_id.clone(),
                with,
            };
            shared.insert((*key).to_owned(), (Arc::clone(device), reason));
        }
    }
    shared
}

/// Run `fut` unless the token fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, CoreError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoreError::Cancelled),
        out = fut => Ok(out),
    }
}

// ── Device task ─────────────────────────────────────────────────────

struct DeviceTask<D> {
    api: Arc<D>,
    topology: TopologyResolver<D>,
    objects: ObjectResolver<D>,
    index: Arc<DeviceIndex>,
    config: Arc<DeployConfig>,
    events: mpsc::UnboundedSender<DeployEvent>,
    cancel: CancellationToken,
}

impl<D: Dashboard> DeviceTask<D> {
    async fn run(self, group: DeviceRules, permits: Arc<Semaphore>) -> DeploymentResult {
        let DeviceRules { reference, rows } = group;
        let mut device_name = None;
        let mut expanded = Vec::new();

        let outcome = match self
            .deploy(&reference, rows, permits, &mut device_name, &mut expanded)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(device = %reference, error = %e, "device did not deploy");
                outcome_for(e)
            }
        };

        DeploymentResult {
            device_ref: reference,
            device_name,
            expanded,
            outcome,
        }
    }

    async fn deploy(
        &self,
        reference: &str,
        mut rows: Vec<RuleRow>,
        permits: Arc<Semaphore>,
        device_name: &mut Option<String>,
        desired: &mut Vec<ExpandedRule>,
    ) -> Result<Outcome, CoreError> {
        let _permit = until_cancelled(&self.cancel, permits.acquire_owned())
            .await?
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        let device = self
            .index
            .resolve(reference)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: reference.to_owned(),
            })?;
        let name = device.display_name().to_owned();
        *device_name = Some(name.clone());

        let vlans = until_cancelled(&self.cancel, self.topology.vlan_scope(&device.network_id)).await?;
        info!(device = %name, serial = %device.serial, dual_uplink = !vlans.is_eligible(), "processing device");
        let _ = self.events.send(DeployEvent::DeviceStarted {
            device_ref: reference.to_owned(),
            device_name: name.clone(),
            dual_uplink: !vlans.is_eligible(),
        });

        let objects = until_cancelled(&self.cancel, self.objects.load(&device.org_id)).await?;

        order_rows(&mut rows);
        let mut invalid = 0;
        for row in &rows {
            match expand(row, &vlans, &objects) {
                Expansion::Rules(rules) => {
                    for rule in rules {
                        info!(
                            device = %name,
                            policy = %rule.policy,
                            protocol = %rule.protocol,
                            src = %rule.src_cidr,
                            src_port = %rule.src_port,
                            dest = %rule.destination(),
                            dest_port = %rule.dest_port,
                            comment = %rule.comment,
                            "rule expanded"
                        );
                        let _ = self.events.send(DeployEvent::RuleExpanded {
                            device: name.clone(),
                            rule: rule.clone(),
                        });
                        desired.push(rule);
                    }
                }
                Expansion::Invalid(rule) => {
                    warn!(device = %name, comment = %rule.comment, reason = %rule.reason, "invalid rule");
                    invalid += 1;
                    let _ = self.events.send(DeployEvent::RuleInvalid {
                        device: name.clone(),
                        rule,
                    });
                }
            }
        }
        if invalid > 0 {
            return Err(CoreError::ValidationFailed {
                device: name,
                count: invalid,
            });
        }

        let remote = until_cancelled(&self.cancel, self.api.l3_firewall_rules(&device.network_id))
            .await??;

        if self.config.is_live() {
            self.push(&device, &name, &remote, desired).await
        } else {
            let current = from_wire(&remote)?;
            let diff = RuleDiff::compute(&current, desired);
            debug!(device = %name, added = diff.added.len(), removed = diff.removed.len(), "diff computed");
            let _ = self.events.send(DeployEvent::DiffComputed {
                device: name,
                diff: diff.clone(),
            });
            Ok(Outcome::DryRun {
                added: diff.added,
                removed: diff.removed,
            })
        }
    }

    /// Back up, then replace. Not cancellable once the backup exists.
    async fn push(
        &self,
        device: &Device,
        name: &str,
        remote: &[mxfw_api::types::L3FirewallRule],
        desired: &[ExpandedRule],
    ) -> Result<Outcome, CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let backup = write_backup(&self.config.backup_dir, name, remote, &Local::now()).await?;
        let _ = self.events.send(DeployEvent::BackupWritten {
            device: name.to_owned(),
            path: backup.clone(),
        });

        self.api
            .replace_l3_firewall_rules(&device.network_id, &to_wire(desired))
            .await?;
        info!(device = %name, rules = desired.len(), "rules pushed");

        Ok(Outcome::Pushed {
            rules: desired.len(),
            backup,
        })
    }
}

fn outcome_for(err: CoreError) -> Outcome {
    match err {
        CoreError::Cancelled => Outcome::Skipped {
            reason: SkipReason::Cancelled,
        },
        CoreError::DeviceNotFound { .. } => Outcome::Skipped {
            reason: SkipReason::DeviceNotFound,
        },
        CoreError::ValidationFailed { count, .. } => Outcome::Skipped {
            reason: SkipReason::InvalidRules { count },
        },
        other => Outcome::Failed {
            error: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ANY, AddressType, Policy};

    fn row(device: &str, comment: &str) -> RuleRow {
        RuleRow {
            device_ref: device.into(),
            sequence: None,
            comment: comment.into(),
            policy: Policy::Allow,
            protocol: "any".into(),
            src_type: AddressType::Any,
            src_value: String::new(),
            dst_type: AddressType::Any,
            dst_value: String::new(),
            src_port: ANY.into(),
            dst_port: ANY.into(),
        }
    }

    #[test]
    fn plan_groups_case_insensitively_in_first_appearance_order() {
        let plan = RulePlan::from_rows([
            row(" SW-HQ-01 ", "a"),
            row("branch-2", "b"),
            row("sw-hq-01", "c"),
        ]);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.rule_count(), 3);
        let groups: Vec<_> = plan.groups().collect();
        assert_eq!(groups[0].reference, "SW-HQ-01");
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[1].reference, "branch-2");
    }

    #[test]
    fn errors_map_to_outcomes() {
        assert_eq!(
            outcome_for(CoreError::ValidationFailed {
                device: "x".into(),
                count: 2
            }),
            Outcome::Skipped {
                reason: SkipReason::InvalidRules { count: 2 }
            }
        );
        assert_eq!(
            outcome_for(CoreError::Cancelled),
            Outcome::Skipped {
                reason: SkipReason::Cancelled
            }
        );
        assert!(matches!(
            outcome_for(CoreError::Api {
                message: "boom".into(),
                status: Some(400)
            }),
            Outcome::Failed { .. }
        ));
    }
}
