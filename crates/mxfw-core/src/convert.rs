// ── Domain ↔ wire conversions ──
//
// Expanded rules become `L3FirewallRule` payloads for the update call;
// remote rules are read back into `ExpandedRule` for diffing. The
// appliance appends an implicit trailing "Default rule" that is never
// part of the managed set.

use mxfw_api::types::L3FirewallRule;

use crate::error::CoreError;
use crate::model::{ANY, ExpandedRule, Policy};

/// Comment the Dashboard gives the implicit final rule.
const DEFAULT_RULE_COMMENT: &str = "Default rule";

impl From<&ExpandedRule> for L3FirewallRule {
    fn from(rule: &ExpandedRule) -> Self {
        Self {
            comment: rule.comment.clone(),
            policy: rule.policy.to_string(),
            protocol: rule.protocol.clone(),
            src_port: rule.src_port.clone(),
            src_cidr: rule.src_cidr.clone(),
            dest_port: rule.dest_port.clone(),
            dest_cidr: rule.dest_cidr.clone(),
            dest_fqdn: rule.dest_fqdn.clone(),
            syslog_enabled: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl TryFrom<&L3FirewallRule> for ExpandedRule {
    type Error = CoreError;

    fn try_from(rule: &L3FirewallRule) -> Result<Self, Self::Error> {
        let policy: Policy = rule.policy.trim().parse().map_err(|_| CoreError::UnrecognizedRule {
            message: format!("policy '{}' on rule '{}'", rule.policy, rule.comment),
        })?;
        Ok(Self {
            comment: rule.comment.clone(),
            policy,
            protocol: rule.protocol.clone(),
            src_port: rule.src_port.clone(),
            dest_port: rule.dest_port.clone(),
            src_cidr: rule.src_cidr.clone(),
            dest_cidr: rule.dest_cidr.clone(),
            dest_fqdn: rule.dest_fqdn.clone(),
        })
    }
}

/// Whether a remote rule is the appliance's implicit allow-all default.
pub fn is_default_rule(rule: &L3FirewallRule) -> bool {
    rule.comment.trim().eq_ignore_ascii_case(DEFAULT_RULE_COMMENT)
        && [&rule.src_cidr, &rule.dest_cidr, &rule.src_port, &rule.dest_port]
            .iter()
            .all(|v| v.trim().eq_ignore_ascii_case(ANY))
}

/// The remote rules this deployer manages: everything but a trailing default rule.
pub fn managed_rules(remote: &[L3FirewallRule]) -> &[L3FirewallRule] {
    match remote.split_last() {
        Some((last, rest)) if is_default_rule(last) => rest,
        _ => remote,
    }
}

/// Wire payload for a full replacement.
pub fn to_wire(rules: &[ExpandedRule]) -> Vec<L3FirewallRule> {
    rules.iter().map(L3FirewallRule::from).collect()
}

/// Read managed remote rules back into the domain form.
pub fn from_wire(remote: &[L3FirewallRule]) -> Result<Vec<ExpandedRule>, CoreError> {
    managed_rules(remote)
        .iter()
        .map(ExpandedRule::try_from)
        .collect()
}
