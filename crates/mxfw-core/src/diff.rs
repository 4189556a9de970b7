// ── Dry-run diffing ──

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::ExpandedRule;

/// Order-insensitive difference between a desired and a current rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleDiff {
    /// Desired rules absent from the device.
    pub added: Vec<ExpandedRule>,
    /// Device rules absent from the desired set.
    pub removed: Vec<ExpandedRule>,
}

impl RuleDiff {
    /// Compare canonical forms; duplicates collapse and order is ignored.
    pub fn compute(current: &[ExpandedRule], desired: &[ExpandedRule]) -> Self {
        let current: BTreeSet<ExpandedRule> = current.iter().map(ExpandedRule::canonical).collect();
        let desired: BTreeSet<ExpandedRule> = desired.iter().map(ExpandedRule::canonical).collect();

        Self {
            added: desired.difference(&current).cloned().collect(),
            removed: current.difference(&desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{ANY, Policy};

    fn rule(comment: &str, dest: &str) -> ExpandedRule {
        ExpandedRule {
            comment: comment.into(),
            policy: Policy::Allow,
            protocol: "tcp".into(),
            src_port: ANY.into(),
            dest_port: "443".into(),
            src_cidr: ANY.into(),
            dest_cidr: dest.into(),
            dest_fqdn: None,
        }
    }

    #[test]
    fn identical_sets_in_different_order_are_equal() {
        let a = vec![rule("a", "10.0.0.0/24"), rule("b", "10.1.0.0/24")];
        let b = vec![rule("b", "10.1.0.0/24"), rule("a", "10.0.0.0/24")];
        assert!(RuleDiff::compute(&a, &b).is_empty());
    }

    #[test]
    fn wildcard_case_does_not_count_as_change() {
        let mut remote = rule("a", "Any");
        remote.src_port = "Any".into();
        assert!(RuleDiff::compute(&[remote], &[rule("a", "any")]).is_empty());
    }

    #[test]
    fn reports_additions_and_removals() {
        let current = vec![rule("old", "10.0.0.0/24"), rule("keep", "10.1.0.0/24")];
        let desired = vec![rule("keep", "10.1.0.0/24"), rule("new", "10.2.0.0/24")];
        let diff = RuleDiff::compute(&current, &desired);
        assert_eq!(diff.added, vec![rule("new", "10.2.0.0/24")]);
        assert_eq!(diff.removed, vec![rule("old", "10.0.0.0/24")]);
    }
}
