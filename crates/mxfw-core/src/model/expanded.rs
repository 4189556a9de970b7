// ── Expanded rule domain types ──

use serde::{Deserialize, Serialize};
use strum::Display;

use super::rule::Policy;

/// Wildcard used for addresses and ports.
pub const ANY: &str = "any";

/// A concrete rule ready to be sent to an appliance.
///
/// Exactly one destination form is populated: a `dest_cidr`, or a
/// `dest_fqdn` paired with `dest_cidr == "any"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedRule {
    pub comment: String,
    pub policy: Policy,
    pub protocol: String,
    pub src_port: String,
    pub dest_port: String,
    pub src_cidr: String,
    pub dest_cidr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_fqdn: Option<String>,
}

impl ExpandedRule {
    /// Structural form used for set comparison.
    ///
    /// The Dashboard echoes wildcards as `Any` and may change protocol case,
    /// so both are folded; everything else compares verbatim after trimming.
    pub fn canonical(&self) -> Self {
        Self {
            comment: self.comment.trim().to_owned(),
            policy: self.policy,
            protocol: self.protocol.trim().to_ascii_lowercase(),
            src_port: fold_any(&self.src_port),
            dest_port: fold_any(&self.dest_port),
            src_cidr: fold_any(&self.src_cidr),
            dest_cidr: fold_any(&self.dest_cidr),
            dest_fqdn: self
                .dest_fqdn
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_ascii_lowercase),
        }
    }

    /// Destination shown in reports: the FQDN when set, otherwise the CIDR.
    pub fn destination(&self) -> &str {
        self.dest_fqdn.as_deref().unwrap_or(&self.dest_cidr)
    }
}

fn fold_any(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ANY) {
        ANY.to_owned()
    } else {
        value.to_owned()
    }
}

// ── Invalid rows ────────────────────────────────────────────────────

/// Which side of a rule a reference sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Source,
    Destination,
}

/// Why a row could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidReason {
    #[error("unknown object or group '{name}'")]
    UnknownObject { name: String },

    #[error("object '{name}' is {found}, expected {expected}")]
    WrongKind {
        name: String,
        expected: String,
        found: String,
    },

    #[error("group '{name}' mixes cidr and fqdn members")]
    MixedGroup { name: String },

    #[error("missing {side} value")]
    MissingValue { side: Side },
}

/// Terminal marker for a row that blocks its device's deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRule {
    pub comment: String,
    pub sequence: Option<u32>,
    pub reason: InvalidReason,
}

/// Result of expanding one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Rules(Vec<ExpandedRule>),
    Invalid(InvalidRule),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(protocol: &str, dest_cidr: &str) -> ExpandedRule {
        ExpandedRule {
            comment: "Web".into(),
            policy: Policy::Allow,
            protocol: protocol.into(),
            src_port: "Any".into(),
            dest_port: "443".into(),
            src_cidr: "10.0.0.0/24".into(),
            dest_cidr: dest_cidr.into(),
            dest_fqdn: None,
        }
    }

    #[test]
    fn canonical_folds_wildcards_and_protocol_case() {
        let remote = rule("TCP", "Any").canonical();
        let local = rule("tcp", "any").canonical();
        assert_eq!(remote, local);
        assert_eq!(remote.src_port, ANY);
    }

    #[test]
    fn canonical_keeps_distinct_addresses() {
        assert_ne!(
            rule("tcp", "10.1.0.0/24").canonical(),
            rule("tcp", "10.2.0.0/24").canonical()
        );
    }

    #[test]
    fn destination_prefers_fqdn() {
        let mut r = rule("tcp", ANY);
        r.dest_fqdn = Some("bad.example.com".into());
        assert_eq!(r.destination(), "bad.example.com");
    }

    #[test]
    fn invalid_reason_messages() {
        let reason = InvalidReason::WrongKind {
            name: "Blocked".into(),
            expected: "cidr".into(),
            found: "fqdn".into(),
        };
        assert_eq!(reason.to_string(), "object 'Blocked' is fqdn, expected cidr");
        assert_eq!(
            InvalidReason::MissingValue { side: Side::Source }.to_string(),
            "missing source value"
        );
    }
}
