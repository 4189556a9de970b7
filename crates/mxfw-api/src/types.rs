// Wire types for the Dashboard API endpoints used by the deployer.
//
// Field names follow the Dashboard's camelCase JSON. Unknown fields are
// kept in `extra` where a record is written back (firewall rules) so a
// backup round-trips everything the Dashboard returned.

use serde::{Deserialize, Deserializer, Serialize};

/// The Dashboard returns ids as strings on most endpoints and as numbers
/// on a few (policy object ids inside groups, VLAN ids). Normalize to `String`.
fn id_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(i64),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

fn id_strings<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "id_string")] String);

    let raw: Option<Vec<Wrapped>> = Option::deserialize(de)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|Wrapped(s)| s)
        .collect())
}

// ── Organizations ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ── Devices ─────────────────────────────────────────────────────────

/// An inventory device, as returned by both the organization-wide and the
/// per-network device listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub serial: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub network_id: Option<String>,
}

// ── Appliance VLANs ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vlan {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subnet: Option<String>,
}

// ── Policy objects ──────────────────────────────────────────────────

/// A named network object. Exactly one of `cidr` / `fqdn` is set for the
/// object types the firewall accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyObject {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub object_type: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyObjectGroup {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "id_strings")]
    pub object_ids: Vec<String>,
}

// ── L3 firewall rules ───────────────────────────────────────────────

fn any() -> String {
    "Any".into()
}

/// One appliance L3 firewall rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3FirewallRule {
    #[serde(default)]
    pub comment: String,
    pub policy: String,
    pub protocol: String,
    #[serde(default = "any")]
    pub src_port: String,
    #[serde(default = "any")]
    pub src_cidr: String,
    #[serde(default = "any")]
    pub dest_port: String,
    #[serde(default = "any")]
    pub dest_cidr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Request/response envelope of the `l3FirewallRules` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct L3FirewallRuleSet {
    #[serde(default)]
    pub rules: Vec<L3FirewallRule>,
}

/// Error body shape: `{"errors": ["..."]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}
