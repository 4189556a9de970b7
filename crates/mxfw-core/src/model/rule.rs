// ── Sheet row domain types ──

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rule action.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Policy {
    Allow,
    Deny,
}

/// How a row's source or destination cell is interpreted.
///
/// Parsing is case-insensitive; any tag outside the known set becomes
/// [`Literal`](Self::Literal) carrying the original tag, and its value is
/// used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AddressType {
    /// VLAN name, resolved to the VLAN's subnet.
    Vlan,
    /// Literal CIDR.
    Cidr,
    /// Policy object or group name.
    Object,
    /// Literal domain name.
    Fqdn,
    /// Wildcard.
    Any,
    #[strum(default)]
    Literal(String),
}

impl AddressType {
    /// Parse a sheet cell, ignoring surrounding whitespace.
    pub fn parse_tag(raw: &str) -> Self {
        let tag = raw.trim();
        Self::from_str(tag).unwrap_or_else(|_| Self::Literal(tag.to_owned()))
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Vlan => "vlan",
            Self::Cidr => "cidr",
            Self::Object => "object",
            Self::Fqdn => "fqdn",
            Self::Any => "any",
            Self::Literal(tag) => tag,
        }
    }
}

/// One authored rule, as loaded from the sheet. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRow {
    pub device_ref: String,
    pub sequence: Option<u32>,
    pub comment: String,
    pub policy: Policy,
    pub protocol: String,
    pub src_type: AddressType,
    pub src_value: String,
    pub dst_type: AddressType,
    pub dst_value: String,
    pub src_port: String,
    pub dst_port: String,
}
