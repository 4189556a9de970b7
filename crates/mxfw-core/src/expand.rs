// ── Rule expansion engine ──
//
// Turns one authored row into concrete rules. Symbolic references (VLAN
// names, policy objects and groups) fan out into one rule per resolved
// value; sources and destinations combine as a cross product, source-major.
// An unresolvable object reference invalidates the whole row.

use crate::model::{
    ANY, AddressType, ExpandedRule, Expansion, InvalidReason, InvalidRule, RuleRow, Side,
};
use crate::objects::{ObjectIndex, ObjectKind, ObjectLookup};
use crate::topology::VlanScope;

/// Sort rows by sequence number; unnumbered rows keep sheet order after numbered ones.
pub fn order_rows(rows: &mut [RuleRow]) {
    rows.sort_by_key(|row| (row.sequence.is_none(), row.sequence));
}

/// A resolved destination: a CIDR, or an FQDN paired with a wildcard CIDR.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    cidr: String,
    fqdn: Option<String>,
}

impl Target {
    fn cidr(cidr: impl Into<String>) -> Self {
        Self {
            cidr: cidr.into(),
            fqdn: None,
        }
    }

    fn fqdn(fqdn: impl Into<String>) -> Self {
        Self {
            cidr: ANY.to_owned(),
            fqdn: Some(fqdn.into()),
        }
    }
}

fn literal(value: &str, side: Side) -> Result<String, InvalidReason> {
    let value = value.trim();
    if value.is_empty() {
        Err(InvalidReason::MissingValue { side })
    } else {
        Ok(value.to_owned())
    }
}

fn lookup<'a>(
    index: &'a ObjectIndex,
    name: &str,
) -> Result<(ObjectKind, &'a [String]), InvalidReason> {
    match index.lookup(name) {
        ObjectLookup::Found(entry) => Ok((entry.kind, entry.values.as_slice())),
        ObjectLookup::MixedGroup => Err(InvalidReason::MixedGroup {
            name: name.trim().to_owned(),
        }),
        ObjectLookup::Unknown => Err(InvalidReason::UnknownObject {
            name: name.trim().to_owned(),
        }),
    }
}

fn resolve_sources(
    row: &RuleRow,
    vlans: &VlanScope,
    objects: &ObjectIndex,
) -> Result<Vec<String>, InvalidReason> {
    let value = &row.src_value;
    match &row.src_type {
        AddressType::Vlan => Ok(vec![vlans.resolve(value)]),
        AddressType::Any => Ok(vec![ANY.to_owned()]),
        AddressType::Object => match lookup(objects, value)? {
            (ObjectKind::Cidr, values) => Ok(values.to_vec()),
            (found, _) => Err(InvalidReason::WrongKind {
                name: value.trim().to_owned(),
                expected: ObjectKind::Cidr.to_string(),
                found: found.to_string(),
            }),
        },
        AddressType::Cidr | AddressType::Fqdn | AddressType::Literal(_) => {
            literal(value, Side::Source).map(|v| vec![v])
        }
    }
}

fn resolve_targets(
    row: &RuleRow,
    vlans: &VlanScope,
    objects: &ObjectIndex,
) -> Result<Vec<Target>, InvalidReason> {
    let value = &row.dst_value;
    match &row.dst_type {
        AddressType::Vlan => Ok(vec![Target::cidr(vlans.resolve(value))]),
        AddressType::Any => Ok(vec![Target::cidr(ANY)]),
        AddressType::Fqdn => literal(value, Side::Destination).map(|v| vec![Target::fqdn(v)]),
        AddressType::Object => {
            let (kind, values) = lookup(objects, value)?;
            Ok(values
                .iter()
                .map(|v| match kind {
                    ObjectKind::Cidr => Target::cidr(v.as_str()),
                    ObjectKind::Fqdn => Target::fqdn(v.as_str()),
                })
                .collect())
        }
        AddressType::Cidr | AddressType::Literal(_) => {
            literal(value, Side::Destination).map(|v| vec![Target::cidr(v)])
        }
    }
}

/// Expand one row against a network's VLAN scope and its org's object index.
pub fn expand(row: &RuleRow, vlans: &VlanScope, objects: &ObjectIndex) -> Expansion {
    let resolved = resolve_sources(row, vlans, objects)
        .and_then(|sources| Ok((sources, resolve_targets(row, vlans, objects)?)));

    let (sources, targets) = match resolved {
        Ok(pair) => pair,
        Err(reason) => {
            return Expansion::Invalid(InvalidRule {
                comment: row.comment.clone(),
                sequence: row.sequence,
                reason,
            });
        }
    };

    let rules = sources
        .iter()
        .flat_map(|src| {
            targets.iter().map(move |target| ExpandedRule {
                comment: row.comment.clone(),
                policy: row.policy,
                protocol: row.protocol.clone(),
                src_port: row.src_port.clone(),
                dest_port: row.dst_port.clone(),
                src_cidr: src.clone(),
                dest_cidr: target.cidr.clone(),
                dest_fqdn: target.fqdn.clone(),
            })
        })
        .collect();

    Expansion::Rules(rules)
}
