// ── Policy object resolution ──
//
// Per-organization index of named address references. Flat objects are
// tagged cidr or fqdn by the value they carry; groups inherit the kind of
// their members and are excluded outright when the members disagree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use mxfw_api::types::{PolicyObject, PolicyObjectGroup};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::provider::Dashboard;

/// Kind of value a named reference carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ObjectKind {
    Cidr,
    Fqdn,
}

/// Resolved values of an object (one value) or group (one per member).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub kind: ObjectKind,
    pub values: Vec<String>,
}

/// Outcome of looking up a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLookup<'a> {
    Found(&'a ObjectEntry),
    /// The name is a group excluded for mixing kinds.
    MixedGroup,
    Unknown,
}

/// Name → values and kind, scoped to one organization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectIndex {
    entries: HashMap<String, ObjectEntry>,
    mixed_groups: HashSet<String>,
}

fn object_entry(object: &PolicyObject) -> Option<(ObjectKind, String)> {
    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    if let Some(cidr) = non_empty(&object.cidr) {
        Some((ObjectKind::Cidr, cidr))
    } else {
        non_empty(&object.fqdn).map(|fqdn| (ObjectKind::Fqdn, fqdn))
    }
}

impl ObjectIndex {
    /// Build the index from flat objects and groups.
    ///
    /// Group names shadow flat objects of the same name. Member ids that do
    /// not match a known object are ignored; groups left with no members
    /// are omitted.
    pub fn build(objects: &[PolicyObject], groups: &[PolicyObjectGroup]) -> Self {
        let mut entries = HashMap::new();
        let mut by_id: HashMap<&str, (ObjectKind, String)> = HashMap::new();

        for object in objects {
            let Some((kind, value)) = object_entry(object) else {
                debug!(object = %object.name, "policy object has no cidr or fqdn, ignoring");
                continue;
            };
            by_id.insert(object.id.as_str(), (kind, value.clone()));
            entries.insert(
                object.name.trim().to_owned(),
                ObjectEntry {
                    kind,
                    values: vec![value],
                },
            );
        }

        let mut mixed_groups = HashSet::new();
        for group in groups {
            let name = group.name.trim().to_owned();
            let members: Vec<&(ObjectKind, String)> = group
                .object_ids
                .iter()
                .filter_map(|id| by_id.get(id.as_str()))
                .collect();

            let Some(&(kind, _)) = members.first().copied() else {
                debug!(group = %name, "policy object group has no resolvable members");
                continue;
            };

            if members.iter().any(|(k, _)| *k != kind) {
                warn!(group = %name, "policy object group mixes cidr and fqdn members, excluding");
                entries.remove(&name);
                mixed_groups.insert(name);
                continue;
            }

            let values = members.into_iter().map(|(_, v)| v.clone()).collect();
            entries.insert(name, ObjectEntry { kind, values });
        }

        Self {
            entries,
            mixed_groups,
        }
    }

    pub fn lookup(&self, name: &str) -> ObjectLookup<'_> {
        let name = name.trim();
        if let Some(entry) = self.entries.get(name) {
            ObjectLookup::Found(entry)
        } else if self.mixed_groups.contains(name) {
            ObjectLookup::MixedGroup
        } else {
            ObjectLookup::Unknown
        }
    }

    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name.trim()).map(|e| e.values.as_slice())
    }

    pub fn kind(&self, name: &str) -> Option<ObjectKind> {
        self.entries.get(name.trim()).map(|e| e.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Resolver ────────────────────────────────────────────────────────

/// Loads object indices from the Dashboard.
#[derive(Debug)]
pub struct ObjectResolver<D> {
    api: Arc<D>,
}

impl<D> Clone for ObjectResolver<D> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<D: Dashboard> ObjectResolver<D> {
    pub fn new(api: Arc<D>) -> Self {
        Self { api }
    }

    /// Index an organization's objects and groups.
    ///
    /// Any API failure yields an empty index; references then surface as
    /// unknown during expansion.
    pub async fn load(&self, org_id: &str) -> ObjectIndex {
        let (objects, groups) = tokio::join!(
            self.api.policy_objects(org_id),
            self.api.policy_object_groups(org_id)
        );
        match (objects, groups) {
            (Ok(objects), Ok(groups)) => {
                let index = ObjectIndex::build(&objects, &groups);
                debug!(org_id, names = index.len(), "policy object index built");
                index
            }
            (Err(e), _) | (_, Err(e)) => {
                let e = CoreError::from(e);
                warn!(org_id, error = %e, "policy object lookup failed, object references will be unknown");
                ObjectIndex::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(id: &str, name: &str, value: &str) -> PolicyObject {
        PolicyObject {
            id: id.into(),
            name: name.into(),
            object_type: Some("cidr".into()),
            cidr: Some(value.into()),
            fqdn: None,
        }
    }

    fn fqdn(id: &str, name: &str, value: &str) -> PolicyObject {
        PolicyObject {
            id: id.into(),
            name: name.into(),
            object_type: Some("fqdn".into()),
            cidr: None,
            fqdn: Some(value.into()),
        }
    }

    fn group(id: &str, name: &str, members: &[&str]) -> PolicyObjectGroup {
        PolicyObjectGroup {
            id: id.into(),
            name: name.into(),
            object_ids: members.iter().map(|m| (*m).to_owned()).collect(),
        }
    }

    fn sample() -> ObjectIndex {
        ObjectIndex::build(
            &[
                cidr("1", "Servers", "10.0.5.0/24"),
                cidr("2", "Printers", "10.0.6.0/24"),
                fqdn("3", "bad-a", "a.bad.example"),
                fqdn("4", "bad-b", "b.bad.example"),
            ],
            &[
                group("10", "BadActors", &["3", "4"]),
                group("11", "Mixed", &["1", "3"]),
                group("12", "Empty", &["99"]),
            ],
        )
    }

    #[test]
    fn flat_objects_are_tagged_by_value() {
        let index = sample();
        assert_eq!(index.kind("Servers"), Some(ObjectKind::Cidr));
        assert_eq!(index.values("Servers"), Some(&["10.0.5.0/24".to_owned()][..]));
        assert_eq!(index.kind("bad-a"), Some(ObjectKind::Fqdn));
    }

    #[test]
    fn homogeneous_group_carries_member_values() {
        let index = sample();
        assert_eq!(index.kind("BadActors"), Some(ObjectKind::Fqdn));
        assert_eq!(
            index.values("BadActors"),
            Some(&["a.bad.example".to_owned(), "b.bad.example".to_owned()][..])
        );
    }

    #[test]
    fn mixed_group_is_excluded_from_both_indices() {
        let index = sample();
        assert_eq!(index.values("Mixed"), None);
        assert_eq!(index.kind("Mixed"), None);
        assert_eq!(index.lookup("Mixed"), ObjectLookup::MixedGroup);
    }

    #[test]
    fn empty_group_and_unknown_names() {
        let index = sample();
        assert_eq!(index.lookup("Empty"), ObjectLookup::Unknown);
        assert_eq!(index.lookup("Nope"), ObjectLookup::Unknown);
    }

    #[test]
    fn group_shadows_object_of_same_name() {
        let index = ObjectIndex::build(
            &[cidr("1", "Dup", "10.0.0.0/8"), cidr("2", "b", "192.168.0.0/16")],
            &[group("10", "Dup", &["2"])],
        );
        assert_eq!(index.values("Dup"), Some(&["192.168.0.0/16".to_owned()][..]));
    }

    #[test]
    fn mixed_group_shadows_object_of_same_name() {
        let index = ObjectIndex::build(
            &[cidr("1", "Dup", "10.0.0.0/8"), fqdn("2", "f", "x.example")],
            &[group("10", "Dup", &["1", "2"])],
        );
        assert_eq!(index.lookup("Dup"), ObjectLookup::MixedGroup);
    }
}
