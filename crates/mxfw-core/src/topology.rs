// ── Topology resolution ──
//
// Maps sheet device references onto appliances and their networks, and
// resolves VLAN names to subnets. VLAN attribution is only trusted on
// networks with exactly one appliance; anything else (or any API failure)
// degrades to an empty map, which the expansion engine treats as "any".

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::DeployConfig;
use crate::error::CoreError;
use crate::model::{ANY, Device};
use crate::provider::Dashboard;

/// Normalized form of a device reference: trimmed, case-folded.
pub fn normalize_ref(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// ── Device index ────────────────────────────────────────────────────

/// Lookup from serial or name to appliance, built once per run.
#[derive(Debug, Clone, Default)]
pub struct DeviceIndex {
    by_ref: HashMap<String, Arc<Device>>,
    count: usize,
}

impl DeviceIndex {
    /// Index every network-bound appliance by serial and by name.
    ///
    /// Serials win over names when the two collide.
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut by_ref = HashMap::new();
        let mut names = Vec::new();
        let mut count = 0;

        for device in devices {
            let device = Arc::new(device);
            count += 1;
            if let Some(name) = device.name.as_deref().filter(|n| !n.trim().is_empty()) {
                names.push((normalize_ref(name), Arc::clone(&device)));
            }
            by_ref.insert(normalize_ref(&device.serial), device);
        }

        for (key, device) in names {
            match by_ref.get(&key) {
                Some(existing) if existing.serial != device.serial => {
                    warn!(
                        name = %key,
                        kept = %existing.serial,
                        ignored = %device.serial,
                        "device reference is ambiguous"
                    );
                }
                Some(_) => {}
                None => {
                    by_ref.insert(key, device);
                }
            }
        }

        Self { by_ref, count }
    }

    pub fn resolve(&self, reference: &str) -> Option<Arc<Device>> {
        self.by_ref.get(&normalize_ref(reference)).cloned()
    }

    /// Number of distinct appliances indexed.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// ── VLAN scope ──────────────────────────────────────────────────────

/// VLAN subnets usable for one network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanScope {
    eligible: bool,
    subnets: HashMap<String, String>,
}

impl VlanScope {
    /// Scope for a single-uplink network with the given VLAN map.
    pub fn eligible(subnets: HashMap<String, String>) -> Self {
        Self {
            eligible: true,
            subnets,
        }
    }

    /// Scope for a network whose VLANs cannot be attributed.
    pub fn ineligible() -> Self {
        Self::default()
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// Subnet for a VLAN name, or the wildcard when unknown or ineligible.
    pub fn resolve(&self, name: &str) -> String {
        if !self.eligible {
            return ANY.to_owned();
        }
        self.subnets
            .get(name.trim())
            .cloned()
            .unwrap_or_else(|| ANY.to_owned())
    }
}

// ── Resolver ────────────────────────────────────────────────────────

/// Topology queries against the Dashboard.
#[derive(Debug)]
pub struct TopologyResolver<D> {
    api: Arc<D>,
}

impl<D> Clone for TopologyResolver<D> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<D: Dashboard> TopologyResolver<D> {
    pub fn new(api: Arc<D>) -> Self {
        Self { api }
    }

    /// Inventory every in-scope organization and index its appliances.
    ///
    /// Failing to list organizations is fatal; a failing organization
    /// inventory is skipped with a warning.
    pub async fn load_index(&self, config: &DeployConfig) -> Result<DeviceIndex, CoreError> {
        let orgs = self.api.organizations().await?;
        let orgs: Vec<_> = orgs
            .into_iter()
            .filter(|org| config.includes_org(&org.id))
            .collect();
        info!(org_count = orgs.len(), "inventorying organizations");

        let futs = orgs.into_iter().map(|org| {
            let api = Arc::clone(&self.api);
            async move {
                match api.organization_devices(&org.id).await {
                    Ok(devices) => devices
                        .into_iter()
                        .filter(|d| Device::is_appliance_model(&d.model))
                        .filter_map(|d| {
                            let network_id = d.network_id?;
                            Some(Device {
                                serial: d.serial,
                                name: d.name,
                                network_id,
                                org_id: org.id.clone(),
                                model: d.model,
                            })
                        })
                        .collect(),
                    Err(e) => {
                        let e = CoreError::from(e);
                        warn!(org_id = %org.id, org = %org.name, error = %e, "inventory failed, skipping organization");
                        Vec::new()
                    }
                }
            }
        });

        let devices: Vec<Device> = futures_util::future::join_all(futs)
            .await
            .into_iter()
            .flatten()
            .collect();

        let index = DeviceIndex::from_devices(devices);
        info!(appliances = index.len(), "device index built");
        Ok(index)
    }

    /// Whether more than one appliance serves the network.
    ///
    /// Degrades to `false` on API failure.
    pub async fn has_multiple_uplinks(&self, network_id: &str) -> bool {
        match self.api.network_devices(network_id).await {
            Ok(devices) => {
                let appliances = devices
                    .iter()
                    .filter(|d| Device::is_appliance_model(&d.model))
                    .count();
                debug!(network_id, appliances, "uplink cardinality");
                appliances > 1
            }
            Err(e) => {
                let e = CoreError::from(e);
                warn!(network_id, error = %e, "uplink check failed, assuming single uplink");
                false
            }
        }
    }

    /// VLAN name → subnet for a network. Empty on failure.
    pub async fn vlan_map(&self, network_id: &str) -> HashMap<String, String> {
        match self.api.appliance_vlans(network_id).await {
            Ok(vlans) => vlans
                .into_iter()
                .filter_map(|v| Some((v.name.trim().to_owned(), v.subnet?)))
                .collect(),
            Err(e) => {
                let e = CoreError::from(e);
                warn!(network_id, error = %e, "VLAN lookup failed, VLAN references resolve to any");
                HashMap::new()
            }
        }
    }

    /// Uplink check first; the VLAN map is only fetched for single-uplink networks.
    pub async fn vlan_scope(&self, network_id: &str) -> VlanScope {
        if self.has_multiple_uplinks(network_id).await {
            warn!(network_id, "multiple appliances on network, VLAN references resolve to any");
            return VlanScope::ineligible();
        }
        VlanScope::eligible(self.vlan_map(network_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(serial: &str, name: Option<&str>) -> Device {
        Device {
            serial: serial.into(),
            name: name.map(Into::into),
            network_id: format!("N_{serial}"),
            org_id: "1".into(),
            model: "MX68".into(),
        }
    }

    #[test]
    fn resolves_by_serial_and_name_case_insensitively() {
        let index = DeviceIndex::from_devices([
            device("Q2AA-0001", Some("SW-HQ-01")),
            device("Q2AA-0002", None),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.resolve("  sw-hq-01 ").map(|d| d.serial.clone()),
            Some("Q2AA-0001".into())
        );
        assert_eq!(
            index.resolve("q2aa-0002").map(|d| d.serial.clone()),
            Some("Q2AA-0002".into())
        );
        assert!(index.resolve("missing").is_none());
    }

    #[test]
    fn serial_wins_over_colliding_name() {
        let index = DeviceIndex::from_devices([
            device("Q2AA-0001", Some("Q2AA-0002")),
            device("Q2AA-0002", Some("Branch")),
        ]);
        assert_eq!(
            index.resolve("Q2AA-0002").map(|d| d.serial.clone()),
            Some("Q2AA-0002".into())
        );
    }

    #[test]
    fn vlan_scope_defaults_to_any() {
        let scope = VlanScope::eligible(HashMap::from([(
            "Corp".to_owned(),
            "10.10.0.0/24".to_owned(),
        )]));
        assert_eq!(scope.resolve("Corp"), "10.10.0.0/24");
        assert_eq!(scope.resolve("Guest"), ANY);
        assert_eq!(VlanScope::ineligible().resolve("Corp"), ANY);
    }
}
