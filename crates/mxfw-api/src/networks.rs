// Network-scoped Dashboard endpoints
//
// Device membership, appliance VLANs, and the appliance L3 firewall rule
// set all hang off `/networks/{networkId}`.

use tracing::debug;

use crate::client::DashboardClient;
use crate::error::Error;
use crate::types::{Device, L3FirewallRule, L3FirewallRuleSet, Vlan};

impl DashboardClient {
    /// List the devices bound to a network.
    ///
    /// `GET /networks/{networkId}/devices`
    pub async fn list_network_devices(&self, network_id: &str) -> Result<Vec<Device>, Error> {
        debug!(network_id, "listing network devices");
        self.get(&format!("networks/{network_id}/devices")).await
    }

    /// List the appliance VLANs of a network.
    ///
    /// `GET /networks/{networkId}/appliance/vlans`. Fails with HTTP 400 when
    /// VLANs are disabled on the network.
    pub async fn list_appliance_vlans(&self, network_id: &str) -> Result<Vec<Vlan>, Error> {
        debug!(network_id, "listing appliance VLANs");
        self.get(&format!("networks/{network_id}/appliance/vlans"))
            .await
    }

    /// Fetch the appliance's current L3 firewall rules.
    ///
    /// `GET /networks/{networkId}/appliance/firewall/l3FirewallRules`
    pub async fn get_l3_firewall_rules(
        &self,
        network_id: &str,
    ) -> Result<Vec<L3FirewallRule>, Error> {
        debug!(network_id, "fetching L3 firewall rules");
        let set: L3FirewallRuleSet = self
            .get(&format!("networks/{network_id}/appliance/firewall/l3FirewallRules"))
            .await?;
        Ok(set.rules)
    }

    /// Replace the appliance's L3 firewall rules in one call.
    ///
    /// `PUT /networks/{networkId}/appliance/firewall/l3FirewallRules` with
    /// `{"rules": [...]}`. Returns the rule set as stored by the Dashboard.
    pub async fn update_l3_firewall_rules(
        &self,
        network_id: &str,
        rules: &[L3FirewallRule],
    ) -> Result<Vec<L3FirewallRule>, Error> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            rules: &'a [L3FirewallRule],
        }

        debug!(network_id, count = rules.len(), "replacing L3 firewall rules");
        let set: L3FirewallRuleSet = self
            .put(
                &format!("networks/{network_id}/appliance/firewall/l3FirewallRules"),
                &Body { rules },
            )
            .await?;
        Ok(set.rules)
    }
}
