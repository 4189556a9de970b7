// ── Dashboard provider seam ──
//
// The resolvers and the orchestrator only need a handful of Dashboard
// calls. Abstracting them behind a trait lets the engine run against an
// in-memory provider in tests; `DashboardClient` is the production impl.

use std::future::Future;

use mxfw_api::DashboardClient;
use mxfw_api::types::{
    Device, L3FirewallRule, Organization, PolicyObject, PolicyObjectGroup, Vlan,
};

/// Dashboard operations used by deployment.
pub trait Dashboard: Send + Sync + 'static {
    fn organizations(&self)
    -> impl Future<Output = Result<Vec<Organization>, mxfw_api::Error>> + Send;

    fn organization_devices(
        &self,
        org_id: &str,
    ) -> impl Future<Output = Result<Vec<Device>, mxfw_api::Error>> + Send;

    fn network_devices(
        &self,
        network_id: &str,
    ) -> impl Future<Output = Result<Vec<Device>, mxfw_api::Error>> + Send;

    fn appliance_vlans(
        &self,
        network_id: &str,
    ) -> impl Future<Output = Result<Vec<Vlan>, mxfw_api::Error>> + Send;

    fn policy_objects(
        &self,
        org_id: &str,
    ) -> impl Future<Output = Result<Vec<PolicyObject>, mxfw_api::Error>> + Send;

    fn policy_object_groups(
        &self,
        org_id: &str,
    ) -> impl Future<Output = Result<Vec<PolicyObjectGroup>, mxfw_api::Error>> + Send;

    fn l3_firewall_rules(
        &self,
        network_id: &str,
    ) -> impl Future<Output = Result<Vec<L3FirewallRule>, mxfw_api::Error>> + Send;

    /// Replace the whole rule set in a single call.
    fn replace_l3_firewall_rules(
        &self,
        network_id: &str,
        rules: &[L3FirewallRule],
    ) -> impl Future<Output = Result<Vec<L3FirewallRule>, mxfw_api::Error>> + Send;
}

impl Dashboard for DashboardClient {
    async fn organizations(&self) -> Result<Vec<Organization>, mxfw_api::Error> {
        self.list_organizations().await
    }

    async fn organization_devices(&self, org_id: &str) -> Result<Vec<Device>, mxfw_api::Error> {
        self.list_organization_devices(org_id).await
    }

    async fn network_devices(&self, network_id: &str) -> Result<Vec<Device>, mxfw_api::Error> {
        self.list_network_devices(network_id).await
    }

    async fn appliance_vlans(&self, network_id: &str) -> Result<Vec<Vlan>, mxfw_api::Error> {
        self.list_appliance_vlans(network_id).await
    }

    async fn policy_objects(&self, org_id: &str) -> Result<Vec<PolicyObject>, mxfw_api::Error> {
        self.list_policy_objects(org_id).await
    }

    async fn policy_object_groups(
        &self,
        org_id: &str,
    ) -> Result<Vec<PolicyObjectGroup>, mxfw_api::Error> {
        self.list_policy_object_groups(org_id).await
    }

    async fn l3_firewall_rules(
        &self,
        network_id: &str,
    ) -> Result<Vec<L3FirewallRule>, mxfw_api::Error> {
        self.get_l3_firewall_rules(network_id).await
    }

    async fn replace_l3_firewall_rules(
        &self,
        network_id: &str,
        rules: &[L3FirewallRule],
    ) -> Result<Vec<L3FirewallRule>, mxfw_api::Error> {
        self.update_l3_firewall_rules(network_id, rules).await
    }
}
