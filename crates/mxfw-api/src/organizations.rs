// Organization-scoped Dashboard endpoints
//
// Inventory and policy objects are listed per organization. Device
// inventory is paginated; policy objects come back in a single page.

use tracing::debug;

use crate::client::DashboardClient;
use crate::error::Error;
use crate::types::{Device, Organization, PolicyObject, PolicyObjectGroup};

/// Page size for inventory listings (Dashboard maximum).
const DEVICES_PER_PAGE: u32 = 1000;

impl DashboardClient {
    /// List all organizations visible to the API key.
    ///
    /// `GET /organizations`
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, Error> {
        debug!("listing organizations");
        self.get("organizations").await
    }

    /// List every device in an organization's inventory.
    ///
    /// `GET /organizations/{orgId}/devices` (paginated)
    pub async fn list_organization_devices(&self, org_id: &str) -> Result<Vec<Device>, Error> {
        debug!(org_id, "listing organization devices");
        self.get_paginated(&format!("organizations/{org_id}/devices"), DEVICES_PER_PAGE)
            .await
    }

    /// List the organization's policy objects.
    ///
    /// `GET /organizations/{orgId}/policyObjects`
    pub async fn list_policy_objects(&self, org_id: &str) -> Result<Vec<PolicyObject>, Error> {
        debug!(org_id, "listing policy objects");
        self.get(&format!("organizations/{org_id}/policyObjects"))
            .await
    }

    /// List the organization's policy object groups.
    ///
    /// `GET /organizations/{orgId}/policyObjects/groups`
    pub async fn list_policy_object_groups(
        &self,
        org_id: &str,
    ) -> Result<Vec<PolicyObjectGroup>, Error> {
        debug!(org_id, "listing policy object groups");
        self.get(&format!("organizations/{org_id}/policyObjects/groups"))
            .await
    }
}
