//! Rule expansion and concurrent deployment engine for Meraki MX firewalls.
//!
//! This crate sits between `mxfw-api` and the CLI and owns the business
//! logic of a deployment run:
//!
//! - **[`TopologyResolver`]**: Maps sheet device references onto
//!   appliances ([`DeviceIndex`]) and resolves VLAN names to subnets. VLAN
//!   attribution is only trusted on single-appliance networks.
//!
//! - **[`ObjectResolver`]**: Builds a per-organization [`ObjectIndex`] of
//!   policy objects and groups, tagged cidr or fqdn. Mixed-kind groups are
//!   excluded.
//!
//! - **[`expand()`]**: The expansion engine: one [`RuleRow`] in, zero or
//!   more [`ExpandedRule`]s (cross product of resolved sources and
//!   destinations) or a single [`InvalidRule`] out.
//!
//! - **[`Orchestrator`]**: Runs one task per device under a bounded
//!   worker pool: resolve, expand, validate atomically, then diff
//!   (dry-run) or back up and replace (live). Progress is streamed as
//!   [`DeployEvent`]s to a single consumer.
//!
//! The Dashboard is reached through the [`Dashboard`] trait, implemented
//! for [`mxfw_api::DashboardClient`].

pub mod backup;
pub mod config;
pub mod convert;
pub mod diff;
pub mod error;
pub mod expand;
pub mod model;
pub mod objects;
pub mod orchestrator;
pub mod provider;
pub mod topology;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_MAX_WORKERS, DeployConfig, DeployMode};
pub use diff::RuleDiff;
pub use error::CoreError;
pub use expand::{expand, order_rows};
pub use objects::{ObjectIndex, ObjectKind, ObjectResolver};
pub use orchestrator::{DeployEvent, DeviceRules, Orchestrator, RulePlan};
pub use provider::Dashboard;
pub use topology::{DeviceIndex, TopologyResolver, VlanScope};

pub use model::{
    ANY, AddressType, DeploymentResult, Device, ExpandedRule, Expansion, InvalidReason,
    InvalidRule, Outcome, Policy, RuleRow, Side, SkipReason,
};
