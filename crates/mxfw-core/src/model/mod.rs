// ── Domain model ──
//
// Canonical representations of sheet rows, appliances, expanded rules,
// and per-device deployment outcomes. Resolvers, the expansion engine,
// and the orchestrator all speak these types; wire types stay in mxfw-api.

pub mod device;
pub mod expanded;
pub mod result;
pub mod rule;

// ── Re-exports ──────────────────────────────────────────────────────

pub use device::Device;
pub use expanded::{ANY, ExpandedRule, Expansion, InvalidReason, InvalidRule, Side};
pub use result::{DeploymentResult, Outcome, SkipReason};
pub use rule::{AddressType, Policy, RuleRow};
