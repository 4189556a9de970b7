// ── Appliance domain type ──

use serde::{Deserialize, Serialize};

/// A security appliance bound to a network, as indexed for deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    pub name: Option<String>,
    pub network_id: String,
    pub org_id: String,
    pub model: String,
}

impl Device {
    /// Name shown in reports and used for backup files; falls back to the serial.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.serial)
    }

    /// Security appliances are the MX model family.
    pub fn is_appliance_model(model: &str) -> bool {
        model.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("MX"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: Option<&str>) -> Device {
        Device {
            serial: "Q2AA-BBBB-CCCC".into(),
            name: name.map(Into::into),
            network_id: "N_1".into(),
            org_id: "1".into(),
            model: "MX68".into(),
        }
    }

    #[test]
    fn display_name_prefers_name() {
        assert_eq!(device(Some("SW-HQ-01")).display_name(), "SW-HQ-01");
    }

    #[test]
    fn display_name_falls_back_to_serial() {
        assert_eq!(device(None).display_name(), "Q2AA-BBBB-CCCC");
        assert_eq!(device(Some("  ")).display_name(), "Q2AA-BBBB-CCCC");
    }

    #[test]
    fn appliance_models() {
        assert!(Device::is_appliance_model("MX68"));
        assert!(Device::is_appliance_model("mx250"));
        assert!(!Device::is_appliance_model("MS120-8"));
        assert!(!Device::is_appliance_model("M"));
    }
}
