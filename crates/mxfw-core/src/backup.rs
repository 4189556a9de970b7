// ── Pre-update backups ──
//
// The full remote rule set is written to a timestamped JSON file before
// any live update. Files are created exclusively and never overwritten.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use mxfw_api::types::L3FirewallRule;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::CoreError;

pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// `<name>_fw_backup_<timestamp>.json`, with path separators in the name replaced.
pub fn backup_file_name(device_name: &str, at: &DateTime<Local>) -> String {
    let safe: String = device_name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}_fw_backup_{}.json", at.format(BACKUP_TIMESTAMP_FORMAT))
}

/// Write `rules` to a new backup file under `dir`, returning its path.
///
/// Fails if the file already exists.
pub async fn write_backup(
    dir: &Path,
    device_name: &str,
    rules: &[L3FirewallRule],
    at: &DateTime<Local>,
) -> Result<PathBuf, CoreError> {
    let path = dir.join(backup_file_name(device_name, at));
    let fail = |message: String| CoreError::Backup {
        path: path.clone(),
        message,
    };

    let body = serde_json::to_vec_pretty(rules).map_err(|e| fail(e.to_string()))?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| fail(e.to_string()))?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| fail(e.to_string()))?;
    file.write_all(&body).await.map_err(|e| fail(e.to_string()))?;
    file.flush().await.map_err(|e| fail(e.to_string()))?;

    info!(path = %path.display(), rules = rules.len(), "backup written");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn file_name_format() {
        assert_eq!(
            backup_file_name("SW-HQ-01", &at()),
            "SW-HQ-01_fw_backup_2024-03-09_14-05-07.json"
        );
    }

    #[test]
    fn path_separators_are_replaced() {
        assert_eq!(
            backup_file_name("Branch/East\\1", &at()),
            "Branch_East_1_fw_backup_2024-03-09_14-05-07.json"
        );
    }

    #[tokio::test]
    async fn writes_pretty_json_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let rules: Vec<L3FirewallRule> = serde_json::from_value(json!([{
            "comment": "Default rule",
            "policy": "allow",
            "protocol": "Any",
            "srcPort": "Any",
            "srcCidr": "Any",
            "destPort": "Any",
            "destCidr": "Any"
        }]))
        .unwrap();

        let nested = dir.path().join("backups");
        let path = write_backup(&nested, "SW-HQ-01", &rules, &at()).await.unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["comment"], "Default rule");

        let again = write_backup(&nested, "SW-HQ-01", &rules, &at()).await;
        assert!(matches!(again, Err(CoreError::Backup { .. })));
    }
}
