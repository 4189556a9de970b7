//! Output formatting: streamed deploy report, summary table, JSON, YAML, plain.
//!
//! Device tasks never print. Their events arrive here over one channel and
//! this module owns stdout.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};
use tokio::sync::mpsc;

use mxfw_core::{DeployEvent, DeploymentResult, ExpandedRule, InvalidRule, Outcome};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Applies colors only when enabled.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn ok(self, text: &str) -> String {
        if self.enabled { text.green().to_string() } else { text.to_owned() }
    }

    fn bad(self, text: &str) -> String {
        if self.enabled { text.red().to_string() } else { text.to_owned() }
    }

    fn warn(self, text: &str) -> String {
        if self.enabled { text.yellow().to_string() } else { text.to_owned() }
    }

    fn heading(self, text: &str) -> String {
        if self.enabled { text.bold().cyan().to_string() } else { text.to_owned() }
    }

    fn dim(self, text: &str) -> String {
        if self.enabled { text.dimmed().to_string() } else { text.to_owned() }
    }

    fn outcome(self, result: &DeploymentResult) -> String {
        let label = result.outcome.label();
        match result.outcome {
            Outcome::Pushed { .. } | Outcome::DryRun { .. } => self.ok(label),
            Outcome::Skipped { .. } => self.warn(label),
            Outcome::Failed { .. } => self.bad(label),
        }
    }
}

// ── Line renderers ───────────────────────────────────────────────────

fn describe_rule(rule: &ExpandedRule) -> String {
    format!(
        "{} {} {}:{} -> {}:{} [{}]",
        rule.policy,
        rule.protocol,
        rule.src_cidr,
        rule.src_port,
        rule.destination(),
        rule.dest_port,
        rule.comment,
    )
}

fn describe_invalid(rule: &InvalidRule) -> String {
    match rule.sequence {
        Some(seq) => format!("rule {seq} [{}]: {}", rule.comment, rule.reason),
        None => format!("[{}]: {}", rule.comment, rule.reason),
    }
}

/// One line per device, used by the streamed report and plain output.
pub fn outcome_line(result: &DeploymentResult, palette: Palette) -> String {
    format!(
        "{}: {} ({})",
        result.display_name(),
        palette.outcome(result),
        result.detail()
    )
}

/// Render one event for the streamed report, or `None` for events that
/// the chosen format does not show.
pub fn render_event(event: &DeployEvent, format: &OutputFormat, palette: Palette) -> Option<String> {
    match (format, event) {
        (OutputFormat::Plain, DeployEvent::Finished(result)) => Some(result.to_string()),
        (OutputFormat::Table, DeployEvent::DeviceStarted { device_ref, device_name, dual_uplink }) => {
            let mut line = palette.heading(&format!("== {device_name} ({device_ref})"));
            if *dual_uplink {
                line.push_str(&palette.warn(" multiple uplinks, VLAN references expand to any"));
            }
            Some(line)
        }
        (OutputFormat::Table, DeployEvent::RuleExpanded { device, rule }) => Some(format!(
            "  {} {device}: {}",
            palette.ok("✓"),
            describe_rule(rule)
        )),
        (OutputFormat::Table, DeployEvent::RuleInvalid { device, rule }) => Some(format!(
            "  {} {device}: {}",
            palette.bad("✗"),
            describe_invalid(rule)
        )),
        (OutputFormat::Table, DeployEvent::DiffComputed { device, diff }) => {
            if diff.is_empty() {
                return Some(format!("  {device}: {}", palette.dim("in sync")));
            }
            let lines: Vec<String> = diff
                .added
                .iter()
                .map(|r| format!("  {} {device}: {}", palette.ok("+"), describe_rule(r)))
                .chain(
                    diff.removed
                        .iter()
                        .map(|r| format!("  {} {device}: {}", palette.bad("-"), describe_rule(r))),
                )
                .collect();
            Some(lines.join("\n"))
        }
        (OutputFormat::Table, DeployEvent::BackupWritten { device, path }) => Some(format!(
            "  {device}: backup written to {}",
            path.display()
        )),
        (OutputFormat::Table, DeployEvent::Finished(result)) => Some(outcome_line(result, palette)),
        _ => None,
    }
}

/// Print every event as it arrives until the orchestrator closes the stream.
pub async fn stream_events(
    mut rx: mpsc::UnboundedReceiver<DeployEvent>,
    format: OutputFormat,
    palette: Palette,
    quiet: bool,
) {
    while let Some(event) = rx.recv().await {
        if quiet {
            continue;
        }
        if let Some(line) = render_event(&event, &format, palette) {
            print_output(&line, false);
        }
    }
}

// ── Summary ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&DeploymentResult> for SummaryRow {
    fn from(r: &DeploymentResult) -> Self {
        Self {
            device: r.display_name().to_owned(),
            status: r.outcome.label().to_owned(),
            detail: r.detail(),
        }
    }
}

/// Render the end-of-run output for `format`.
///
/// Streamed formats (table, plain) already showed per-device lines, so
/// table adds the summary table and elapsed time and plain adds nothing.
pub fn render_summary(
    format: &OutputFormat,
    results: &[DeploymentResult],
    elapsed: Duration,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<SummaryRow> = results.iter().map(SummaryRow::from).collect();
            let table = Table::new(&rows).with(Style::rounded()).to_string();
            Ok(format!("{table}\nElapsed: {:.2}s", elapsed.as_secs_f64()))
        }
        OutputFormat::Json => render_json(results),
        OutputFormat::Yaml => render_yaml(results),
        OutputFormat::Plain => Ok(String::new()),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(|e| CliError::Serialization(e.to_string()))
}

pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Serialization(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use mxfw_core::{Policy, SkipReason};

    use super::*;

    fn rule(comment: &str, dest: &str) -> ExpandedRule {
        ExpandedRule {
            comment: comment.into(),
            policy: Policy::Allow,
            protocol: "tcp".into(),
            src_port: "any".into(),
            dest_port: "443".into(),
            src_cidr: "10.10.0.0/24".into(),
            dest_cidr: dest.into(),
            dest_fqdn: None,
        }
    }

    fn results() -> Vec<DeploymentResult> {
        vec![
            DeploymentResult {
                device_ref: "SW-HQ-01".into(),
                device_name: Some("SW-HQ-01".into()),
                expanded: vec![rule("Web", "any")],
                outcome: Outcome::Pushed {
                    rules: 2,
                    backup: PathBuf::from("b.json"),
                },
            },
            DeploymentResult {
                device_ref: "NOPE".into(),
                device_name: None,
                expanded: vec![],
                outcome: Outcome::Skipped {
                    reason: SkipReason::DeviceNotFound,
                },
            },
        ]
    }

    #[test]
    fn rule_lines_show_destination_and_comment() {
        let event = DeployEvent::RuleExpanded {
            device: "SW-HQ-01".into(),
            rule: rule("Web", "any"),
        };
        let line = render_event(&event, &OutputFormat::Table, Palette::new(false)).unwrap();
        assert_eq!(line, "  ✓ SW-HQ-01: allow tcp 10.10.0.0/24:any -> any:443 [Web]");
    }

    #[test]
    fn plain_shows_only_outcomes() {
        let palette = Palette::new(false);
        let expanded = DeployEvent::RuleExpanded {
            device: "X".into(),
            rule: rule("Web", "any"),
        };
        assert!(render_event(&expanded, &OutputFormat::Plain, palette).is_none());

        let finished = DeployEvent::Finished(results().remove(1));
        assert_eq!(
            render_event(&finished, &OutputFormat::Plain, palette).unwrap(),
            "NOPE: skipped (device not found)"
        );
    }

    #[test]
    fn json_summary_is_a_result_array() {
        let text = render_summary(&OutputFormat::Json, &results(), Duration::from_secs(1)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["status"], "pushed");
        assert_eq!(value[0]["expanded"][0]["comment"], "Web");
        assert_eq!(value[1]["device_ref"], "NOPE");
        assert!(value[1].get("expanded").is_none());
    }

    #[test]
    fn table_summary_has_elapsed_line() {
        let text = render_summary(&OutputFormat::Table, &results(), Duration::from_millis(1500)).unwrap();
        assert!(text.contains("SW-HQ-01"));
        assert!(text.contains("device not found"));
        assert!(text.ends_with("Elapsed: 1.50s"));
    }
}
