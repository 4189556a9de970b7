//! `mxfw deploy`: load the sheet, resolve credentials, run the orchestrator.

use std::sync::Arc;
use std::time::Instant;

use secrecy::SecretString;
use tracing::{debug, warn};

use mxfw_api::DashboardClient;
use mxfw_config::Config;
use mxfw_core::{DeployMode, Orchestrator, RulePlan};

use crate::cli::{DeployArgs, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, Palette};
use crate::sheet;

/// Fold command-line overrides into the loaded config.
fn apply_overrides(cfg: &mut Config, args: &DeployArgs, global: &GlobalOpts) {
    if let Some(ref url) = global.base_url {
        cfg.base_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    if let Some(workers) = args.max_workers {
        cfg.max_workers = usize::from(workers);
    }
    if let Some(ref dir) = args.backup_dir {
        cfg.backup_dir = Some(dir.clone());
    }
    if !args.orgs.is_empty() {
        cfg.org_ids.clone_from(&args.orgs);
    }
}

/// Flag / `MERAKI_DASHBOARD_API_KEY` first, then the config chain.
fn api_key(cfg: &Config, global: &GlobalOpts) -> Result<SecretString, CliError> {
    match global.api_key {
        Some(ref key) if !key.trim().is_empty() => Ok(SecretString::from(key.trim().to_owned())),
        _ => Ok(mxfw_config::resolve_api_key(cfg)?),
    }
}

fn load_plan(args: &DeployArgs) -> Result<RulePlan, CliError> {
    let rows = sheet::load_rules(&args.rules).map_err(|e| CliError::RuleSheet {
        path: args.rules.clone(),
        reason: e.to_string(),
    })?;
    if rows.is_empty() {
        return Err(CliError::EmptyRuleSheet {
            path: args.rules.clone(),
        });
    }
    Ok(RulePlan::from_rows(rows))
}

pub async fn handle(args: DeployArgs, global: &GlobalOpts, palette: Palette) -> Result<(), CliError> {
    let mut cfg = mxfw_config::load_config()?;
    apply_overrides(&mut cfg, &args, global);
    cfg.validate()?;

    let api_key = api_key(&cfg, global)?;
    let plan = load_plan(&args)?;
    debug!(devices = plan.len(), rules = plan.rule_count(), "rule sheet loaded");

    let mode = if args.dry_run { DeployMode::DryRun } else { DeployMode::Live };
    let deploy = cfg.deploy_config(mode)?;

    if deploy.is_live() {
        let prompt = format!(
            "Replace the L3 firewall rules on {} device(s) with {} sheet row(s)?",
            plan.len(),
            plan.rule_count()
        );
        if !util::confirm(&prompt, global.yes)? {
            return Err(CliError::Aborted);
        }
    }

    let client = DashboardClient::from_api_key(&cfg.base_url, &api_key, &cfg.transport())?;
    let (orchestrator, events) = Orchestrator::new(Arc::new(client), deploy);

    let cancel = orchestrator.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping devices that have not started updating");
            cancel.cancel();
        }
    });
    let reporter = tokio::spawn(output::stream_events(
        events,
        global.output.clone(),
        palette,
        global.quiet,
    ));

    let started = Instant::now();
    let outcome = orchestrator.run(plan).await;
    let elapsed = started.elapsed();
    interrupt.abort();
    if let Err(e) = reporter.await {
        warn!(error = %e, "report writer stopped early");
    }
    let results = outcome?;

    let rendered = output::render_summary(&global.output, &results, elapsed)?;
    output::print_output(&rendered, global.quiet);

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        return Err(CliError::DeploymentIncomplete {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    #[test]
    fn flags_repair_invalid_file_values_before_validation() {
        let cli = Cli::try_parse_from([
            "mxfw",
            "--base-url",
            "https://dashboard.example/api/v1",
            "deploy",
            "--rules",
            "rules.csv",
            "-w",
            "3",
            "--org",
            "42",
        ])
        .unwrap();
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };

        let mut cfg = Config {
            max_workers: 0,
            base_url: "not a url".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        apply_overrides(&mut cfg, &args, &cli.global);
        cfg.validate().unwrap();
        assert_eq!(cfg.max_workers, 3);
        assert_eq!(cfg.org_ids, vec!["42"]);
    }
}
