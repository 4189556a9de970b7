//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Input, Password, Select};

use mxfw_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::commands::util::prompt_err;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn render_config(cfg: &Config, format: &OutputFormat) -> Result<String, CliError> {
    let redacted = cfg.redacted();
    match format {
        OutputFormat::Json => output::render_json(&redacted),
        OutputFormat::Yaml => output::render_yaml(&redacted),
        OutputFormat::Table | OutputFormat::Plain => {
            toml::to_string_pretty(&redacted).map_err(|e| CliError::Serialization(e.to_string()))
        }
    }
}

fn prompt_api_key() -> Result<String, CliError> {
    let key = Password::new()
        .with_prompt("Dashboard API key")
        .interact()
        .map_err(prompt_err)?;
    if key.trim().is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    Ok(key.trim().to_owned())
}

/// Ask where the API key should come from; fills in `cfg` accordingly.
fn prompt_key_source(cfg: &mut Config) -> Result<(), CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Read from an environment variable",
        "Save to config file (plaintext)",
        "Skip (pass --api-key or set MERAKI_DASHBOARD_API_KEY)",
    ];
    let selection = Select::new()
        .with_prompt("Where should the API key come from?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match selection {
        0 => {
            let key = prompt_api_key()?;
            mxfw_config::store_api_key(&key)?;
            eprintln!("   ✓ API key stored in system keyring");
        }
        1 => {
            let var: String = Input::new()
                .with_prompt("Environment variable name")
                .default("MERAKI_DASHBOARD_API_KEY".into())
                .interact_text()
                .map_err(prompt_err)?;
            cfg.api_key_env = Some(var);
        }
        2 => cfg.api_key = Some(prompt_api_key()?),
        _ => {}
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init { force } => {
            let config_path = mxfw_config::config_path();
            if config_path.exists() && !force {
                return Err(CliError::ConfigExists { path: config_path });
            }
            eprintln!("mxfw configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let defaults = Config::default();
            let base_url: String = Input::new()
                .with_prompt("Dashboard API URL")
                .default(defaults.base_url.clone())
                .interact_text()
                .map_err(prompt_err)?;

            let max_workers: usize = Input::new()
                .with_prompt("Devices deployed concurrently")
                .default(defaults.max_workers)
                .interact_text()
                .map_err(prompt_err)?;

            let backup_dir: String = Input::new()
                .with_prompt("Backup directory (empty for the working directory)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let mut cfg = Config {
                base_url,
                max_workers,
                backup_dir: (!backup_dir.trim().is_empty()).then(|| PathBuf::from(backup_dir.trim())),
                ..defaults
            };
            cfg.validate()?;
            prompt_key_source(&mut cfg)?;

            let written = mxfw_config::save_config(&cfg)?;
            eprintln!("\n✓ Configuration written to {}", written.display());
            eprintln!("\n  Try it: mxfw deploy --rules rules.csv --dry-run");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = mxfw_config::load_config()?;
            let out = render_config(&cfg, &global.output)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&mxfw_config::config_path().display().to_string(), false);
            Ok(())
        }

        // ── Set key ─────────────────────────────────────────────────
        ConfigCommand::SetKey { key } => {
            let key = match key {
                Some(k) if !k.trim().is_empty() => k.trim().to_owned(),
                Some(_) => {
                    return Err(CliError::Validation {
                        field: "api_key".into(),
                        reason: "API key cannot be empty".into(),
                    });
                }
                None => prompt_api_key()?,
            };
            mxfw_config::store_api_key(&key)?;
            if !global.quiet {
                eprintln!("✓ API key stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn shown_config_masks_the_key() {
        let cfg = Config {
            api_key: Some("secret-key".into()),
            ..Config::default()
        };
        let text = render_config(&cfg, &OutputFormat::Table).unwrap();
        assert!(!text.contains("secret-key"));
        assert!(text.contains("max_workers = 5"));

        let json = render_config(&cfg, &OutputFormat::Json).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
