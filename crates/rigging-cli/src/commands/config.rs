//! `rigging config`: inspect configuration values.

use std::path::PathBuf;

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Keys accepted by `rigging config get`.
const KEYS: [&str; 6] = [
    "organization.scope",
    "organization.author_name",
    "organization.author_email",
    "organization.registry",
    "output.no_color",
    "output.format",
];

/// Dispatch to the correct config subcommand.
///
/// `config_file` is the `--config` flag, reported by `path` when set.
pub fn execute(
    cmd: ConfigCommands,
    config: AppConfig,
    config_file: Option<PathBuf>,
    output: OutputManager,
) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&config, &key)?;
            output.data(&value)?;
        }

        ConfigCommands::List => {
            output.header("Current Configuration:")?;
            let serialised = toml::to_string_pretty(&config).map_err(|e| CliError::ConfigError {
                message: format!("Failed to serialise config: {e}"),
                source: Some(Box::new(e)),
            })?;
            output.data(serialised.trim_end())?;
        }

        ConfigCommands::Path => {
            let path = config_file.unwrap_or_else(AppConfig::config_path);
            output.data(&path.display().to_string())?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    let org = &config.organization;
    match key {
        "organization.scope" => Ok(org.scope.clone()),
        "organization.author_name" => Ok(org.author_name.clone()),
        "organization.author_email" => Ok(org.author_email.clone()),
        "organization.registry" => Ok(org.registry.clone()),
        "output.no_color" => Ok(config.output.no_color.to_string()),
        "output.format" => Ok(config.output.format.as_str().to_owned()),
        _ => Err(CliError::ConfigError {
            message: format!("Unknown config key '{key}', expected one of: {}", KEYS.join(", ")),
            source: None,
        }),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
