//! `rigging cron`: the renovate schedule a project would get.

use serde_json::json;

use rigging_core::{
    domain::{generators::renovate, normalize_name},
    error::RiggingError,
};

use crate::{
    cli::{CronArgs, OutputFormat},
    config::AppConfig,
    error::{CliResult, IntoCli},
    output::OutputManager,
};

pub fn execute(args: CronArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let name = normalize_name(&args.name, &config.organization.scope).map_err(RiggingError::from)?;
    let schedule = renovate::cron_schedule(&name);

    if output.format() == OutputFormat::Json {
        let payload = json!({
            "name": name,
            "minute": renovate::cron_minute(&name),
            "schedule": schedule,
        });
        let rendered = serde_json::to_string_pretty(&payload).with_cli_context(|| "rendering schedule")?;
        output.data(&rendered)?;
    } else {
        output.detail(&format!("# {name}"))?;
        output.data(&schedule)?;
    }
    Ok(())
}
