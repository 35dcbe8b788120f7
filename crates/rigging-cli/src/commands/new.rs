//! Implementation of the `rigging new` command.
//!
//! Responsibility: load option layers, emit the archetype, hand the project
//! to the synth service and display results. No generation logic lives here.

use std::path::PathBuf;

use serde_json::json;
use tracing::{debug, info, instrument};

use rigging_adapters::{LocalFilesystem, OptionsLoader};
use rigging_core::{
    application::{SynthReport, SynthService},
    domain::{ArchetypeKind, Project},
    error::RiggingError,
};

use crate::{
    cli::{NewArgs, OutputFormat, global::GlobalArgs},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Execute the `rigging new` command.
///
/// 1. Merge option files over the archetype defaults
/// 2. Apply the positional name and `--service-name`
/// 3. Emit the project (pure, fail-fast)
/// 4. Synthesize it under the output directory (or only list on `--dry-run`)
#[instrument(skip_all, fields(project = %args.name, archetype = %args.archetype))]
pub fn execute(
    args: NewArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let kind = ArchetypeKind::from(args.archetype);
    if args.service_name.is_some() && kind != ArchetypeKind::EcsService {
        return Err(CliError::InvalidInput {
            message: format!("--service-name only applies to ecs-service projects, not {kind}"),
            source: None,
        });
    }

    let mut options = OptionsLoader::new()
        .load_archetype(kind, &args.options)
        .with_cli_context(|| "loading option files")?;
    options.set_name(args.name.as_str());
    if let Some(service_name) = &args.service_name {
        options.set_service_name(service_name.as_str());
    }
    debug!(layers = args.options.len(), "Options merged");

    let project = options
        .emit(&config.organization)
        .map_err(RiggingError::from)?;
    let root = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(project.name()));

    info!(name = %project.name(), root = %root.display(), "Project emitted");

    let service = SynthService::new(Box::new(LocalFilesystem::new())).with_overwrite(args.force);
    let spinner = output.spinner(&format!("Writing {}...", project.name()));
    let result = service.synth(&project, &root, args.dry_run);
    spinner.finish_and_clear();
    let report = result?;

    if output.format() == OutputFormat::Json {
        let payload = report_json(project.name(), kind, &report);
        let rendered = serde_json::to_string_pretty(&payload).with_cli_context(|| "rendering report")?;
        output.data(&rendered)?;
        return Ok(());
    }

    print_report(&project, &report, global.verbose > 0 || args.dry_run, &output)
}

/// `@scope/widget` is generated into `./widget`.
fn default_output_dir(package_name: &str) -> PathBuf {
    let bare = package_name
        .rsplit_once('/')
        .map_or(package_name, |(_, bare)| bare);
    PathBuf::from(bare)
}

fn report_json(name: &str, kind: ArchetypeKind, report: &SynthReport) -> serde_json::Value {
    let paths = |paths: &[PathBuf]| -> Vec<String> {
        paths.iter().map(|p| p.display().to_string()).collect()
    };
    json!({
        "name": name,
        "archetype": kind.as_str(),
        "root": report.root.display().to_string(),
        "dryRun": report.dry_run,
        "written": paths(&report.written),
        "skipped": paths(&report.skipped),
    })
}

fn print_report(
    project: &Project,
    report: &SynthReport,
    list_files: bool,
    output: &OutputManager,
) -> CliResult<()> {
    let name = project.name();
    if report.dry_run {
        output.info(&format!(
            "Dry run: would write {} files for '{name}' to {}",
            report.written.len(),
            report.root.display()
        ))?;
    } else {
        output.success(&format!(
            "Generated '{name}' ({} files) in {}",
            report.written.len(),
            report.root.display()
        ))?;
    }

    if list_files {
        for path in &report.written {
            output.detail(&format!("  {}", path.display()))?;
        }
    }

    for path in &report.skipped {
        output.warning(&format!("Kept existing sample {}", path.display()))?;
    }

    if !report.dry_run {
        output.print("")?;
        output.print("Next steps:")?;
        output.print(&format!("  cd {}", report.root.display()))?;
        output.print(&format!(
            "  {}",
            project.package_manager().install_command(false)
        ))?;
    }
    Ok(())
}
