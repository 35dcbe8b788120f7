//! Implementation of the `rigging list` command.

use std::path::PathBuf;

use serde_json::json;

use rigging_core::{
    domain::{ArchetypeKind, ArchetypeOptions, Organization},
    error::RiggingError,
};

use crate::{
    cli::{ListArgs, ListFormat},
    config::AppConfig,
    error::{CliResult, IntoCli},
    output::OutputManager,
};

const EXAMPLE_NAME: &str = "example";

/// One archetype with the files it emits for a bare example project.
struct Entry {
    kind: ArchetypeKind,
    files: Vec<PathBuf>,
}

pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let entries = ArchetypeKind::ALL
        .into_iter()
        .map(|kind| entry(kind, &config.organization))
        .collect::<CliResult<Vec<_>>>()?;

    match args.format {
        ListFormat::Table => {
            output.header("Available Archetypes:")?;
            for entry in &entries {
                output.print(&format!(
                    "  {:<12} {} ({} files)",
                    entry.kind.as_str(),
                    entry.kind.description(),
                    entry.files.len()
                ))?;
                if args.files {
                    for file in &entry.files {
                        output.detail(&format!("      {}", file.display()))?;
                    }
                }
            }
        }

        ListFormat::List => {
            for entry in &entries {
                output.data(entry.kind.as_str())?;
            }
        }

        ListFormat::Json => {
            let payload: Vec<_> = entries
                .iter()
                .map(|entry| {
                    json!({
                        "name": entry.kind.as_str(),
                        "description": entry.kind.description(),
                        "files": entry
                            .files
                            .iter()
                            .map(|f| f.display().to_string())
                            .collect::<Vec<_>>(),
                    })
                })
                .collect();
            let rendered =
                serde_json::to_string_pretty(&payload).with_cli_context(|| "rendering archetypes")?;
            output.data(&rendered)?;
        }
    }

    Ok(())
}

fn entry(kind: ArchetypeKind, org: &Organization) -> CliResult<Entry> {
    let mut options = ArchetypeOptions::empty(kind);
    options.set_name(EXAMPLE_NAME);
    options.set_service_name(EXAMPLE_NAME);

    let structure = options
        .emit(org)
        .and_then(|project| project.synth(EXAMPLE_NAME))
        .map_err(RiggingError::from)?;

    Ok(Entry {
        kind,
        files: structure.files().map(|f| f.path.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_archetype_lists_its_files() {
        for kind in ArchetypeKind::ALL {
            let entry = entry(kind, &Organization::default()).unwrap();
            assert!(entry.files.contains(&PathBuf::from("package.json")), "{kind}");
        }
    }

    #[test]
    fn service_files_only_for_services() {
        let dockerfile = PathBuf::from("Dockerfile");
        let ts = entry(ArchetypeKind::TypeScript, &Organization::default()).unwrap();
        let ecs = entry(ArchetypeKind::EcsService, &Organization::default()).unwrap();
        assert!(!ts.files.contains(&dockerfile));
        assert!(ecs.files.contains(&dockerfile));
    }
}
