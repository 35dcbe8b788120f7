//! Synthesizing archetypes through the real adapters.

use std::fs;
use std::path::Path;

use rigging_adapters::{LocalFilesystem, MemoryFilesystem, OptionsLoader};
use rigging_core::{
    application::{ApplicationError, SynthService},
    domain::{ArchetypeKind, ArchetypeOptions, Organization, Project},
    error::RiggingError,
};
use tempfile::TempDir;

fn emit(kind: ArchetypeKind, name: &str) -> Project {
    let mut options = ArchetypeOptions::empty(kind);
    options.set_name(name);
    options.set_service_name(name);
    options.emit(&Organization::default()).unwrap()
}

#[test]
fn memory_synth_matches_the_plan() {
    let fs = MemoryFilesystem::new();
    let project = emit(ArchetypeKind::Cdk, "infra");
    let service = SynthService::new(Box::new(fs.clone()));

    let plan = service.plan(&project, "/work/infra").unwrap();
    let report = service.synth(&project, "/work/infra", false).unwrap();

    assert_eq!(report.written.len(), plan.file_count());
    for file in plan.files() {
        let path = Path::new("/work/infra").join(&file.path);
        assert_eq!(fs.read_file(&path).as_deref(), Some(file.content.as_str()));
        assert_eq!(fs.is_executable(&path), file.mode.executable_flag());
    }
}

#[test]
fn memory_synth_refuses_an_existing_root() {
    let fs = MemoryFilesystem::new();
    let project = emit(ArchetypeKind::TypeScript, "widget");
    SynthService::new(Box::new(fs.clone()))
        .synth(&project, "/work/widget", false)
        .unwrap();

    let err = SynthService::new(Box::new(fs))
        .synth(&project, "/work/widget", false)
        .unwrap_err();
    assert!(matches!(
        err,
        RiggingError::Application(ApplicationError::OutputExists { .. })
    ));
}

#[test]
fn dry_run_leaves_memory_empty() {
    let fs = MemoryFilesystem::new();
    let project = emit(ArchetypeKind::EcsService, "payments");
    let report = SynthService::new(Box::new(fs.clone()))
        .synth(&project, "/work/payments", true)
        .unwrap();

    assert!(report.dry_run);
    assert!(!report.written.is_empty());
    assert!(fs.list_files().is_empty());
}

#[test]
fn local_synth_from_option_files() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("service.yaml"),
        "name: payments\nserviceName: payments\nbuildArchitectures: [amd64]\n",
    )
    .unwrap();

    let options = OptionsLoader::new()
        .with_base_dir(temp.path())
        .load_archetype(ArchetypeKind::EcsService, ["service.yaml"])
        .unwrap();
    let project = options.emit(&Organization::default()).unwrap();

    let root = temp.path().join("out");
    let report = SynthService::new(Box::new(LocalFilesystem::new()))
        .synth(&project, &root, false)
        .unwrap();

    assert!(report.skipped.is_empty());
    assert!(root.join("Dockerfile").is_file());
    let manifest = fs::read_to_string(root.join("package.json")).unwrap();
    assert!(manifest.contains("@time-loop/payments"));
}

#[test]
fn regenerating_keeps_user_edited_samples() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("widget");
    let project = emit(ArchetypeKind::TypeScript, "widget");

    SynthService::new(Box::new(LocalFilesystem::new()))
        .synth(&project, &root, false)
        .unwrap();
    fs::write(root.join("src/index.ts"), "// mine\n").unwrap();

    let report = SynthService::new(Box::new(LocalFilesystem::new()))
        .with_overwrite(true)
        .synth(&project, &root, false)
        .unwrap();

    assert!(report.skipped.iter().any(|p| p == Path::new("src/index.ts")));
    assert_eq!(fs::read_to_string(root.join("src/index.ts")).unwrap(), "// mine\n");
}
