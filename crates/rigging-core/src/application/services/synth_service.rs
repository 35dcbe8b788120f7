//! Synth Service - writes a synthesized project.
//!
//! 1. Render the project into a `ProjectStructure` (pure)
//! 2. Write every entry through the `Filesystem` port
//! 3. On failure, remove what this run created
//!
//! Sample files belong to the user once written, so they are skipped
//! when already on disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{ApplicationError, ports::Filesystem},
    domain::{Project, ProjectStructure},
    error::RiggingResult,
};

/// Outcome of a synth run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthReport {
    pub root: PathBuf,
    /// Files written (or that would be written on a dry run), relative.
    pub written: Vec<PathBuf>,
    /// Samples left alone because they already exist.
    pub skipped: Vec<PathBuf>,
    pub dry_run: bool,
}

impl SynthReport {
    fn new(root: &Path, dry_run: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            dry_run,
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len()
    }
}

/// Materializes projects onto a filesystem.
pub struct SynthService {
    filesystem: Box<dyn Filesystem>,
    overwrite: bool,
}

impl SynthService {
    pub fn new(filesystem: Box<dyn Filesystem>) -> Self {
        Self {
            filesystem,
            overwrite: false,
        }
    }

    /// Allow writing into an existing directory. Managed files are
    /// regenerated; samples are still never replaced.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// The files a synth run would consider, without touching the disk.
    pub fn plan(&self, project: &Project, root: impl AsRef<Path>) -> RiggingResult<ProjectStructure> {
        Ok(project.synth(root.as_ref())?)
    }

    /// Synthesize `project` under `root`.
    #[instrument(
        skip_all,
        fields(
            project = %project.name(),
            root = %root.as_ref().display(),
            dry_run = dry_run
        )
    )]
    pub fn synth(
        &self,
        project: &Project,
        root: impl AsRef<Path>,
        dry_run: bool,
    ) -> RiggingResult<SynthReport> {
        let root = root.as_ref();
        let structure = self.plan(project, root)?;
        info!(files = structure.file_count(), "Project synthesized");

        // A dry run may preview a regeneration of an existing root.
        let root_existed = self.filesystem.exists(root);
        if root_existed && !self.overwrite && !dry_run {
            return Err(ApplicationError::OutputExists {
                path: root.to_path_buf(),
            }
            .into());
        }

        let mut report = SynthReport::new(root, dry_run);
        if dry_run {
            for file in structure.files() {
                if file.is_sample() && self.filesystem.exists(&root.join(&file.path)) {
                    report.skipped.push(file.path.clone());
                } else {
                    report.written.push(file.path.clone());
                }
            }
            return Ok(report);
        }

        match self.write_all(&structure, &mut report) {
            Ok(()) => {
                info!(
                    written = report.written.len(),
                    skipped = report.skipped.len(),
                    "Wrote project"
                );
                Ok(report)
            }
            Err(e) => {
                if root_existed {
                    warn!("Write failed inside an existing directory; leaving it in place");
                } else {
                    warn!("Write failed, attempting rollback");
                    self.rollback(root);
                }
                Err(e)
            }
        }
    }

    fn write_all(&self, structure: &ProjectStructure, report: &mut SynthReport) -> RiggingResult<()> {
        let root = structure.root();
        self.filesystem.create_dir_all(root)?;

        for file in structure.files() {
            let path = root.join(&file.path);
            if file.is_sample() && self.filesystem.exists(&path) {
                debug!(path = %file.path.display(), "Sample exists, skipping");
                report.skipped.push(file.path.clone());
                continue;
            }

            if let Some(parent) = path.parent() {
                self.filesystem.create_dir_all(parent)?;
            }
            self.filesystem.write_file(&path, &file.content)?;
            if file.mode.executable_flag() {
                self.filesystem.set_permissions(&path, true)?;
            }
            report.written.push(file.path.clone());
        }
        Ok(())
    }

    /// Best-effort rollback on failure.
    fn rollback(&self, root: &Path) {
        if let Err(e) = self.filesystem.remove_dir_all(root) {
            warn!(
                error = %e,
                path = %root.display(),
                "Rollback failed"
            );
        } else {
            info!("Rollback successful");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::ports::MockFilesystem,
        domain::{GeneratedFile, ProjectOptions},
        error::RiggingError,
    };
    use mockall::predicate::*;

    fn project() -> Project {
        let mut project = Project::new(ProjectOptions::new("@time-loop/widget")).unwrap();
        project
            .add_file(GeneratedFile::sample("src/index.ts", "export {};\n").unwrap())
            .unwrap();
        project
            .add_file(
                GeneratedFile::sample("scripts/run.sh", "#!/bin/sh\n")
                    .unwrap()
                    .executable(),
            )
            .unwrap();
        project
    }

    fn fs_error(path: &Path) -> RiggingError {
        ApplicationError::FilesystemError {
            path: path.to_path_buf(),
            reason: "disk full".into(),
        }
        .into()
    }

    #[test]
    fn existing_root_is_rejected_without_overwrite() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists()
            .with(eq(Path::new("/out")))
            .return_const(true);
        fs.expect_write_file().never();

        let err = SynthService::new(Box::new(fs))
            .synth(&project(), "/out", false)
            .unwrap_err();
        assert!(matches!(
            err,
            RiggingError::Application(ApplicationError::OutputExists { .. })
        ));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().return_const(false);
        fs.expect_create_dir_all().never();
        fs.expect_write_file().never();

        let report = SynthService::new(Box::new(fs))
            .synth(&project(), "/out", true)
            .unwrap();
        assert!(report.dry_run);
        assert!(report.written.contains(&PathBuf::from("package.json")));
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn dry_run_previews_an_existing_root() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists()
            .returning(|path| path == Path::new("/out") || path == Path::new("/out/src/index.ts"));
        fs.expect_create_dir_all().never();
        fs.expect_write_file().never();

        let report = SynthService::new(Box::new(fs))
            .synth(&project(), "/out", true)
            .unwrap();
        assert_eq!(report.skipped, [PathBuf::from("src/index.ts")]);
        assert!(report.written.contains(&PathBuf::from("scripts/run.sh")));
    }

    #[test]
    fn writes_every_file_and_marks_scripts_executable() {
        let expected = project().synth("/out").unwrap().file_count();

        let mut fs = MockFilesystem::new();
        fs.expect_exists().return_const(false);
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write_file().times(expected).returning(|_, _| Ok(()));
        fs.expect_set_permissions()
            .with(eq(Path::new("/out/scripts/run.sh")), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let report = SynthService::new(Box::new(fs))
            .synth(&project(), "/out", false)
            .unwrap();
        assert_eq!(report.written.len(), expected);
    }

    #[test]
    fn existing_samples_are_kept() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists()
            .returning(|path| path == Path::new("/out") || path == Path::new("/out/src/index.ts"));
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write_file()
            .withf(|path, _| path != Path::new("/out/src/index.ts"))
            .returning(|_, _| Ok(()));
        fs.expect_set_permissions().returning(|_, _| Ok(()));

        let report = SynthService::new(Box::new(fs))
            .with_overwrite(true)
            .synth(&project(), "/out", false)
            .unwrap();
        assert_eq!(report.skipped, [PathBuf::from("src/index.ts")]);
    }

    #[test]
    fn failure_rolls_back_a_new_root() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().return_const(false);
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write_file().returning(|path, _| Err(fs_error(path)));
        fs.expect_remove_dir_all()
            .with(eq(Path::new("/out")))
            .times(1)
            .returning(|_| Ok(()));

        let result = SynthService::new(Box::new(fs)).synth(&project(), "/out", false);
        assert!(result.is_err());
    }

    #[test]
    fn failure_leaves_an_existing_root_alone() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().return_const(true);
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write_file().returning(|path, _| Err(fs_error(path)));
        fs.expect_remove_dir_all().never();

        let result = SynthService::new(Box::new(fs))
            .with_overwrite(true)
            .synth(&project(), "/out", false);
        assert!(result.is_err());
    }
}
