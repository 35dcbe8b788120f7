use std::collections::HashSet;
use std::path::PathBuf;

use crate::domain::{common::FileMode, error::DomainError};

/// Final file list ready for materialization.
///
/// This is the output of [`Project::synth`](super::Project::synth). It
/// contains no generation logic, only data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStructure {
    pub(crate) root: PathBuf,
    pub(crate) files: Vec<FileToWrite>,
}

impl ProjectStructure {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
        }
    }

    pub fn add_file(
        &mut self,
        path: impl Into<PathBuf>,
        content: String,
        mode: FileMode,
        policy: WritePolicy,
    ) {
        self.files.push(FileToWrite {
            path: path.into(),
            content,
            mode,
            policy,
        });
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: String, mode: FileMode) -> Self {
        self.add_file(path, content, mode, WritePolicy::Overwrite);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.files.is_empty() {
            return Err(DomainError::EmptyProject);
        }

        let mut seen = HashSet::new();
        for file in &self.files {
            let path_str = file.path.display().to_string();
            if !seen.insert(path_str.clone()) {
                return Err(DomainError::DuplicatePath { path: path_str });
            }

            if file.path.is_absolute() {
                return Err(DomainError::AbsolutePathNotAllowed { path: path_str });
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn files(&self) -> impl Iterator<Item = &FileToWrite> {
        self.files.iter()
    }

    pub fn file(&self, path: &str) -> Option<&FileToWrite> {
        self.files
            .iter()
            .find(|f| f.path.to_str().is_some_and(|p| p == path))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Whether an existing file on disk may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Managed files are regenerated on every run.
    Overwrite,
    /// Sample files are written once and then belong to the user.
    IfMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToWrite {
    pub path: PathBuf,
    pub content: String,
    pub mode: FileMode,
    pub policy: WritePolicy,
}

impl FileToWrite {
    pub fn is_sample(&self) -> bool {
        self.policy == WritePolicy::IfMissing
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_structure_is_invalid() {
        assert!(matches!(
            ProjectStructure::new("/tmp/x").validate(),
            Err(DomainError::EmptyProject)
        ));
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let structure = ProjectStructure::new("/tmp/x")
            .with_file(".nvmrc", "22".into(), FileMode::read_write())
            .with_file(".nvmrc", "20".into(), FileMode::read_write());
        assert!(matches!(
            structure.validate(),
            Err(DomainError::DuplicatePath { .. })
        ));
    }

    #[test]
    fn lookup_by_path() {
        let structure =
            ProjectStructure::new("/tmp/x").with_file("codecov.yml", "a".into(), FileMode::default());
        assert_eq!(structure.file("codecov.yml").map(|f| f.size()), Some(1));
        assert!(structure.file("missing").is_none());
    }
}
