use serde::Serialize;
use serde_yaml::Value as YamlValue;

use crate::domain::{
    error::DomainError,
    merge::{ArrayStrategy, DeepMerge},
    project::{GeneratedFile, Project},
};

use super::Overrides;

pub const PATH: &str = ".github/settings.yml";
pub const REPOSITORY_TOPICS: &str = "projen-managed";

/// Repository settings picked up by the settings app.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitHubSettings {
    pub repository: RepositorySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositorySettings {
    /// Comma separated topic list.
    pub topics: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            repository: RepositorySettings {
                topics: REPOSITORY_TOPICS.into(),
            },
        }
    }
}

pub fn build_github_settings(overrides: Overrides) -> Result<YamlValue, DomainError> {
    let mut value =
        serde_yaml::to_value(GitHubSettings::default()).map_err(|e| DomainError::RenderFailed {
            path: PATH.into(),
            reason: e.to_string(),
        })?;
    if let Some(overrides) = overrides {
        value.deep_merge(overrides.clone(), ArrayStrategy::Replace);
    }
    Ok(value)
}

pub fn add_github_settings(project: &mut Project, overrides: Overrides) -> Result<(), DomainError> {
    let value = build_github_settings(overrides)?;
    project.add_file(GeneratedFile::yaml(PATH, value)?)
}
