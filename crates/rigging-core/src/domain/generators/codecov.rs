//! `codecov.yml` and the coverage upload that feeds it.

use serde::Serialize;
use serde_yaml::Value as YamlValue;

use crate::domain::{
    error::DomainError,
    merge::{ArrayStrategy, DeepMerge},
    project::{GeneratedFile, Project, setup_steps},
    workflow::{Job, Permissions, RunsOn, Step, secret},
};

use super::Overrides;

pub const PATH: &str = "codecov.yml";
pub const UPLOAD_JOB_ID: &str = "upload_coverage";
pub const DEFAULT_TOKEN_SECRET: &str = "CODECOV_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodecovConfig {
    pub coverage: Coverage,
    pub parsers: Parsers,
    pub comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub precision: u8,
    pub round: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    /// Controls for the entire project.
    pub project: StatusDefault,
    /// Controls for the lines changed by a pull request.
    pub patch: StatusDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusDefault {
    pub default: StatusCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub target: String,
    /// How far coverage may drop while the check still passes.
    pub threshold: String,
    pub paths: Vec<String>,
    pub if_ci_failed: String,
    pub only_pulls: bool,
}

impl StatusCheck {
    fn auto(base: Option<&str>) -> Self {
        Self {
            base: base.map(str::to_string),
            target: "auto".into(),
            threshold: "10%".into(),
            paths: vec!["src".into()],
            if_ci_failed: "error".into(),
            only_pulls: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parsers {
    pub gcov: Gcov,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gcov {
    pub branch_detection: BranchDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchDetection {
    pub conditional: String,
    #[serde(rename = "loop")]
    pub loops: String,
    pub method: String,
    #[serde(rename = "macro")]
    pub macros: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub layout: String,
    pub behavior: String,
    pub require_changes: String,
}

impl Default for CodecovConfig {
    fn default() -> Self {
        Self {
            coverage: Coverage {
                precision: 2,
                round: "down".into(),
                status: Status {
                    project: StatusDefault {
                        default: StatusCheck::auto(None),
                    },
                    patch: StatusDefault {
                        default: StatusCheck::auto(Some("auto")),
                    },
                },
            },
            parsers: Parsers {
                gcov: Gcov {
                    branch_detection: BranchDetection {
                        conditional: "yes".into(),
                        loops: "yes".into(),
                        method: "no".into(),
                        macros: "no".into(),
                    },
                },
            },
            comment: Comment {
                layout: "reach,diff,flags,files,footer".into(),
                behavior: "default".into(),
                require_changes: "no".into(),
            },
        }
    }
}

/// Default configuration with `overrides` deep-merged on top.
pub fn build_codecov_config(overrides: Overrides) -> Result<YamlValue, DomainError> {
    let mut value =
        serde_yaml::to_value(CodecovConfig::default()).map_err(|e| DomainError::RenderFailed {
            path: PATH.into(),
            reason: e.to_string(),
        })?;
    if let Some(overrides) = overrides {
        value.deep_merge(overrides.clone(), ArrayStrategy::Replace);
    }
    Ok(value)
}

pub fn add_codecov_config(project: &mut Project, overrides: Overrides) -> Result<(), DomainError> {
    let value = build_codecov_config(overrides)?;
    project.add_file(GeneratedFile::yaml(PATH, value)?)
}

/// Release job re-running the tests and uploading `coverage/` to codecov.
pub fn build_coverage_upload_job(project: &Project, token_secret: &str) -> Job {
    Job::runs_on(RunsOn::ubuntu())
        .named("Upload coverage to Codecov")
        .needs(&["release"])
        .permissions(Permissions::read_contents())
        .env_var("CI", "true")
        .step(Step::uses("Checkout", "actions/checkout@v4"))
        .steps(setup_steps(project.options()))
        .step(Step::run("test", project.package_manager().run_task("test")))
        .step(
            Step::uses("Upload coverage to Codecov", "codecov/codecov-action@v4")
                .with_input("token", secret(token_secret))
                .with_input("directory", "coverage"),
        )
}

/// No-op when the project does not release.
pub fn add_coverage_upload(project: &mut Project, token_secret: &str) -> Result<(), DomainError> {
    let job = build_coverage_upload_job(project, token_secret);
    match project.release_mut() {
        Some(release) => release.add_job(UPLOAD_JOB_ID, job),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::ProjectOptions;

    #[test]
    fn defaults_render_expected_document() {
        let value = build_codecov_config(None).unwrap();
        assert_eq!(value["coverage"]["precision"], YamlValue::from(2));
        assert_eq!(
            value["coverage"]["status"]["patch"]["default"]["base"],
            YamlValue::from("auto")
        );
        assert!(value["coverage"]["status"]["project"]["default"].get("base").is_none());
        assert_eq!(
            value["parsers"]["gcov"]["branch_detection"]["loop"],
            YamlValue::from("yes")
        );
    }

    #[test]
    fn threshold_override_keeps_siblings() {
        let overrides: YamlValue = serde_yaml::from_str(
            "coverage:\n  status:\n    project:\n      default:\n        threshold: 2%\n",
        )
        .unwrap();
        let value = build_codecov_config(Some(&overrides)).unwrap();
        let project = &value["coverage"]["status"]["project"]["default"];
        assert_eq!(project["threshold"], YamlValue::from("2%"));
        assert_eq!(project["target"], YamlValue::from("auto"));
        assert_eq!(value["coverage"]["precision"], YamlValue::from(2));
        assert_eq!(value["coverage"]["round"], YamlValue::from("down"));
    }

    #[test]
    fn upload_job_uses_token_secret() {
        let mut project = Project::new(ProjectOptions::new("@time-loop/widget")).unwrap();
        add_coverage_upload(&mut project, DEFAULT_TOKEN_SECRET).unwrap();
        let job = project.release().unwrap().workflow().job(UPLOAD_JOB_ID).unwrap();
        let upload = job.steps.last().unwrap();
        assert_eq!(upload.action_ref(), Some("codecov/codecov-action@v4"));
    }

    #[test]
    fn upload_is_skipped_without_release() {
        let mut options = ProjectOptions::new("@time-loop/widget");
        options.release = false;
        let mut project = Project::new(options).unwrap();
        add_coverage_upload(&mut project, DEFAULT_TOKEN_SECRET).unwrap();
        assert!(project.release().is_none());
    }
}
