//! Containerized service deployed to ECS.

use serde::Deserialize;

use crate::domain::{
    error::DomainError,
    generators::{
        ecs::{
            self, BuildArchitecture,
            build::{self, BuildPublishOptions},
            cd, ci,
            deploy::{self, DeployOptions},
        },
        fill_template,
    },
    merge::{Merge, merge_by_replacement, replace_list},
    project::{GeneratedFile, Project},
};

use super::{
    options::TypeScriptProjectOptions,
    organization::Organization,
    typescript::{self, Flavor},
};

merge_by_replacement!(DeployOptions);

const DOCKERFILE_SAMPLE: &str = include_str!("../../../assets/ecs/Dockerfile");
const DOCKER_BUILD_SAMPLE: &str = include_str!("../../../assets/ecs/docker-build.sh");
const DOCKER_HEALTHCHECK_SAMPLE: &str = include_str!("../../../assets/ecs/docker-healthcheck.sh");

pub const DOCKERFILE_PATH: &str = "Dockerfile";
pub const DOCKER_BUILD_PATH: &str = "scripts/docker-build.sh";
pub const DOCKER_HEALTHCHECK_PATH: &str = "scripts/docker-healthcheck.sh";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcsServiceOptions {
    #[serde(flatten)]
    pub project: TypeScriptProjectOptions,
    pub service_name: Option<String>,
    /// Defaults to `{service_name}/health`.
    pub service_healthcheck_path: Option<String>,
    /// Replaces the default list rather than extending it.
    pub build_architectures: Option<Vec<BuildArchitecture>>,
    pub deploy_workflow_options: Option<DeployOptions>,
}

impl EcsServiceOptions {
    pub fn defaults(org: &Organization) -> Self {
        let project = TypeScriptProjectOptions {
            workflow_node_version: Some(ecs::DEFAULT_NODE_VERSION.into()),
            ..Default::default()
        };
        Self {
            project: TypeScriptProjectOptions::organization_defaults(org).merge(project),
            build_architectures: Some(vec![BuildArchitecture::Arm64]),
            deploy_workflow_options: Some(DeployOptions::default()),
            ..Default::default()
        }
    }
}

impl Merge for EcsServiceOptions {
    fn merge(self, overlay: Self) -> Self {
        Self {
            project: self.project.merge(overlay.project),
            service_name: self.service_name.merge(overlay.service_name),
            service_healthcheck_path: self
                .service_healthcheck_path
                .merge(overlay.service_healthcheck_path),
            build_architectures: replace_list(self.build_architectures, overlay.build_architectures),
            deploy_workflow_options: self
                .deploy_workflow_options
                .merge(overlay.deploy_workflow_options),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EcsServiceProject {
    project: Project,
    service_name: String,
}

impl EcsServiceProject {
    pub fn new(org: &Organization, options: EcsServiceOptions) -> Result<Self, DomainError> {
        let options = EcsServiceOptions::defaults(org).merge(options);
        let service_name = options
            .service_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(DomainError::MissingRequiredField {
                field: "serviceName",
            })?
            .to_string();

        let mut project = typescript::build(org, &options.project, Flavor::Application)?;

        let healthcheck_path = options
            .service_healthcheck_path
            .clone()
            .unwrap_or_else(|| format!("{service_name}/health"));
        add_samples(&mut project, &service_name, &healthcheck_path)?;

        let build_options = BuildPublishOptions {
            build_architectures: options.build_architectures.clone(),
            node_version: Some(project.options().workflow_node_version.clone()),
        };
        ci::add_continuous_integration(
            &mut project,
            &service_name,
            &build_options,
            options.project.override_for(build::WORKFLOW_LOCATION),
        )?;
        cd::add_continuous_delivery(
            &mut project,
            &service_name,
            &options.deploy_workflow_options.clone().unwrap_or_default(),
            options.project.override_for(deploy::WORKFLOW_LOCATION),
        )?;

        Ok(Self {
            project,
            service_name,
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }
}

fn add_samples(
    project: &mut Project,
    service_name: &str,
    healthcheck_path: &str,
) -> Result<(), DomainError> {
    project.add_file(GeneratedFile::sample(DOCKERFILE_PATH, DOCKERFILE_SAMPLE)?)?;
    project.add_file(
        GeneratedFile::sample(
            DOCKER_BUILD_PATH,
            fill_template(DOCKER_BUILD_SAMPLE, &[("SERVICE_NAME", service_name)]),
        )?
        .executable(),
    )?;
    project.add_file(
        GeneratedFile::sample(
            DOCKER_HEALTHCHECK_PATH,
            fill_template(
                DOCKER_HEALTHCHECK_SAMPLE,
                &[("SERVICE_HEALTHCHECK_PATH", healthcheck_path)],
            ),
        )?
        .executable(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{FileContent, TaskStep};

    fn service(json: &str) -> Result<EcsServiceProject, DomainError> {
        let options: EcsServiceOptions = serde_json::from_str(json).unwrap();
        EcsServiceProject::new(&Organization::default(), options)
    }

    fn text(project: &Project, path: &str) -> String {
        match project.try_find_file(path).map(|f| f.content()) {
            Some(FileContent::Text(text)) => text.clone(),
            other => panic!("{path}: unexpected {other:?}"),
        }
    }

    #[test]
    fn service_name_is_required() {
        let err = service(r#"{ "name": "payments" }"#).unwrap_err();
        assert_eq!(
            err,
            DomainError::MissingRequiredField {
                field: "serviceName"
            }
        );
    }

    #[test]
    fn scripts_are_filled_and_executable() {
        let project = service(r#"{ "name": "payments", "serviceName": "payments" }"#)
            .unwrap()
            .into_project();
        assert!(text(&project, DOCKER_BUILD_PATH).contains("SERVICE_NAME=\"payments\""));
        assert!(text(&project, DOCKER_HEALTHCHECK_PATH).contains("/payments/health\""));
        for path in [DOCKER_BUILD_PATH, DOCKER_HEALTHCHECK_PATH] {
            assert!(project.try_find_file(path).unwrap().mode().executable_flag());
        }
        assert!(!text(&project, DOCKERFILE_PATH).is_empty());
    }

    #[test]
    fn custom_healthcheck_path() {
        let project = service(
            r#"{ "name": "payments", "serviceName": "payments", "serviceHealthcheckPath": "v2/ping" }"#,
        )
        .unwrap()
        .into_project();
        assert!(text(&project, DOCKER_HEALTHCHECK_PATH).contains("/v2/ping\""));
    }

    #[test]
    fn defaults_build_arm64_on_node_16_and_deploy_qa() {
        let project = service(r#"{ "name": "payments", "serviceName": "payments" }"#)
            .unwrap()
            .into_project();
        assert_eq!(project.options().workflow_node_version, "16");
        assert!(project.try_find_file(build::WORKFLOW_LOCATION).is_some());
        assert!(project.try_find_file(deploy::WORKFLOW_LOCATION).is_some());
        assert!(project.try_find_file(deploy::HARNESS_WORKFLOW_LOCATION).is_some());
        assert!(project.build_workflow().workflow().job(ci::JOB_ID).is_some());
        assert!(project.release().unwrap().workflow().job(cd::JOB_ID).is_some());
    }

    #[test]
    fn architectures_replace_defaults() {
        let options: EcsServiceOptions =
            serde_json::from_str(r#"{ "buildArchitectures": ["amd64"] }"#).unwrap();
        let merged = EcsServiceOptions::defaults(&Organization::default()).merge(options);
        assert_eq!(merged.build_architectures, Some(vec![BuildArchitecture::Amd64]));
    }

    #[test]
    fn empty_architectures_fail() {
        let err = service(
            r#"{ "name": "payments", "serviceName": "payments", "buildArchitectures": [] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::NoBuildArchitectures { .. }));
    }

    #[test]
    fn build_bumps_the_version() {
        let project = service(r#"{ "name": "payments", "serviceName": "payments" }"#)
            .unwrap()
            .into_project();
        let pre_compile = project.tasks().get("pre-compile").unwrap();
        assert_eq!(pre_compile.steps()[0], TaskStep::Spawn(ci::CLEAN_TASK.into()));
    }
}
