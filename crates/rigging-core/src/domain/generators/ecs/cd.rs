use crate::domain::{
    error::DomainError,
    project::{Project, Release},
    workflow::{Job, PermissionLevel, Permissions, RunsOn, Step},
};

use super::{
    super::{Overrides, version_steps},
    deploy::{self, DeployOptions},
};

pub const JOB_ID: &str = "cd";

/// Release job deploying the freshly released version.
pub fn build_cd_job(service_name: &str, artifacts_directory: &str) -> Job {
    let deploy = Step::uses("Deploy", format!("./{}", deploy::WORKFLOW_LOCATION))
        .with_input("service-name", service_name)
        .with_input("version", "${{ steps.event_metadata.outputs.release_tag }}")
        .with_input(
            "harness-account-identifier",
            "${{ secrets.HARNESS_ACCOUNT_IDENTIFIER }}",
        );

    Job::runs_on(RunsOn::labels(&[RunsOn::UBUNTU]))
        .named(format!("Deploy {service_name} to ECS"))
        .needs(&[Release::JOB_ID])
        .permissions(
            Permissions::default()
                .actions(PermissionLevel::Read)
                .contents(PermissionLevel::Read)
                .packages(PermissionLevel::Read),
        )
        .steps(version_steps(artifacts_directory))
        .step(deploy)
}

/// Attach the deploy workflows and, when the project releases, the `cd` job.
pub fn add_continuous_delivery(
    project: &mut Project,
    service_name: &str,
    options: &DeployOptions,
    overrides: Overrides,
) -> Result<(), DomainError> {
    deploy::add_deploy_workflows(project, options, overrides)?;
    let Some(release) = project.release_mut() else {
        return Ok(());
    };
    let job = build_cd_job(service_name, release.artifacts_directory());
    release.add_job(JOB_ID, job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::ProjectOptions;

    #[test]
    fn deploy_step_calls_service_workflow() {
        let job = build_cd_job("payments", "dist");
        assert_eq!(job.name.as_deref(), Some("Deploy payments to ECS"));
        assert_eq!(job.steps.len(), 3);
        assert_eq!(
            job.steps[2].action_ref(),
            Some("./.github/workflows/ecs-service-deploy.yml")
        );
    }

    #[test]
    fn release_gets_cd_job() {
        let mut project = Project::new(ProjectOptions::new("@time-loop/payments")).unwrap();
        add_continuous_delivery(&mut project, "payments", &DeployOptions::default(), None).unwrap();
        let release = project.release().unwrap();
        assert!(release.workflow().job(JOB_ID).is_some());
    }

    #[test]
    fn workflows_still_attach_without_release() {
        let mut options = ProjectOptions::new("@time-loop/payments");
        options.release = false;
        let mut project = Project::new(options).unwrap();
        add_continuous_delivery(&mut project, "payments", &DeployOptions::default(), None).unwrap();
        assert!(project.try_find_file(deploy::WORKFLOW_LOCATION).is_some());
        assert!(project.release().is_none());
    }
}
