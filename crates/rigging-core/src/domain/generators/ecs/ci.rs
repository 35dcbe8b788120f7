//! Continuous integration for ECS services.
//!
//! Every build produces a versioned artifact, so the bump/unbump pair moves
//! from the release task into the build itself. A post-build job then hands
//! the version to the image build/publish workflow.

use crate::domain::{
    error::DomainError,
    project::{PackageManager, Project, Task},
    workflow::{Job, PermissionLevel, Permissions, RunsOn, Step},
};

use super::{
    super::{Overrides, checkout_step, version_steps},
    build::{self, BuildPublishOptions},
};

pub const JOB_ID: &str = "ci";
pub const CLEAN_TASK: &str = "clean-dist";

/// Release builds bump to the next version; every other build bumps to a
/// prerelease keyed by the commit.
pub fn versioned(pm: PackageManager, task: &str) -> String {
    let run = pm.run_task(task);
    format!("test \"$RELEASE\" = \"true\" && {run} || PRERELEASE=$(git rev-parse HEAD) {run}")
}

/// Move version bumping into `build` and strip it from `release`.
pub fn rewire_release_tasks(project: &mut Project) -> Result<(), DomainError> {
    let pm = project.package_manager();
    project
        .add_task(Task::new(CLEAN_TASK).described("Remove the previous build output"))?
        .exec("rm -fr dist");

    let tasks = project.tasks_mut();
    tasks
        .get_mut("pre-compile")?
        .prepend_exec(versioned(pm, "bump"))
        .prepend_spawn(CLEAN_TASK);
    tasks.get_mut("package")?.exec(versioned(pm, "unbump"));
    tasks
        .get_mut("release")?
        .reset()
        .spawn("build")
        .exec("git diff --ignore-space-at-eol --exit-code");
    Ok(())
}

pub fn build_ci_job(service_name: &str, artifacts_directory: &str) -> Job {
    let publish = Step::uses(
        "Build and Publish Docker Image to ECR",
        format!("./{}", build::WORKFLOW_LOCATION),
    )
    .with_input("version", "${{ steps.event_metadata.outputs.release_tag }}")
    .with_input("service-name", service_name)
    .with_input(
        "all-package-read-token",
        "${{ secrets.ALL_PACKAGE_READ_TOKEN }}",
    )
    .with_input(
        "buildcache-aws-access-key-id",
        "${{ secrets.ECR_BUILD_CACHE_AWS_ACCESS_KEY_ID }}",
    )
    .with_input(
        "buildcache-aws-secret-access-key",
        "${{ secrets.ECR_BUILD_CACHE_AWS_SECRET_ACCESS_KEY }}",
    )
    .with_input(
        "buildcache-aws-region",
        "${{ secrets.ECR_BUILD_CACHE_AWS_REGION }}",
    )
    .with_input("lacework-account-name", "${{ secrets.LW_ACCOUNT_NAME }}")
    .with_input("lacework-access-token", "${{ secrets.LW_ACCESS_TOKEN }}")
    // TODO: expose these three as service options once the healthcheck and scan are stable.
    .with_input("skip-health-check", false)
    .with_input("is-nest-app", true)
    .with_input("skip-vulnerability-scan", true);

    Job::runs_on(RunsOn::labels(&[RunsOn::UBUNTU]))
        .named("Docker Build and Publish")
        .env_var("FORCE_COLOR", "3")
        .env_var("GIT_TAG_PREFIX", "backend")
        .permissions(
            Permissions::default()
                .contents(PermissionLevel::Read)
                .actions(PermissionLevel::Read)
                .packages(PermissionLevel::Read),
        )
        .step(checkout_step())
        .steps(version_steps(artifacts_directory))
        .step(publish)
}

/// Attach the build/publish workflow, rewire the tasks and add the `ci` job.
pub fn add_continuous_integration(
    project: &mut Project,
    service_name: &str,
    options: &BuildPublishOptions,
    overrides: Overrides,
) -> Result<(), DomainError> {
    build::add_build_publish_workflow(project, options, overrides)?;
    rewire_release_tasks(project)?;

    let artifacts_directory = project
        .release()
        .map(|release| release.artifacts_directory().to_string())
        .unwrap_or_else(|| "dist".to_string());
    let job = build_ci_job(service_name, &artifacts_directory);
    project.build_workflow_mut().add_post_build_job(JOB_ID, job)
}
