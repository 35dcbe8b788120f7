//! The build and release workflows every project carries.
//!
//! Generators attach to these through the methods here instead of
//! editing YAML, so job ids stay unique and ordering stays stable.

use crate::domain::{
    error::DomainError,
    merge::Merge,
    parameters::PNPM_VERSION,
    workflow::{EventFilter, Job, PermissionLevel, Permissions, RunsOn, Step, Triggers, Workflow},
};

use super::{PackageManager, ProjectOptions};

/// Checkout, bootstrap, toolchain setup and dependency install.
pub(crate) fn setup_steps(options: &ProjectOptions) -> Vec<Step> {
    let mut steps = options.bootstrap_steps.clone();
    if options.package_manager == PackageManager::Pnpm {
        steps.push(Step::uses("Setup pnpm", "pnpm/action-setup@v4").with_input("version", PNPM_VERSION));
    }
    steps.push(
        Step::uses("Setup Node.js", "actions/setup-node@v4")
            .with_input("node-version", options.workflow_node_version.as_str()),
    );
    steps.push(Step::run(
        "Install dependencies",
        options.package_manager.install_command(true),
    ));
    steps
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildWorkflow {
    workflow: Workflow,
}

impl BuildWorkflow {
    pub const PATH: &'static str = ".github/workflows/build.yml";
    pub const JOB_ID: &'static str = "build";

    pub fn new(options: &ProjectOptions) -> Result<Self, DomainError> {
        let checkout = Step::uses("Checkout", "actions/checkout@v4")
            .with_input("ref", "${{ github.event.pull_request.head.ref }}")
            .with_input(
                "repository",
                "${{ github.event.pull_request.head.repo.full_name }}",
            );

        let job = Job::runs_on(RunsOn::ubuntu())
            .permissions(Permissions::default().contents(PermissionLevel::Write))
            .env_var("CI", "true")
            .step(checkout)
            .steps(setup_steps(options))
            .step(Step::run("build", options.package_manager.run_task("build")));

        let workflow = Workflow::new(
            "build",
            Triggers::new().pull_request(EventFilter::any()).manual(),
        )
        .with_job(Self::JOB_ID, job)?;

        Ok(Self { workflow })
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Add a job that runs after `build` succeeds.
    pub fn add_post_build_job(&mut self, id: &str, mut job: Job) -> Result<(), DomainError> {
        let mut needs = vec![Self::JOB_ID.to_string()];
        for dep in job.needs.take().unwrap_or_default() {
            if !needs.contains(&dep) {
                needs.push(dep);
            }
        }
        job.needs = Some(needs);
        self.workflow.add_job(id, job)
    }

    /// Insert a step before every other step of the `build` job.
    pub fn prepend_build_step(&mut self, step: Step) -> Result<(), DomainError> {
        self.build_job()?.steps.insert(0, step);
        Ok(())
    }

    /// Merge `permissions` into the `build` job's existing permissions.
    pub fn set_build_permissions(&mut self, permissions: Permissions) -> Result<(), DomainError> {
        let job = self.build_job()?;
        let current = job.permissions.take().unwrap_or_default();
        job.permissions = Some(current.merge(permissions));
        Ok(())
    }

    fn build_job(&mut self) -> Result<&mut Job, DomainError> {
        let name = self.workflow.name.clone();
        self.workflow
            .job_mut(Self::JOB_ID)
            .ok_or(DomainError::UnknownJob {
                workflow: name,
                job: Self::JOB_ID.into(),
            })
    }
}

/// The release workflow. Only exists when releases are enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    workflow: Workflow,
    artifacts_directory: String,
}

impl Release {
    pub const PATH: &'static str = ".github/workflows/release.yml";
    pub const JOB_ID: &'static str = "release";
    pub const ARTIFACT_NAME: &'static str = "build-artifact";

    /// Condition shared by jobs that publish a fresh release.
    pub const IS_LATEST_COMMIT: &'static str = "needs.release.outputs.latest_commit == github.sha";

    pub fn new(options: &ProjectOptions) -> Result<Self, DomainError> {
        let artifacts_directory = "dist".to_string();
        let on_latest = "${{ steps.git_remote.outputs.latest_commit == github.sha }}";

        let release = Job::runs_on(RunsOn::ubuntu())
            .permissions(Permissions::default().contents(PermissionLevel::Write))
            .output("latest_commit", "${{ steps.git_remote.outputs.latest_commit }}")
            .output("tag_exists", "${{ steps.check_tag_exists.outputs.exists }}")
            .env_var("CI", "true")
            .step(Step::uses("Checkout", "actions/checkout@v4").with_input("fetch-depth", 0u32))
            .step(Step::run(
                "Set git identity",
                "git config user.name \"github-actions\"\ngit config user.email \"github-actions@github.com\"",
            ))
            .steps(setup_steps(options))
            .step(Step::run("release", options.package_manager.run_task("release")))
            .step(
                Step::run(
                    "Check if version has already been tagged",
                    format!(
                        "TAG=$(cat {artifacts_directory}/releasetag.txt)\n\
                         ([ ! -z \"$TAG\" ] && git ls-remote -q --exit-code --tags origin $TAG && (echo \"exists=true\" >> $GITHUB_OUTPUT)) || (echo \"exists=false\" >> $GITHUB_OUTPUT)\n\
                         cat $GITHUB_OUTPUT"
                    ),
                )
                .with_id("check_tag_exists"),
            )
            .step(
                Step::run(
                    "Check for new commits",
                    "echo \"latest_commit=$(git ls-remote origin -h ${{ github.ref }} | cut -f1)\" >> $GITHUB_OUTPUT",
                )
                .with_id("git_remote"),
            )
            .step(
                Step::uses("Upload artifact", "actions/upload-artifact@v4")
                    .when(on_latest)
                    .with_input("name", Self::ARTIFACT_NAME)
                    .with_input("path", artifacts_directory.as_str()),
            );

        let publish_if = format!(
            "needs.release.outputs.tag_exists != 'true' && {}",
            Self::IS_LATEST_COMMIT
        );

        let github = Job::runs_on(RunsOn::ubuntu())
            .named("Publish to GitHub Releases")
            .needs(&[Self::JOB_ID])
            .permissions(Permissions::default().contents(PermissionLevel::Write))
            .when(publish_if.as_str())
            .step(Self::download_step(&artifacts_directory))
            .step(
                Step::run(
                    "Release",
                    format!(
                        "errout=$(mktemp); gh release create $(cat {dir}/releasetag.txt) -R $GITHUB_REPOSITORY -F {dir}/changelog.md -t $(cat {dir}/releasetag.txt) --target $GITHUB_REF 2> $errout && true; exitcode=$?; if [ $exitcode -ne 0 ] && ! grep -q \"Release.tag_name already exists\" $errout; then cat $errout; exit $exitcode; fi",
                        dir = artifacts_directory
                    ),
                )
                .with_env("GITHUB_TOKEN", "${{ secrets.GITHUB_TOKEN }}")
                .with_env("GITHUB_REPOSITORY", "${{ github.repository }}")
                .with_env("GITHUB_REF", "${{ github.ref }}"),
            );

        let mut workflow = Workflow::new(
            "release",
            Triggers::new()
                .push(EventFilter::branches(&["main"]))
                .manual(),
        )
        .concurrency("${{ github.workflow }}")
        .with_job(Self::JOB_ID, release)?
        .with_job("release_github", github)?;

        if options.release_to_npm {
            let registry = options
                .registry
                .trim_start_matches("https://")
                .trim_end_matches('/')
                .to_string();
            let npm = Job::runs_on(RunsOn::ubuntu())
                .named("Publish to npm")
                .needs(&[Self::JOB_ID])
                .permissions(
                    Permissions::default()
                        .contents(PermissionLevel::Read)
                        .packages(PermissionLevel::Write),
                )
                .when(publish_if.as_str())
                .step(
                    Step::uses("Setup Node.js", "actions/setup-node@v4")
                        .with_input("node-version", options.workflow_node_version.as_str()),
                )
                .step(Self::download_step(&artifacts_directory))
                .step(
                    Step::run("Release", "npx -p publib@latest publib-npm")
                        .with_env("NPM_DIST_TAG", "latest")
                        .with_env("NPM_REGISTRY", registry)
                        .with_env("NPM_TOKEN", "${{ secrets.GITHUB_TOKEN }}"),
                );
            workflow.add_job("release_npm", npm)?;
        }

        Ok(Self {
            workflow,
            artifacts_directory,
        })
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn artifacts_directory(&self) -> &str {
        &self.artifacts_directory
    }

    pub fn add_job(&mut self, id: &str, job: Job) -> Result<(), DomainError> {
        self.workflow.add_job(id, job)
    }

    pub fn add_jobs<I>(&mut self, jobs: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = (String, Job)>,
    {
        for (id, job) in jobs {
            self.workflow.add_job(id, job)?;
        }
        Ok(())
    }

    /// `actions/download-artifact` fetching the release build output.
    pub fn download_step(directory: &str) -> Step {
        Step::uses("Download build artifacts", "actions/download-artifact@v4")
            .with_input("name", Self::ARTIFACT_NAME)
            .with_input("path", directory)
    }
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;
    use crate::domain::project::ProjectOptions;

    fn options() -> ProjectOptions {
        ProjectOptions::new("@time-loop/widget")
    }

    #[test]
    fn post_build_jobs_depend_on_build() {
        let mut build = BuildWorkflow::new(&options()).unwrap();
        build
            .add_post_build_job("ci", Job::runs_on(RunsOn::ubuntu()))
            .unwrap();
        let ci = build.workflow().job("ci").unwrap();
        assert_eq!(ci.needs.as_deref(), Some(&["build".to_string()][..]));
    }

    #[test]
    fn prepended_steps_run_first() {
        let mut build = BuildWorkflow::new(&options()).unwrap();
        build
            .prepend_build_step(Step::run("first", "true"))
            .unwrap();
        let job = build.workflow().job("build").unwrap();
        assert_eq!(job.steps[0].display_name(), Some("first"));
        assert_eq!(job.steps[1].display_name(), Some("Checkout"));
    }

    #[test]
    fn build_permissions_merge_with_defaults() {
        let mut build = BuildWorkflow::new(&options()).unwrap();
        build
            .set_build_permissions(Permissions::default().id_token(PermissionLevel::Write))
            .unwrap();
        let value = build.workflow().to_value(None).unwrap();
        let permissions = &value["jobs"]["build"]["permissions"];
        assert_eq!(permissions["id-token"], Value::from("write"));
        assert_eq!(permissions["contents"], Value::from("write"));
    }

    #[test]
    fn npm_publishing_is_optional() {
        let mut opts = options();
        opts.release_to_npm = true;
        assert!(Release::new(&opts).unwrap().workflow().job("release_npm").is_some());
        opts.release_to_npm = false;
        assert!(Release::new(&opts).unwrap().workflow().job("release_npm").is_none());
    }

    #[test]
    fn release_uploads_artifacts_directory() {
        let release = Release::new(&options()).unwrap();
        assert_eq!(release.artifacts_directory(), "dist");
        let job = release.workflow().job("release").unwrap();
        let upload = job.steps.last().unwrap();
        assert_eq!(upload.action_ref(), Some("actions/upload-artifact@v4"));
    }
}
