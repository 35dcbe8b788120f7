//! Reusable workflow that builds the service image per architecture,
//! validates it, and publishes multi-arch manifests to the build cache.

use serde::Deserialize;

use crate::domain::{
    error::DomainError,
    project::Project,
    workflow::{
        Job, Permissions, RunsOn, Step, Triggers, Workflow, WorkflowCall,
        WorkflowInput, secret,
    },
};

use super::{
    super::{Overrides, SECRET_PACKAGE_READ_TOKEN, checkout_step},
    BUILDCACHE_REPO, BuildArchitecture, DEFAULT_NODE_VERSION, REPO_URI, RETRY_ACTION,
    buildcache_login_step, first_occurrences, org_action, with_docker_tag_env,
};

pub const WORKFLOW_LOCATION: &str = ".github/workflows/ecs-service-build-publish.yml";

pub const VULNERABILITY_SCAN_JOB: &str = "vulnerability-scan";
pub const VALIDATE_JOB: &str = "docker-validate";
pub const PUBLISH_JOB: &str = "docker-publish-buildcache";

const SETUP_NODE_ACTION: &str = "actions/setup-node@5e21ff4d9bc1a8cf6de233a3057d20ec6b3fb69d";
const SETUP_PNPM_ACTION: &str = "pnpm/action-setup@d882d12c64e032187b2edb46d3a0d003b7a43598";

const ON_BRANCH: &str = "startsWith(github.ref, 'refs/heads/')";
const DRAFT_COMMIT: &str = "${{ env.DOCKER_TAG_DRAFT_COMMIT }}";
const COMMIT: &str = "${{ env.DOCKER_TAG_COMMIT }}";
const CURRENT: &str = "${{ env.DOCKER_TAG_CUR }}";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPublishOptions {
    /// Defaults to arm64 only. An explicit empty list is rejected; repeats
    /// collapse into one build.
    pub build_architectures: Option<Vec<BuildArchitecture>>,
    pub node_version: Option<String>,
}

impl BuildPublishOptions {
    pub fn architectures(&self) -> Result<Vec<BuildArchitecture>, DomainError> {
        let archs = self
            .build_architectures
            .clone()
            .unwrap_or_else(|| vec![BuildArchitecture::Arm64]);
        if archs.is_empty() {
            return Err(DomainError::NoBuildArchitectures {
                supported: BuildArchitecture::supported(),
            });
        }
        Ok(first_occurrences(&archs))
    }
}

fn triggers() -> Triggers {
    let build_args = [
        "--progress=plain \\",
        "--secret \"id=npmrc,src=${HOME}/.npmrc\" \\",
        "--iidfile /tmp/IMAGE_ID",
    ]
    .join("\n");

    let call = WorkflowCall::default()
        .input("service-name", WorkflowInput::string().required(true))
        .input(
            "docker-build-args",
            WorkflowInput::string()
                .required(false)
                .described("Build arguments passed to the docker build command")
                .default_value(build_args),
        )
        .input("is-nest-app", WorkflowInput::boolean(true))
        .input("skip-health-check", WorkflowInput::boolean(false))
        .input("skip-vulnerability-scan", WorkflowInput::boolean(false))
        .input(
            "version",
            WorkflowInput::string()
                .described("The version number that was created for the deploy.")
                .required(true),
        );
    Triggers::new().called(call)
}

fn docker_build_job(arch: BuildArchitecture, node_version: &str) -> Job {
    let mut draft_tags = vec![format!("{DRAFT_COMMIT}-{}", arch.as_str())];
    if arch == BuildArchitecture::Amd64 {
        draft_tags.push(DRAFT_COMMIT.to_string());
    }
    let mut publish: Vec<String> = draft_tags
        .iter()
        .map(|tag| format!("docker tag ${{{{ env.DOCKER_IMAGE_ID }}}} \"{REPO_URI}:{tag}\""))
        .collect();
    publish.push(format!("docker push --all-tags \"{REPO_URI}\""));

    let build_command = [
        "bash ./scripts/docker-build.sh \\".to_string(),
        "${{ inputs.docker-build-args }} \\".to_string(),
        "--build-arg VERSION=\"${{ inputs.version }}\" \\".to_string(),
        format!("--build-arg ARCH={}", arch.docker_arch()),
        "test -e /tmp/IMAGE_ID || exit 1".to_string(),
        "echo \"DOCKER_IMAGE_ID=$(cat /tmp/IMAGE_ID)\" >> $GITHUB_ENV".to_string(),
    ]
    .join("\n");

    Job::runs_on(RunsOn::labels(&["self-hosted", arch.runner_label()]))
        .named(format!("Build-{}", arch.as_str()))
        .permissions(Permissions::read_contents())
        .output("docker-tag-draft-commit", DRAFT_COMMIT)
        .output("docker-tag-commit", COMMIT)
        .output("docker-tag-cur", CURRENT)
        .step(Step::run(
            "Check docker volume utilization",
            r#"bash -c 'if [[ `df /var/lib/docker --output=pcent | sed 1d | tr -d " %"` > 85 ]]; then docker system prune -af ; else df -h /var/lib/docker | sed 1d; fi'"#,
        ))
        .step(checkout_step())
        .step(Step::uses("Setup NodeJs", SETUP_NODE_ACTION).with_input("node-version", node_version))
        .step(buildcache_login_step())
        .step(Step::run(
            "Configure NPM",
            format!(
                "echo \"//npm.pkg.github.com/:_authToken={}\" >> ~/.npmrc",
                secret(SECRET_PACKAGE_READ_TOKEN)
            ),
        ))
        .step(Step::bare_uses(SETUP_PNPM_ACTION))
        .step(
            Step::uses("Build image", RETRY_ACTION)
                .with_input("max_attempts", 3)
                .with_input("timeout_minutes", 25)
                .with_input("command", build_command),
        )
        .step(Step::run("Publish image as draft", publish.join("\n")).when(ON_BRANCH))
}

fn vulnerability_scan_job(build_jobs: &[String]) -> Job {
    let scan = Step::uses(
        "Docker Vulnerability Scan",
        org_action("docker-vulnerability-scan"),
    )
    .with_id("vulnerability-scan")
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
    .with_input("buildcache-ecr-repo-name", BUILDCACHE_REPO)
    .with_input("buildcache-pull-tag", format!("{DRAFT_COMMIT}-arm64"))
    .with_input("lacework-account-name", "${{ secrets.LW_ACCOUNT_NAME }}")
    .with_input("lacework-access-token", "${{ secrets.LW_ACCESS_TOKEN }}");

    // Main only, to stay under the scanner's hourly quota.
    Job::runs_on(RunsOn::ubuntu())
        .needs(build_jobs)
        .named("Vulnerability Scan")
        .when("${{ github.ref_name == 'main' && !inputs.skip-vulnerability-scan }}")
        .continue_on_error()
        .permissions(Permissions::read_contents())
        .step(checkout_step())
        .step(scan)
}

const HEALTHCHECK_WAIT: &str = r#"DOCKER_CONTAINER_ID="$(cat /tmp/CONTAINER_ID)"

for i in {1..40}; do
  sleep 5;
  DOCKER_STATUS=$(docker inspect $DOCKER_CONTAINER_ID --format '{{ .State.Status }}')
  DOCKER_HEALTH=$(docker inspect $DOCKER_CONTAINER_ID --format '{{ .State.Health.Status }}')
  echo "Status: ${DOCKER_STATUS}; Health: ${DOCKER_HEALTH}"
  if [ "${DOCKER_STATUS}" == "running" ] && [ "${DOCKER_HEALTH}" == "healthy" ]; then
    echo "Container is running and healthy!"
    exit 0
  fi
done;
echo "Failed to get container healthy!"
echo "Docker logs:"
docker logs -n all $DOCKER_CONTAINER_ID
echo "Docker inspect:"
docker inspect $DOCKER_CONTAINER_ID
exit 1"#;

fn validate_job(build_jobs: &[String]) -> Job {
    let pulled_image = "\"${{ steps.buildcache-pull.outputs.pulled-image-id }}\"";
    let nest_setup = [
        "docker-compose --profile localstack up -d".to_string(),
        "docker run \\".to_string(),
        "-e AWS_ACCESS_KEY_ID=\"${AWS_ACCESS_KEY_ID}\" \\".to_string(),
        "-e AWS_SECRET_ACCESS_KEY=\"${AWS_SECRET_ACCESS_KEY}\" \\".to_string(),
        "-e DOCKER=true \\".to_string(),
        "-e TEST_SERVER=true \\".to_string(),
        "-e CLICKUP_ENV=test \\".to_string(),
        "-e AWS_REGION=us-west-2 \\".to_string(),
        "-e AWS_ACCESS_KEY_ID=test \\".to_string(),
        "-e AWS_SECRET_ACCESS_KEY=test \\".to_string(),
        "--net=host \\".to_string(),
        "-d \\".to_string(),
        "--cidfile /tmp/CONTAINER_ID \\".to_string(),
        format!("{pulled_image} \\"),
        "node ./main.js".to_string(),
    ]
    .join("\n");
    let generic_setup = format!("docker run \\\n-d \\\n--cidfile /tmp/CONTAINER_ID \\\n{pulled_image}");

    Job::runs_on(RunsOn::ubuntu())
        .when(ON_BRANCH)
        .needs(build_jobs)
        .named("Validate")
        .matrix("step", &["healthcheck-verification"])
        .permissions(Permissions::read_contents())
        .step(checkout_step())
        .step(buildcache_login_step())
        .step(
            Step::uses("Pull Image", org_action("docker-ecr-retag-push"))
                .with_id("buildcache-pull")
                .with_input("docker-repo-uri", REPO_URI)
                .with_input("pull-tag", format!("{DRAFT_COMMIT}-arm64")),
        )
        .step(
            Step::uses("healthcheck verification setup (nestjs)", RETRY_ACTION)
                .when("matrix.step == 'healthcheck-verification' && inputs.is-nest-app && !inputs.skip-health-check")
                .with_input("max_attempts", 3)
                .with_input("timeout_minutes", 2)
                .with_input("command", nest_setup),
        )
        .step(
            Step::run("healthcheck verification setup (generic)", generic_setup)
                .when("matrix.step == 'healthcheck-verification' && !inputs.is-nest-app && !inputs.skip-health-check"),
        )
        .step(
            Step::run("healthcheck verification", HEALTHCHECK_WAIT)
                .when("matrix.step == 'healthcheck-verification' && !inputs.skip-health-check"),
        )
}

/// `docker manifest create` for `tag`, amending every per-arch image.
fn manifest_commands(tag: &str, archs: &[BuildArchitecture]) -> [String; 3] {
    let amends = archs
        .iter()
        .map(|arch| format!("--amend \"{REPO_URI}:{tag}-{}\"", arch.as_str()))
        .collect::<Vec<_>>()
        .join(" \\\n");
    [
        format!("docker manifest create \"{REPO_URI}:{tag}\" \\"),
        amends,
        format!("docker manifest push \"{REPO_URI}:{tag}\""),
    ]
}

fn publish_job(archs: &[BuildArchitecture], build_jobs: &[String]) -> Job {
    let pulled = |arch: &BuildArchitecture| {
        format!(
            "\"${{{{ steps.buildcache-pull-{}.outputs.pulled-image-id }}}}\"",
            arch.as_str()
        )
    };
    let retag = |tag: &str| {
        archs
            .iter()
            .map(|arch| {
                format!(
                    "docker tag {} \"{REPO_URI}:{tag}-{}\"",
                    pulled(arch),
                    arch.as_str()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let pulls = archs.iter().map(|arch| {
        Step::uses(
            format!("Pull Image {}", arch.as_str()),
            org_action("docker-ecr-retag-push"),
        )
        .with_id(format!("buildcache-pull-{}", arch.as_str()))
        .with_input("docker-repo-uri", REPO_URI)
        .with_input("pull-tag", format!("{DRAFT_COMMIT}-{}", arch.as_str()))
    });

    let mut publish = vec![format!("docker push --all-tags \"{REPO_URI}\"")];
    for tag in [DRAFT_COMMIT, COMMIT, CURRENT] {
        publish.extend(manifest_commands(tag, archs));
    }

    let mut needs = build_jobs.to_vec();
    needs.push(VALIDATE_JOB.to_string());

    Job::runs_on(RunsOn::ubuntu())
        .when(ON_BRANCH)
        .needs(&needs)
        .named("Publish to Buildcache")
        .step(checkout_step())
        .step(buildcache_login_step())
        .steps(pulls)
        .step(Step::run(
            "Tag draft docker image with commit hash",
            retag(COMMIT),
        ))
        .step(
            Step::run("Tag draft image with branch name", retag(CURRENT))
                .when("${{ github.event_name == 'push' }}"),
        )
        .step(Step::run("Publish tags", publish.join("\n")))
}

/// The build and publish workflow: one `docker-build-{arch}` job per
/// architecture, in the order given, followed by scan, validate and publish.
pub fn build_build_publish_workflow(options: &BuildPublishOptions) -> Result<Workflow, DomainError> {
    let archs = options.architectures()?;
    let node_version = options
        .node_version
        .as_deref()
        .unwrap_or(DEFAULT_NODE_VERSION);

    let mut workflow =
        with_docker_tag_env(Workflow::new("Build and Publish Service Image to ECR", triggers()));

    let mut build_jobs = Vec::with_capacity(archs.len());
    for arch in &archs {
        let id = arch.build_job_id();
        workflow.add_job(id.clone(), docker_build_job(*arch, node_version))?;
        build_jobs.push(id);
    }

    workflow.add_job(VULNERABILITY_SCAN_JOB, vulnerability_scan_job(&build_jobs))?;
    workflow.add_job(VALIDATE_JOB, validate_job(&build_jobs))?;
    workflow.add_job(PUBLISH_JOB, publish_job(&archs, &build_jobs))?;
    Ok(workflow)
}

pub fn add_build_publish_workflow(
    project: &mut Project,
    options: &BuildPublishOptions,
    overrides: Overrides,
) -> Result<(), DomainError> {
    let workflow = build_build_publish_workflow(options)?;
    project.add_workflow(WORKFLOW_LOCATION, &workflow, overrides)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    fn options(archs: &[BuildArchitecture]) -> BuildPublishOptions {
        BuildPublishOptions {
            build_architectures: Some(archs.to_vec()),
            node_version: None,
        }
    }

    #[test]
    fn empty_architecture_list_is_rejected() {
        let err = build_build_publish_workflow(&options(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No valid build architecture selected. Please select at least one of the following: arm64, amd64"
        );
    }

    #[test]
    fn defaults_to_a_single_arm_build() {
        let workflow = build_build_publish_workflow(&BuildPublishOptions::default()).unwrap();
        let builds: Vec<&str> = workflow
            .jobs
            .keys()
            .filter(|id| id.starts_with("docker-build-"))
            .collect();
        assert_eq!(builds, ["docker-build-arm64"]);
    }

    #[test]
    fn one_job_per_architecture() {
        let workflow = build_build_publish_workflow(&options(&[
            BuildArchitecture::Amd64,
            BuildArchitecture::Arm64,
        ]))
        .unwrap();
        let ids: Vec<&str> = workflow.jobs.keys().collect();
        assert_eq!(
            ids,
            [
                "docker-build-amd64",
                "docker-build-arm64",
                VULNERABILITY_SCAN_JOB,
                VALIDATE_JOB,
                PUBLISH_JOB
            ]
        );
        let publish = workflow.job(PUBLISH_JOB).unwrap();
        assert_eq!(
            publish.needs.as_deref().unwrap(),
            ["docker-build-amd64", "docker-build-arm64", "docker-validate"]
        );
    }

    #[test]
    fn repeated_architectures_build_once() {
        let workflow = build_build_publish_workflow(&options(&[
            BuildArchitecture::Arm64,
            BuildArchitecture::Amd64,
            BuildArchitecture::Arm64,
        ]))
        .unwrap();
        let builds: Vec<&str> = workflow
            .jobs
            .keys()
            .filter(|id| id.starts_with("docker-build-"))
            .collect();
        assert_eq!(builds, ["docker-build-arm64", "docker-build-amd64"]);

        let publish = workflow.job(PUBLISH_JOB).unwrap();
        assert_eq!(
            publish.needs.as_deref().unwrap(),
            ["docker-build-arm64", "docker-build-amd64", "docker-validate"]
        );
    }

    #[test]
    fn amd64_also_pushes_bare_draft_tag() {
        let workflow = build_build_publish_workflow(&options(&[BuildArchitecture::Amd64])).unwrap();
        let job = workflow.job("docker-build-amd64").unwrap();
        let publish = job.steps.last().unwrap().script().unwrap();
        assert_eq!(publish.lines().count(), 3);
        assert!(publish.contains(":${{ env.DOCKER_TAG_DRAFT_COMMIT }}\""));

        let value = workflow.to_value(None).unwrap();
        let runs_on = &value["jobs"]["docker-build-amd64"]["runs-on"];
        assert_eq!(runs_on[1], Value::from("X64"));
    }

    #[test]
    fn manifests_amend_every_architecture() {
        let workflow = build_build_publish_workflow(&options(&BuildArchitecture::ALL)).unwrap();
        let publish = workflow.job(PUBLISH_JOB).unwrap();
        let script = publish.steps.last().unwrap().script().unwrap();
        assert_eq!(script.matches("docker manifest create").count(), 3);
        assert_eq!(script.matches("--amend").count(), 6);
    }

    #[test]
    fn node_version_reaches_setup_step() {
        let options = BuildPublishOptions {
            node_version: Some("20".into()),
            ..Default::default()
        };
        let value = build_build_publish_workflow(&options)
            .unwrap()
            .to_value(None)
            .unwrap();
        let setup = &value["jobs"]["docker-build-arm64"]["steps"][2];
        assert_eq!(setup["with"]["node-version"], Value::from("20"));
        assert_eq!(
            value["on"]["workflow_call"]["inputs"]["is-nest-app"]["default"],
            Value::from(true)
        );
    }
}
