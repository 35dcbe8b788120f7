//! Deploy workflows for ECS services.
//!
//! `ecs-service-deploy.yml` fans out one job per environment, each calling
//! the reusable `harness-deploy.yml`, which copies the image into the
//! environment's registry and triggers the Harness pipeline.

use serde::{Deserialize, Serialize};

use crate::domain::{
    error::DomainError,
    naming::{Namer, capitalize},
    project::Project,
    workflow::{
        Job, PermissionLevel, Permissions, RunsOn, Step, Triggers, Workflow, WorkflowCall,
        WorkflowInput, expr,
    },
};

use super::{
    super::{Overrides, checkout_step},
    BUILDCACHE_REPO, buildcache_login_step, first_occurrences, with_docker_tag_env,
};

pub const WORKFLOW_LOCATION: &str = ".github/workflows/ecs-service-deploy.yml";
pub const HARNESS_WORKFLOW_LOCATION: &str = ".github/workflows/harness-deploy.yml";

pub const WEBHOOK_JOB: &str = "formatting";
pub const START_DEPLOY_JOB: &str = "start-deploy";
pub const HEALTHCHECK_JOB: &str = "harness-healthchecks";

/// `fjogeleit/http-request-action` v1.14.1.
const HTTP_REQUEST_ACTION: &str = "fjogeleit/http-request-action@eab8015483ccea148feff7b1c65f320805ddc2bf";

const DOCKER_VERSION_TAG: &str = r#"version-${{ inputs.deploy-service-name && format('{0}-', inputs.deploy-service-name) || "" }}${{ inputs.version || steps.version.outputs.version }}"#;

/// Harness environments a service can deploy to, in promotion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployEnvironment {
    Qa,
    Staging,
    Prod,
}

impl DeployEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qa => "qa",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    /// Name parts of the matching ClickUp environment (`usQa`, ...).
    pub fn clickup_env(&self) -> Namer {
        match self {
            Self::Qa => Namer::new(&["us", "qa"]),
            Self::Staging => Namer::new(&["global", "staging"]),
            Self::Prod => Namer::new(&["global", "prod"]),
        }
    }

    /// Environments that must be deployed before this one.
    pub fn predecessors(&self) -> &'static [DeployEnvironment] {
        match self {
            Self::Qa => &[],
            Self::Staging => &[Self::Qa],
            Self::Prod => &[Self::Qa, Self::Staging],
        }
    }

    pub fn deploy_job_id(&self) -> String {
        format!("docker-deploy-{}", self.as_str())
    }
}

fn default_deploy_envs() -> Vec<DeployEnvironment> {
    vec![DeployEnvironment::Qa]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOptions {
    #[serde(default = "default_deploy_envs")]
    pub deploy_envs: Vec<DeployEnvironment>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            deploy_envs: default_deploy_envs(),
        }
    }
}

fn webhook_url_step(env: DeployEnvironment) -> Step {
    let lower = env.as_str();
    let upper = lower.to_uppercase();
    let script = [
        r#"export SERVICE_ID=$(echo "${{ inputs.service-name }}" | sed 's/-/_/g')"#.to_string(),
        format!(
            "export {upper}_WEBHOOK_URL=$(echo \"https://app.harness.io/gateway/pipeline/api/webhook/custom/v2?accountIdentifier=${{ACCOUNT_IDENTIFIER}}&orgIdentifier=${{ORG_IDENTIFIER}}&projectIdentifier=${{PROJECT_IDENTIFIER}}&pipelineIdentifier={lower}_${{SERVICE_ID}}_deploy&triggerIdentifier=customwebhook_{lower}_${{SERVICE_ID}}\")"
        ),
        format!("echo ${upper}_WEBHOOK_URL"),
        format!("echo \"webhook-url=${upper}_WEBHOOK_URL\" >> \"$GITHUB_OUTPUT\""),
    ]
    .join("\n");

    Step::run(format!("Generate {} webhook URL", capitalize(lower)), script).with_id(lower)
}

fn webhook_job(envs: &[DeployEnvironment]) -> Job {
    let mut job = Job::runs_on(RunsOn::ubuntu())
        .named("Generate Harness Webhook URLs")
        .permissions(Permissions::read_contents())
        .env_var("ACCOUNT_IDENTIFIER", "${{ inputs.harness-account-identifier }}")
        .env_var("ORG_IDENTIFIER", "ClickUp")
        .env_var("PROJECT_IDENTIFIER", "clickupbackend");
    for env in envs {
        job = job.output(
            &format!("harness-webhook-url-{}", env.as_str()),
            expr(&format!("steps.{}.outputs.webhook-url", env.as_str())),
        );
    }
    job.steps(envs.iter().map(|env| webhook_url_step(*env)))
}

fn deploy_job(env: DeployEnvironment, selected: &[DeployEnvironment]) -> Job {
    let clickup_env = env.clickup_env();
    let mut needs = vec![WEBHOOK_JOB.to_string()];
    needs.extend(
        env.predecessors()
            .iter()
            .filter(|prev| selected.contains(*prev))
            .map(DeployEnvironment::deploy_job_id),
    );

    Job::calling(format!("./{HARNESS_WORKFLOW_LOCATION}"))
        .named(format!("Deploy to {}", env.as_str()))
        .when("github.ref == 'refs/heads/main'")
        .needs(&needs)
        .permissions(
            Permissions::default()
                .contents(PermissionLevel::Read)
                .actions(PermissionLevel::Read),
        )
        .concurrency("${{ github.workflow }}-${{ inputs.service-name }}-${{ github.ref_name }}")
        .with_input("buildcache-ecr-repo-name", BUILDCACHE_REPO)
        .with_input(
            "buildcache-pull-tag",
            "${{ needs.docker-build.outputs.docker-tag-draft-commit }}",
        )
        .with_input(
            "github-environment",
            format!("ecs-deploy-user-{}", clickup_env.joined()),
        )
        .with_input("deploy-aws-region", "us-east-1")
        .with_input("deploy-clickup-env", clickup_env.camel())
        .with_input("deploy-type", "monorepo")
        .with_input("deploy-service-name", "${{ inputs.service-name }}")
        .with_input(
            "deploy-ecr-repo-name",
            format!("monorepo-deploy-{}", clickup_env.kebab()),
        )
        .with_input(
            "deploy-push-tags",
            "${{ needs.docker-build.outputs.docker-tag-cur }} ${{ needs.docker-build.outputs.docker-tag-commit }}",
        )
        .with_input(
            "deploy-harness-webhook",
            expr(&format!(
                "needs.{WEBHOOK_JOB}.outputs.harness-webhook-url-{} || ''",
                env.as_str()
            )),
        )
        .with_input("version", "${{ inputs.version }}")
        .secret(
            "buildcache-aws-access-key-id",
            "${{ secrets.ECR_BUILD_CACHE_AWS_ACCESS_KEY_ID }}",
        )
        .secret(
            "buildcache-aws-secret-access-key",
            "${{ secrets.ECR_BUILD_CACHE_AWS_SECRET_ACCESS_KEY }}",
        )
        .secret(
            "buildcache-aws-region",
            "${{ secrets.ECR_BUILD_CACHE_AWS_REGION }}",
        )
        .secret(
            "github-packages-read-token",
            "${{ secrets.ALL_PACKAGE_READ_TOKEN }}",
        )
        .secret(
            "ecs-alerts-slack-webhook",
            "${{ secrets.ECS_ALERTS_SLACK_WEBHOOK }}",
        )
        .secret("deploy-harness-api-token", "${{ secrets.HARNESS_API_TOKEN }}")
        .secret("deploy-aws-access-key-id", "${{ secrets.AWS_ACCESS_KEY_ID }}")
        .secret(
            "deploy-aws-secret-access-key",
            "${{ secrets.AWS_SECRET_ACCESS_KEY }}",
        )
}

/// The per-service deploy workflow: webhook URLs, then one job per
/// environment. Jobs wait only on earlier environments that are selected.
pub fn build_deploy_workflow(options: &DeployOptions) -> Result<Workflow, DomainError> {
    let envs = first_occurrences(&options.deploy_envs);
    if envs.is_empty() {
        return Err(DomainError::NoDeployEnvironments);
    }

    let call = WorkflowCall::default()
        .input("service-name", WorkflowInput::string().required(true))
        .input(
            "version",
            WorkflowInput::string()
                .described("The version number that was created for the deploy.")
                .required(true),
        )
        .input(
            "harness-account-identifier",
            WorkflowInput::string()
                .described("Harness account identifier for Harness pipelines.")
                .required(true),
        );

    let mut workflow = with_docker_tag_env(Workflow::new(
        "Deploy Service Image to ECS",
        Triggers::new().called(call),
    ))
    .with_job(WEBHOOK_JOB, webhook_job(&envs))?;

    for env in &envs {
        workflow.add_job(env.deploy_job_id(), deploy_job(*env, &envs))?;
    }
    Ok(workflow)
}

fn harness_triggers() -> Triggers {
    let required = |description: &str| WorkflowInput::string().described(description).required(true);
    let optional = |description: &str| WorkflowInput::string().described(description).required(false);

    let call = WorkflowCall::default()
        .input(
            "github-environment",
            required("GitHub environment name that will contain AWS secrets"),
        )
        .input("buildcache-ecr-repo-name", required("ECR repository name"))
        .input("buildcache-pull-tag", optional("Tag to pull automatically"))
        .input(
            "deploy-aws-region",
            required("Amazon region containing the Lambda to deploy a group of services"),
        )
        .input(
            "deploy-clickup-env",
            required(
                "The ClickUp environment to deploy to. E.g. \"usQa\", \"globalStaging\", \"globalProd\", etc.",
            ),
        )
        .input("deploy-ecr-repo-name", required("ECR repository name"))
        .input("deploy-push-tags", optional("Tags to push separated by space"))
        .input(
            "deploy-harness-webhook",
            optional("The Harness webhook to trigger a deployment").default_value(""),
        )
        .input(
            "deploy-type",
            required(
                "Are we deploying the monolith, or the monorepo? e.g. \"monolith\" or \"monorepo\"",
            ),
        )
        .input(
            "deploy-service-name",
            optional(
                "If deploy-type = monorepo, this should be the micro service name that is being deployed",
            ),
        )
        .input(
            "version",
            required("The version number that was created for the deploy."),
        )
        .secret(
            "buildcache-aws-access-key-id",
            "Amazon access key id for build cache user",
        )
        .secret(
            "buildcache-aws-secret-access-key",
            "Amazon access key for build cache user",
        )
        .secret("buildcache-aws-region", "Amazon region")
        .secret(
            "github-packages-read-token",
            "A Github personal access token that has read permission for private github packages",
        )
        .secret(
            "ecs-alerts-slack-webhook",
            "A slack webhook to post alerts on ECS deployment failures",
        )
        .secret(
            "deploy-harness-api-token",
            "A Harness API token to trigger a deployment",
        )
        .secret(
            "deploy-aws-access-key-id",
            "Amazon access key id for deploy user",
        )
        .secret(
            "deploy-aws-secret-access-key",
            "Amazon access key for deploy user",
        );
    Triggers::new().called(call)
}

const COPY_DIGESTS: &str = r#"for digest in "${DIGESTS[@]}"; do
  DST_SHA_DOCKER_TAG=$(echo ${digest} | tr ':' '-')

  docker pull "${SRC_DOCKER_REPO}@${digest}"
  docker tag "${SRC_DOCKER_REPO}@${digest}" "${DST_DOCKER_REPO}:${DST_SHA_DOCKER_TAG}"
done"#;

const CREATE_MANIFESTS: &str = r#"for digest in "${DIGESTS[@]}"; do
  DST_SHA_DOCKER_TAG=$(echo ${digest} | tr ':' '-')

  for DST_DOCKER_TAG in ${DST_DOCKER_TAGS}; do
    docker manifest create "${DST_DOCKER_REPO}:${DST_DOCKER_TAG}" --amend "${DST_DOCKER_REPO}:${DST_SHA_DOCKER_TAG}"
  done
done"#;

const PUSH_MANIFESTS: &str = r#"for DST_DOCKER_TAG in ${DST_DOCKER_TAGS}; do
  docker manifest push "${DST_DOCKER_REPO}:${DST_DOCKER_TAG}"
done"#;

/// Re-tag every platform image of the build cache manifest into the
/// deploy registry and recreate the manifests there.
fn copy_manifest_step() -> Step {
    let script = [
        "set -ex".to_string(),
        r#"export SRC_DOCKER_TAG="${{ inputs.buildcache-pull-tag }}""#.to_string(),
        format!(r#"export DST_DOCKER_TAGS="${{{{ inputs.deploy-push-tags }}}} {DOCKER_VERSION_TAG}""#),
        r#"SRC_DOCKER_IMAGE="${SRC_DOCKER_REPO}:${SRC_DOCKER_TAG}""#.to_string(),
        r#"DIGESTS=($(docker manifest inspect "$SRC_DOCKER_IMAGE" | jq -r '.manifests[].digest'))"#
            .to_string(),
        COPY_DIGESTS.to_string(),
        r#"docker push "${DST_DOCKER_REPO}" --all-tags"#.to_string(),
        CREATE_MANIFESTS.to_string(),
        PUSH_MANIFESTS.to_string(),
        r#"echo "did-image-push=true" >> $GITHUB_OUTPUT"#.to_string(),
    ]
    .join("\n");

    Step::run("Copy Manifest contents", script)
        .with_id("copy-manifest")
        .shell("bash")
        .with_env(
            "SRC_DOCKER_REPO",
            "${{ steps.buildcache.outputs.docker-repo-uri }}",
        )
        .with_env(
            "DST_DOCKER_REPO",
            "${{ steps.deploy-repo.outputs.docker-repo-uri }}",
        )
}

fn harness_trigger_steps() -> [Step; 2] {
    let trigger = Step::uses("Harness Deployment Trigger", HTTP_REQUEST_ACTION)
        .when(r#"${{ steps.copy-manifest.outputs.did-image-push && inputs.deploy-harness-webhook != "" }}"#)
        .with_env("docker_tag", DOCKER_VERSION_TAG)
        .with_id("harness-trigger")
        .with_input("url", "${{ inputs.deploy-harness-webhook }}")
        .with_input("method", "POST")
        .with_input(
            "customHeaders",
            r#"{"Content-Type": "application/json", "X-Api-Key": "${{ secrets.deploy-harness-api-token }}"}"#,
        )
        .with_input("data", r#"{"image_tag": "${{ env.docker_tag }}"}"#);
    let response = Step::run(
        "Harness Deployment Response",
        "echo '${{ steps.harness-trigger.outputs.response }}' | jq .",
    );
    [trigger, response]
}

fn start_deploy_job() -> Job {
    Job::runs_on(RunsOn::ubuntu())
        .named("Start deploy")
        .environment("${{ inputs.github-environment }}")
        .permissions(
            Permissions::default()
                .contents(PermissionLevel::Read)
                .actions(PermissionLevel::Read),
        )
        .output(
            "trigger-response",
            "${{ steps.harness-trigger.outputs.response }}",
        )
        .step(checkout_step())
        .step(buildcache_login_step())
        .step(copy_manifest_step())
        .steps(harness_trigger_steps())
}

fn healthcheck_job() -> Job {
    let response = |field: &str| {
        expr(&format!(
            "fromJSON(needs.{START_DEPLOY_JOB}.outputs.trigger-response).data.{field}"
        ))
    };

    Job::runs_on(RunsOn::ubuntu())
        .named("Post deploy healthchecks")
        .environment("${{ inputs.github-environment }}")
        .needs(&[START_DEPLOY_JOB])
        .when(expr(&format!(
            "(success() || failure()) && needs.{START_DEPLOY_JOB}.outputs.trigger-response"
        )))
        .permissions(
            Permissions::default()
                .contents(PermissionLevel::Read)
                .actions(PermissionLevel::Read),
        )
        .step(checkout_step())
        .step(
            Step::run(
                "Get Harness Pipeline Execution URL",
                format!("echo {}", response("uiUrl")),
            )
            .shell("bash"),
        )
        .step(
            Step::uses(
                "Get Harness Pipeline Status",
                "./.github/actions/harness-pipeline-wait",
            )
            .when("${{ inputs.deploy-harness-webhook != '' }}")
            .with_id("harness-pipeline-wait")
            .with_input(
                "harness-api-token",
                "${{ secrets.deploy-harness-api-token }}",
            )
            .with_input("harness-execution-url", response("apiUrl")),
        )
}

/// The reusable workflow each environment's deploy job calls.
pub fn build_harness_workflow() -> Result<Workflow, DomainError> {
    Workflow::new("Harness Deploy", harness_triggers())
        .with_job(START_DEPLOY_JOB, start_deploy_job())?
        .with_job(HEALTHCHECK_JOB, healthcheck_job())
}

/// Attach both deploy workflows; `overrides` applies to the per-service one.
pub fn add_deploy_workflows(
    project: &mut Project,
    options: &DeployOptions,
    overrides: Overrides,
) -> Result<(), DomainError> {
    let deploy = build_deploy_workflow(options)?;
    let harness = build_harness_workflow()?;
    project.add_workflow(HARNESS_WORKFLOW_LOCATION, &harness, None)?;
    project.add_workflow(WORKFLOW_LOCATION, &deploy, overrides)
}
