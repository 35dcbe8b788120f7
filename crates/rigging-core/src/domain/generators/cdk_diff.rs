//! Pull request workflow that diffs CDK stacks per environment and comments
//! the result.
//!
//! Environments are processed in input order: one credential step and one
//! diff step each, then a single notifier step, then label bookkeeping.

use serde::Deserialize;

use crate::domain::{
    error::DomainError,
    project::{GeneratedFile, Project},
    workflow::{EventFilter, Job, PermissionLevel, Permissions, RunsOn, Step, Triggers, Workflow},
};

use super::{BOT_USERNAME, GITHUB_ORG, Overrides, fill_template, github_packages_auth_step};

pub const PATH: &str = ".github/workflows/cdk-diff.yml";
pub const LOG_PARSER_PACKAGE: &str = "@time-loop/cdk-log-parser";
pub const DEFAULT_ROLE_DURATION: u32 = 900;

const OIDC_PERMISSIONS_SAMPLE: &str = include_str!("../../../assets/cdk/oidc/diff-permissions.ts");

/// How an environment selects the stacks to diff.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StackSelection {
    /// Every stack from `cdk ls` whose id contains the string.
    Search {
        #[serde(rename = "stackSearchString")]
        stack_search_string: String,
    },
    Explicit { stacks: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvToDiff {
    /// Used in file names, comment headers and env var names (`qa`, `prod`).
    pub name: String,
    pub oidc_role_arn: String,
    pub label_to_apply_when_no_diff_present: String,
    pub role_duration: Option<u32>,
    #[serde(flatten)]
    pub selection: StackSelection,
}

impl EnvToDiff {
    fn upper(&self) -> String {
        self.name.to_uppercase()
    }

    fn stacks_var(&self) -> String {
        format!("STACKS_TO_DIFF_{}", self.upper())
    }

    fn no_diff_var(&self) -> String {
        format!("{}_HAS_NO_DIFF", self.upper())
    }

    fn validate(&self) -> Result<(), DomainError> {
        let invalid = |reason: &str| DomainError::InvalidDiffEnvironment {
            name: self.name.clone(),
            reason: reason.into(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        match &self.selection {
            StackSelection::Search {
                stack_search_string,
            } if stack_search_string.trim().is_empty() => Err(invalid("stackSearchString cannot be empty")),
            StackSelection::Explicit { stacks } if stacks.is_empty() => {
                Err(invalid("stacks cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdkDiffOptions {
    pub envs_to_diff: Vec<EnvToDiff>,
    #[serde(default)]
    pub create_oidc_role_stack: bool,
    /// Defaults to the project's workflow node version.
    pub node_version: Option<String>,
}

fn capture_stacks_step(envs: &[EnvToDiff]) -> Step {
    let mut lines = vec!["./node_modules/.bin/cdk ls -l -j --notices=false > cdk-ls.json".to_string()];
    for env in envs {
        let var = env.stacks_var();
        let assign = match &env.selection {
            StackSelection::Search {
                stack_search_string,
            } => format!(
                "{var}=$(jq -r '[.[].id | select(contains(\"{stack_search_string}\")) ] | join(\" \")' cdk-ls.json)"
            ),
            StackSelection::Explicit { stacks } => format!("{var}=\"{}\"", stacks.join(" ")),
        };
        lines.push(format!("{assign}\necho \"{var}=${var}\" >> $GITHUB_ENV"));
    }
    Step::run("capture stacks to diff", lines.join("\n"))
}

fn diff_steps(env: &EnvToDiff) -> [Step; 2] {
    let name = &env.name;
    let credentials = Step::aws_credentials(
        format!("configure {name} aws credentials"),
        "v1",
        env.oidc_role_arn.as_str(),
        env.role_duration.unwrap_or(DEFAULT_ROLE_DURATION),
        "us-west-2",
    );
    let diff = Step::run(
        format!("diff {name}"),
        format!(
            "set -o pipefail\n\
             ./node_modules/.bin/cdk diff ${stacks} --progress=events --staging false -e --ignore-errors --version-reporting false &> >(tee cdk-{name}.log)\n\
             ./node_modules/.bin/ts-node ./node_modules/{LOG_PARSER_PACKAGE}/lib/cdkLogParser.js cdk-{name}.log && echo '{no_diff}=true' >> $GITHUB_ENV || echo 'Diffs present!'\n",
            stacks = env.stacks_var(),
            no_diff = env.no_diff_var(),
        ),
    );
    [credentials, diff]
}

fn notifier_step(envs: &[EnvToDiff]) -> Step {
    let mut lines = vec![
        "curl -L \"https://github.com/karlderkaefer/cdk-notifier/releases/download/v2.3.2/cdk-notifier_$(uname)_amd64.gz\" -o cdk-notifier.gz".to_string(),
        "gunzip cdk-notifier.gz && chmod +x cdk-notifier && rm -rf cdk-notifier.gz".to_string(),
    ];
    for env in envs {
        lines.push(format!(
            "./cdk-notifier --log-file ./cdk-{name}.log --repo $REPO_NAME --owner $GITHUB_REPOSITORY_OWNER --token ${{{{ secrets.GITHUB_TOKEN }}}} --pull-request-id ${{{{ github.event.pull_request.number }}}} -t '{name} Stacks - If truncated please see the action for the full log!'",
            name = env.name
        ));
    }
    Step::run("cdk-notify", lines.join("\n"))
}

fn label_removal_step(env: &EnvToDiff) -> Step {
    let label = &env.label_to_apply_when_no_diff_present;
    let script = [
        "const labels = await github.paginate(".to_string(),
        "github.rest.issues.listLabelsOnIssue, {".into(),
        "issue_number: context.issue.number,".into(),
        "owner: context.repo.owner,".into(),
        "repo: context.repo.repo,".into(),
        "}".into(),
        ")".into(),
        format!("if (labels.find(label => label.name === \"{label}\")) {{"),
        "github.rest.issues.removeLabel({".into(),
        "owner: context.repo.owner,".into(),
        "repo: context.repo.repo,".into(),
        "issue_number: context.issue.number,".into(),
        format!("name: \"{label}\""),
        "})".into(),
        "}".into(),
    ]
    .join("\n");

    Step::uses(
        format!(
            "Remove '{label}' label based on diff status given a previous commit may have had no diff but the current one does"
        ),
        "actions/github-script@v6",
    )
    .when(format!("env.{} != 'true'", env.no_diff_var()))
    .with_input("github-token", "${{ secrets.GITHUB_TOKEN }}")
    .with_input("script", script)
}

fn label_apply_step(env: &EnvToDiff) -> Step {
    let label = &env.label_to_apply_when_no_diff_present;
    let script = [
        "github.rest.issues.addLabels({".to_string(),
        "issue_number: context.issue.number,".into(),
        "owner: context.repo.owner,".into(),
        "repo: context.repo.repo,".into(),
        format!("labels: [\"{label}\"]"),
        "})".into(),
    ]
    .join("\n");

    Step::uses(
        format!("Apply '{label}' label based on diff status"),
        "actions/github-script@v6",
    )
    .when(format!("env.{} == 'true'", env.no_diff_var()))
    .with_input("github-token", "${{ secrets.GITHUB_TOKEN }}")
    .with_input("script", script)
}

pub fn build_cdk_diff_workflow(
    options: &CdkDiffOptions,
    workflow_node_version: &str,
) -> Result<Workflow, DomainError> {
    let envs = &options.envs_to_diff;
    if envs.is_empty() {
        return Err(DomainError::NoDiffEnvironments);
    }
    for env in envs {
        env.validate()?;
    }

    let no_diff_everywhere = envs
        .iter()
        .map(|env| format!("env.{} == 'true'", env.no_diff_var()))
        .collect::<Vec<_>>()
        .join(" && ");
    let auto_merge = "steps.should-auto-merge.outputs.auto-merge";

    let job = Job::runs_on(RunsOn::ubuntu())
        .env_var("CI", "true")
        .env_var("REPO_NAME", "${{ github.event.repository.name }}")
        .step(
            Step::uses("Checkout", "actions/checkout@v3")
                .with_input("ref", "${{ github.event.pull_request.head.ref }}")
                .with_input(
                    "repository",
                    "${{ github.event.pull_request.head.repo.full_name }}",
                ),
        )
        .step(github_packages_auth_step())
        .step(
            Step::uses("Setup Node.js", "actions/setup-node@v3").with_input(
                "node-version",
                options.node_version.as_deref().unwrap_or(workflow_node_version),
            ),
        )
        .step(Step::run("Install dependencies", "yarn install --check-files"))
        .step(capture_stacks_step(envs))
        .steps(envs.iter().flat_map(diff_steps))
        .step(notifier_step(envs))
        .steps(envs.iter().map(label_removal_step))
        .steps(envs.iter().map(label_apply_step))
        .step(
            Step::run("Should auto merge", "echo \"auto-merge=true\" >> $GITHUB_OUTPUT")
                .with_id("should-auto-merge")
                .when(format!(
                    "{no_diff_everywhere} && github.event.pull_request.user.login == '{BOT_USERNAME}'"
                )),
        )
        .step(
            Step::uses("Enable automerge", "daneden/enable-automerge-action@v1.0.2")
                .when(auto_merge)
                .with_input("github-token", "${{ secrets.PROJEN_GITHUB_TOKEN }}")
                .with_input("merge-method", "SQUASH")
                .with_input("allowed-author", BOT_USERNAME),
        )
        .step(
            Step::uses("Auto approve", "hmarr/auto-approve-action@v2.2.1")
                .when(auto_merge)
                .with_input("github-token", "${{ secrets.GITHUB_TOKEN }}"),
        )
        .step(
            Step::uses("Save processed diff logs", "actions/upload-artifact@v3.1.2")
                .with_input("name", "ProcessedDiffLogs")
                .with_input("path", "*.log")
                .with_input("retention-days", 3u32),
        );

    Workflow::new(
        "cdk-diff",
        Triggers::new().pull_request(EventFilter::any()).manual(),
    )
    .permissions(
        Permissions::default()
            .id_token(PermissionLevel::Write)
            .contents(PermissionLevel::Write)
            .pull_requests(PermissionLevel::Write),
    )
    .with_job("diff", job)
}

/// Workflow, log parser dev dependency and the optional OIDC role sample.
pub fn add_cdk_diff_workflow(
    project: &mut Project,
    options: &CdkDiffOptions,
    overrides: Overrides,
) -> Result<(), DomainError> {
    let node_version = project.options().workflow_node_version.clone();
    let workflow = build_cdk_diff_workflow(options, &node_version)?;
    project.add_workflow(PATH, &workflow, overrides)?;
    project.manifest_mut().add_dev_deps(&[LOG_PARSER_PACKAGE]);

    if options.create_oidc_role_stack {
        let path = format!("{}/github-actions-oidc-permissions.ts", project.srcdir());
        let contents = fill_template(
            OIDC_PERMISSIONS_SAMPLE,
            &[("PROJECT_NAME", project.name()), ("GITHUB_ORG", GITHUB_ORG)],
        );
        project.add_file(GeneratedFile::sample(&path, contents)?)?;
    }
    Ok(())
}
