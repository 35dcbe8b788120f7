//! Monthly upgrade of the scaffolding tooling, plus the board that tracks
//! the resulting PRs.

use crate::domain::{
    error::DomainError,
    project::{Project, Task, setup_steps},
    workflow::{EventFilter, Job, Permissions, RunsOn, Step, Triggers, Workflow},
};

use super::{Overrides, TOOLING_PACKAGE, add_to_project::project_url};

pub const UPGRADE_PATH: &str = ".github/workflows/update-projen.yml";
pub const ADD_TO_PROJECT_PATH: &str = ".github/workflows/add-to-update-projen-project.yml";

pub const UPDATE_PROJEN_PR_LABEL: &str = "update-projen";
pub const ADD_UPDATE_PROJEN_PROJECT_JOB_NAME: &str = "add-to-update-projen-project";
pub const GITHUB_UPDATE_PROJEN_PROJECT_NUMBER: u32 = 6;

const PATCH_FILE: &str = "repo.patch";
const PR_TITLE: &str = "fix(deps): upgrade projen";

/// Packages bumped by the `update-projen` task.
pub fn upgraded_packages() -> [&'static str; 2] {
    ["projen", TOOLING_PACKAGE]
}

fn upgrade_task(project: &Project) -> Task {
    let mut task = Task::new(UPDATE_PROJEN_PR_LABEL).described("Upgrade the project tooling");
    task.exec(format!(
        "npx npm-check-updates@16 --upgrade --target=minor --peer --dep=dev,peer,prod,optional --filter={}",
        upgraded_packages().join(",")
    ))
    .exec(project.package_manager().install_command(false));
    task
}

pub fn build_upgrade_workflow(project: &Project) -> Result<Workflow, DomainError> {
    let checkout = Step::uses("Checkout", "actions/checkout@v4").with_input("ref", "main");

    let upgrade = Job::runs_on(RunsOn::ubuntu())
        .named("Upgrade")
        .permissions(Permissions::read_contents())
        .output(
            "patch_created",
            "${{ steps.create_patch.outputs.patch_created }}",
        )
        .step(checkout.clone())
        .steps(setup_steps(project.options()))
        .step(Step::run(
            "Upgrade dependencies",
            project.package_manager().run_task(UPDATE_PROJEN_PR_LABEL),
        ))
        .step(
            Step::run(
                "Find mutations",
                format!(
                    "git add .\ngit diff --staged --patch --exit-code > {PATCH_FILE} || echo \"patch_created=true\" >> $GITHUB_OUTPUT"
                ),
            )
            .with_id("create_patch")
            .shell("bash"),
        )
        .step(
            Step::uses("Upload patch", "actions/upload-artifact@v4")
                .when("steps.create_patch.outputs.patch_created")
                .with_input("name", PATCH_FILE)
                .with_input("path", PATCH_FILE)
                .with_input("overwrite", true),
        );

    let body = [
        "Upgrades project dependencies. See details in [workflow run].",
        "",
        "[Workflow Run]: ${{ github.server_url }}/${{ github.repository }}/actions/runs/${{ github.run_id }}",
        "",
        "------",
        "",
        "*Automatically created via the \"update-projen\" workflow*",
    ]
    .join("\n");

    let pr = Job::runs_on(RunsOn::ubuntu())
        .named("Create Pull Request")
        .needs(&["upgrade"])
        .permissions(Permissions::read_contents())
        .when("${{ needs.upgrade.outputs.patch_created }}")
        .step(checkout)
        .step(
            Step::uses("Download patch", "actions/download-artifact@v4")
                .with_input("name", PATCH_FILE)
                .with_input("path", "${{ runner.temp }}"),
        )
        .step(Step::run(
            "Apply patch",
            format!(
                "[ -s ${{{{ runner.temp }}}}/{PATCH_FILE} ] && git apply ${{{{ runner.temp }}}}/{PATCH_FILE} || echo \"Empty patch. Skipping.\""
            ),
        ))
        .step(Step::run(
            "Set git identity",
            "git config user.name \"github-actions\"\ngit config user.email \"github-actions@github.com\"",
        ))
        .step(
            Step::uses("Create Pull Request", "peter-evans/create-pull-request@v6")
                .with_id("create-pr")
                .with_input("token", "${{ secrets.PROJEN_GITHUB_TOKEN }}")
                .with_input("commit-message", format!("{PR_TITLE}\n\n{body}"))
                .with_input("branch", format!("github-actions/{UPDATE_PROJEN_PR_LABEL}"))
                .with_input("title", PR_TITLE)
                .with_input("labels", UPDATE_PROJEN_PR_LABEL)
                .with_input("body", body)
                .with_input("author", "github-actions <github-actions@github.com>")
                .with_input("committer", "github-actions <github-actions@github.com>")
                .with_input("signoff", true),
        );

    Workflow::new(
        UPDATE_PROJEN_PR_LABEL,
        Triggers::new().cron("0 0 1 * *").manual(),
    )
    .with_job("upgrade", upgrade)?
    .with_job("pr", pr)
}

pub fn build_add_to_project_workflow() -> Result<Workflow, DomainError> {
    let job = Job::runs_on(RunsOn::ubuntu())
        .permissions(Permissions::read_contents())
        .step(
            Step::uses("Add to project", "actions/add-to-project@v0.4.1")
                .with_input(
                    "project-url",
                    project_url(GITHUB_UPDATE_PROJEN_PROJECT_NUMBER),
                )
                .with_input("github-token", "${{ secrets.RENOVATEBOT_GITHUB_TOKEN }}")
                .with_input("labeled", UPDATE_PROJEN_PR_LABEL),
        );

    Workflow::new(
        ADD_UPDATE_PROJEN_PROJECT_JOB_NAME,
        Triggers::new().pull_request(EventFilter::types(&["opened", "labeled"])),
    )
    .concurrency("${{ github.workflow }}-${{ github.ref_name }}")
    .with_job(ADD_UPDATE_PROJEN_PROJECT_JOB_NAME, job)
}

/// Add the upgrade task and both workflows. `overrides` apply to the
/// project board workflow.
pub fn add_update_projen_workflows(
    project: &mut Project,
    overrides: Overrides,
) -> Result<(), DomainError> {
    let task = upgrade_task(project);
    project.add_task(task)?;

    let upgrade = build_upgrade_workflow(project)?;
    project.add_workflow(UPGRADE_PATH, &upgrade, None)?;
    project.add_workflow(
        ADD_TO_PROJECT_PATH,
        &build_add_to_project_workflow()?,
        overrides,
    )
}
