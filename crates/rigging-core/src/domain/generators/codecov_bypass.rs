//! Lets a label waive the codecov checks on a pull request.

use serde::Deserialize;

use crate::domain::{
    error::DomainError,
    project::Project,
    workflow::{EventFilter, Job, Permissions, RunsOn, Step, Triggers, Workflow},
};

use super::Overrides;

pub const PATH: &str = ".github/workflows/codecov-bypass.yml";

/// App id of the codecov GitHub app.
pub const CODECOV_GITHUB_APP_ID: u32 = 254;

const DEFAULT_NAME: &str = "Code coverage increased";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecovBypassOptions {
    pub github_app_id: Option<String>,
    pub github_app_private_key: Option<String>,
    /// Generate nothing.
    #[serde(default)]
    pub disabled: bool,
    pub workflow_name: Option<String>,
    pub skip_label: Option<String>,
    pub check_name: Option<String>,
    pub check_suite_check_names: Option<Vec<String>>,
    pub details_url: Option<String>,
}

pub fn build_codecov_bypass_workflow(
    options: &CodecovBypassOptions,
) -> Result<Workflow, DomainError> {
    let check_names = match &options.check_suite_check_names {
        Some(names) if !names.is_empty() => names.join(","),
        _ => "codecov/patch,codecov/project".to_string(),
    };

    let step = Step::uses(
        "Check codecov results",
        "time-loop/github-actions/dist/wrap-check-suite@wrap-check-suite+0.3.2",
    )
    .with_env("FORCE_COLOR", 3u32)
    .with_input(
        "github-app-id",
        options
            .github_app_id
            .as_deref()
            .unwrap_or("${{ vars.CODECOV_GITHUB_APP_ID }}"),
    )
    .with_input(
        "github-private-key",
        options
            .github_app_private_key
            .as_deref()
            .unwrap_or("${{ secrets.CODECOV_GITHUB_APP_PRIVATE_KEY }}"),
    )
    .with_input(
        "skip-label",
        options
            .skip_label
            .as_deref()
            .unwrap_or("code coverage not required"),
    )
    .with_input(
        "check-name",
        options.check_name.as_deref().unwrap_or(DEFAULT_NAME),
    )
    .with_input("check-suite-app-id", CODECOV_GITHUB_APP_ID)
    .with_input("check-suite-check-names", check_names)
    .with_input(
        "details-url",
        options
            .details_url
            .as_deref()
            .unwrap_or("https://app.codecov.io/gh/${{ github.repository }}/pull/<% prNumber %>"),
    );

    let job = Job::runs_on(RunsOn::ubuntu())
        .when(format!(
            "github.event_name != 'check_suite' || github.event.check_suite.app.id == {CODECOV_GITHUB_APP_ID}"
        ))
        .step(step);

    let triggers = Triggers::new()
        .pull_request(EventFilter::types(&["labeled", "unlabeled"]))
        .check_suite(EventFilter::types(&["completed"]));

    Workflow::new(
        options.workflow_name.as_deref().unwrap_or(DEFAULT_NAME),
        triggers,
    )
    .permissions(Permissions::none())
    .with_job("code-coverage-increased", job)
}

/// Does nothing when `options.disabled` is set.
pub fn add_codecov_bypass_workflow(
    project: &mut Project,
    options: &CodecovBypassOptions,
    overrides: Overrides,
) -> Result<(), DomainError> {
    if options.disabled {
        return Ok(());
    }
    project.add_workflow(PATH, &build_codecov_bypass_workflow(options)?, overrides)
}
