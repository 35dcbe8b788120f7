use crate::domain::{
    error::DomainError,
    project::Project,
    workflow::{EventFilter, Job, Permissions, RunsOn, Step, Triggers, Workflow},
};

use super::{GITHUB_ORG, Overrides, checkout_step, renovate::DEFAULT_RENOVATE_PR_LABEL};

pub const PATH: &str = ".github/workflows/add-to-project.yml";
pub const GITHUB_PROJECT_NUMBER: u32 = 3;

/// URL of an organization-level GitHub project board.
pub fn project_url(number: u32) -> String {
    format!("https://github.com/orgs/{GITHUB_ORG}/projects/{number}")
}

/// Files renovate PRs on the dependency project board.
pub fn build_add_to_project_workflow() -> Result<Workflow, DomainError> {
    let job = Job::runs_on(RunsOn::ubuntu())
        .permissions(Permissions::read_contents())
        .step(checkout_step())
        .step(
            Step::uses("Add issue to project", "actions/add-to-project@v0.4.1")
                .with_input("project-url", project_url(GITHUB_PROJECT_NUMBER))
                .with_input(
                    "github-token",
                    "x-access-token:${{ secrets.PROJEN_GITHUB_TOKEN }}",
                )
                .with_input("labeled", DEFAULT_RENOVATE_PR_LABEL),
        );

    Workflow::new(
        "add-to-project",
        Triggers::new().pull_request(EventFilter::types(&["opened", "labeled"])),
    )
    .concurrency(
        "${{ github.workflow }}-${{ github.event_name == 'workflow_dispatch' && github.event_name || '' }}",
    )
    .with_job("add-to-project", job)
}

pub fn add_add_to_project_workflow(
    project: &mut Project,
    overrides: Overrides,
) -> Result<(), DomainError> {
    project.add_workflow(PATH, &build_add_to_project_workflow()?, overrides)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    #[test]
    fn targets_dependency_board() {
        let value = build_add_to_project_workflow().unwrap().to_value(None).unwrap();
        let step = &value["jobs"]["add-to-project"]["steps"][1];
        assert_eq!(
            step["with"]["project-url"],
            Value::from("https://github.com/orgs/time-loop/projects/3")
        );
        assert_eq!(step["with"]["labeled"], Value::from("renovate"));
        assert_eq!(value["on"]["pull_request"]["types"][1], Value::from("labeled"));
    }
}
