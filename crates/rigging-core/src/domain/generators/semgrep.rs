use crate::domain::{
    error::DomainError,
    project::Project,
    workflow::{EventFilter, Job, RunsOn, Step, Triggers, Workflow},
};

use super::Overrides;

pub const PATH: &str = ".github/workflows/semgrep.yml";

/// Pinned by digest; bumped by a recurring security task.
pub const SEMGREP_IMAGE: &str =
    "semgrep/semgrep@sha256:aeb24a8f042cb60fc64a87c6e52b01033fb11442fd224ccc41cc363f5ca3aa10";

pub fn build_semgrep_workflow() -> Result<Workflow, DomainError> {
    let scan = Job::runs_on(RunsOn::ubuntu())
        .named("Scan")
        .container(SEMGREP_IMAGE)
        .step(Step::uses("Checkout repository", "actions/checkout@v3"))
        .step(
            Step::run("Run Semgrep CI", "semgrep ci")
                .with_env("SEMGREP_APP_TOKEN", "${{ secrets.SEMGREP_APP_TOKEN }}"),
        );

    let triggers = Triggers::new()
        .cron("0 0 * * MON-FRI")
        .pull_request(EventFilter::branches(&["main"]));

    Workflow::new("Semgrep", triggers).with_job("semgrep", scan)
}

pub fn add_semgrep_workflow(project: &mut Project, overrides: Overrides) -> Result<(), DomainError> {
    project.add_workflow(PATH, &build_semgrep_workflow()?, overrides)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    #[test]
    fn scans_inside_pinned_container() {
        let value = build_semgrep_workflow().unwrap().to_value(None).unwrap();
        let job = &value["jobs"]["semgrep"];
        assert_eq!(job["container"]["image"], Value::from(SEMGREP_IMAGE));
        assert_eq!(
            job["steps"][1]["env"]["SEMGREP_APP_TOKEN"],
            Value::from("${{ secrets.SEMGREP_APP_TOKEN }}")
        );
        assert!(value["on"].get("workflow_dispatch").is_none());
    }
}
