use crate::domain::{
    error::DomainError,
    project::Project,
    workflow::{EventFilter, Job, PermissionLevel, Permissions, RunsOn, Step, Triggers, Workflow},
};

use super::Overrides;

pub const PATH: &str = ".github/workflows/codeql-analysis.yml";

/// Weekly CodeQL scan of the JavaScript sources.
pub fn build_codeql_workflow() -> Result<Workflow, DomainError> {
    let analyze = Job::runs_on(RunsOn::ubuntu())
        .named("Analyze")
        .permissions(
            Permissions::default()
                .actions(PermissionLevel::Read)
                .contents(PermissionLevel::Read)
                .security_events(PermissionLevel::Write),
        )
        .matrix("language", &["javascript"])
        .step(Step::uses("Checkout repository", "actions/checkout@v3"))
        .step(
            Step::uses("Initialize CodeQL", "github/codeql-action/init@v2")
                .with_input("languages", "${{ matrix.language }}"),
        )
        .step(Step::uses(
            "Perform CodeQL Analysis",
            "github/codeql-action/analyze@v2",
        ));

    let triggers = Triggers::new()
        .cron("0 0 * * WED")
        .manual()
        .push(EventFilter::branches(&["main"]))
        .pull_request(EventFilter::branches(&["main"]));

    Workflow::new("CodeQL", triggers).with_job("analyze", analyze)
}

pub fn add_codeql_workflow(project: &mut Project, overrides: Overrides) -> Result<(), DomainError> {
    project.add_workflow(PATH, &build_codeql_workflow()?, overrides)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    #[test]
    fn analyzes_javascript_weekly() {
        let value = build_codeql_workflow().unwrap().to_value(None).unwrap();
        assert_eq!(value["on"]["schedule"][0]["cron"], Value::from("0 0 * * WED"));
        let job = &value["jobs"]["analyze"];
        assert_eq!(job["strategy"]["matrix"]["language"][0], Value::from("javascript"));
        assert_eq!(job["permissions"]["security-events"], Value::from("write"));
        assert_eq!(job["steps"].as_sequence().unwrap().len(), 3);
    }
}
