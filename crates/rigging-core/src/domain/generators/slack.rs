use serde::Deserialize;

use crate::domain::{
    error::DomainError,
    project::{Project, Release},
    workflow::{Job, Permissions, RunsOn, Step},
};

use super::version_steps;

pub const JOB_ID: &str = "send_release_event_to_slack";
pub const NOTIFY_ACTION: &str = "rtCamp/action-slack-notify@12e36fc18b0689399306c2e0b3e0f2978b7f1ee7";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackAlertOptions {
    /// Defaults to the `PROJEN_RELEASE_SLACK_WEBHOOK` secret.
    pub webhook: Option<String>,
    pub message_title: Option<String>,
    pub message_body: Option<String>,
}

/// Release job announcing a fresh release in Slack.
pub fn build_slack_alert_job(artifacts_directory: &str, options: &SlackAlertOptions) -> Job {
    let notify = Step::uses("Send Slack webhook event", NOTIFY_ACTION)
        .with_env(
            "SLACK_TITLE",
            options.message_title.as_deref().unwrap_or(
                "${{ github.repository }}@${{ steps.event_metadata.outputs.release_tag }} released!",
            ),
        )
        .with_env(
            "SLACK_MESSAGE",
            options.message_body.as_deref().unwrap_or(
                "View the release notes here: https://github.com/${{ github.repository }}/releases/tag/${{ steps.event_metadata.outputs.release_tag }}",
            ),
        )
        .with_env(
            "SLACK_WEBHOOK",
            options
                .webhook
                .as_deref()
                .unwrap_or("${{ secrets.PROJEN_RELEASE_SLACK_WEBHOOK }}"),
        )
        .with_env("SLACK_FOOTER", "")
        .with_env("SLACK_COLOR", "success")
        .with_env("MSG_MINIMAL", "true");

    Job::runs_on(RunsOn::labels(&[RunsOn::UBUNTU]))
        .named("Send Release Alert to Slack")
        .permissions(Permissions::read_contents())
        .needs(&[Release::JOB_ID])
        .when(Release::IS_LATEST_COMMIT)
        .steps(version_steps(artifacts_directory))
        .step(notify)
}

/// No-op when the project does not release.
pub fn add_slack_alert(project: &mut Project, options: &SlackAlertOptions) -> Result<(), DomainError> {
    let Some(release) = project.release_mut() else {
        return Ok(());
    };
    let job = build_slack_alert_job(release.artifacts_directory(), options);
    release.add_job(JOB_ID, job)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;
    use crate::domain::project::ProjectOptions;

    #[test]
    fn webhook_defaults_to_release_secret() {
        let job = build_slack_alert_job("dist", &SlackAlertOptions::default());
        let value = serde_yaml::to_value(&job).unwrap();
        let env = &value["steps"][2]["env"];
        assert_eq!(
            env["SLACK_WEBHOOK"],
            Value::from("${{ secrets.PROJEN_RELEASE_SLACK_WEBHOOK }}")
        );
        assert_eq!(env["MSG_MINIMAL"], Value::from("true"));
        assert_eq!(value["if"], Value::from("needs.release.outputs.latest_commit == github.sha"));
    }

    #[test]
    fn attaches_to_release_workflow() {
        let mut project = Project::new(ProjectOptions::new("@time-loop/widget")).unwrap();
        add_slack_alert(&mut project, &SlackAlertOptions::default()).unwrap();
        let job = project.release().unwrap().workflow().job(JOB_ID).unwrap();
        assert_eq!(job.needs.as_deref(), Some(&["release".to_string()][..]));
    }
}
