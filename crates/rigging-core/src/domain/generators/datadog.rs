//! Datadog event posted after each release.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    error::DomainError,
    project::{Project, Release},
    workflow::{Job, Permissions, RunsOn, Step, expr},
};

pub const JOB_ID: &str = "send_datadog_release_event";
pub const EVENT_ACTION: &str =
    "Glennmen/datadog-event-action@fb18624879901f1ff0c3c7e1e102179793bfe948";

const DEFAULT_EVENT_TEXT: &str = "Released ${{ steps.event_metadata.outputs.repo_name }} version ${{ steps.event_metadata.outputs.release_tag }}";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    #[default]
    Normal,
    Low,
}

impl EventPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReleaseEventOptions {
    pub datadog_api_key: Option<String>,
    pub event_title: Option<String>,
    pub event_text: Option<String>,
    pub event_priority: Option<EventPriority>,
    pub datadog_us: Option<bool>,
    pub event_tags: Option<BTreeMap<String, String>>,
}

/// `["k1:v1","k2:v2"]`, the tag format the event action expects.
pub fn render_event_tags(tags: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = tags.iter().map(|(k, v)| format!("{k}:{v}")).collect();
    serde_json::Value::from(pairs).to_string()
}

pub fn build_release_event_job(artifacts_directory: &str, options: &ReleaseEventOptions) -> Job {
    let mut event = Step::uses("Datadog Release Event", EVENT_ACTION)
        .with_input(
            "datadog_api_key",
            options
                .datadog_api_key
                .as_deref()
                .unwrap_or("${{ secrets.DD_PROJEN_RELEASE_API_KEY }}"),
        )
        .with_input("datadog_us", options.datadog_us.unwrap_or(true))
        .with_input(
            "event_title",
            options.event_title.as_deref().unwrap_or(DEFAULT_EVENT_TEXT),
        )
        .with_input(
            "event_text",
            options.event_text.as_deref().unwrap_or(DEFAULT_EVENT_TEXT),
        )
        .with_input(
            "event_priority",
            options.event_priority.unwrap_or_default().as_str(),
        );
    if let Some(tags) = &options.event_tags {
        event = event.with_input("event_tags", render_event_tags(tags));
    }

    let metadata = Step::run(
        "Output event metadata",
        format!(
            "echo \"release_tag=$(cat {artifacts_directory}/releasetag.txt)\" >> $GITHUB_OUTPUT\n\
             echo \"repo_name=$(echo {} | cut -d'/' -f2)\" >> $GITHUB_OUTPUT",
            expr("github.repository")
        ),
    )
    .with_id("event_metadata");

    Job::runs_on(RunsOn::labels(&[RunsOn::UBUNTU]))
        .permissions(Permissions::read_contents())
        .env_var("CI", "true")
        .step(Release::download_step(artifacts_directory))
        .step(metadata)
        .step(event)
}

/// No-op when the project does not release.
pub fn add_release_event(
    project: &mut Project,
    options: &ReleaseEventOptions,
) -> Result<(), DomainError> {
    let Some(release) = project.release_mut() else {
        return Ok(());
    };
    let job = build_release_event_job(release.artifacts_directory(), options);
    release.add_job(JOB_ID, job)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    #[test]
    fn tags_render_as_json_array() {
        let tags = BTreeMap::from([
            ("service".to_string(), "widget".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]);
        assert_eq!(render_event_tags(&tags), r#"["env:prod","service:widget"]"#);
    }

    #[test]
    fn defaults_fill_every_input() {
        let job = build_release_event_job("dist", &ReleaseEventOptions::default());
        let value = serde_yaml::to_value(&job).unwrap();
        let with = &value["steps"][2]["with"];
        assert_eq!(with["datadog_us"], Value::from(true));
        assert_eq!(with["event_priority"], Value::from("normal"));
        assert!(with.get("event_tags").is_none());
        assert_eq!(value["runs-on"][0], Value::from("ubuntu-latest"));
    }

    #[test]
    fn explicit_options_win() {
        let options = ReleaseEventOptions {
            event_title: Some("shipped".into()),
            event_priority: Some(EventPriority::Low),
            datadog_us: Some(false),
            event_tags: Some(BTreeMap::from([("team".to_string(), "infra".to_string())])),
            ..Default::default()
        };
        let job = build_release_event_job("dist", &options);
        let value = serde_yaml::to_value(&job).unwrap();
        let with = &value["steps"][2]["with"];
        assert_eq!(with["event_title"], Value::from("shipped"));
        assert_eq!(with["event_priority"], Value::from("low"));
        assert_eq!(with["datadog_us"], Value::from(false));
        assert_eq!(with["event_tags"], Value::from(r#"["team:infra"]"#));
    }
}
