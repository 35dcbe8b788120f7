//! Publishes service metadata to the Datadog service catalog on release.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{
    error::DomainError,
    project::{Project, Release},
    workflow::{Job, Permissions, RunsOn, Step},
};

use super::version_steps;

pub const JOB_ID: &str = "send_service_catalog";
pub const PUBLISH_ACTION: &str = "arcxp/datadog-service-catalog-metadata-provider@v2";

pub const SCHEMA_VERSION: &str = "2.1";
pub const DATADOG_HOSTNAME: &str = "app.datadoghq.com";
pub const DATADOG_KEY: &str = "${{ secrets.DD_PROJEN_RELEASE_API_KEY }}";
pub const DATADOG_APP_KEY: &str = "${{ secrets.DD_PROJEN_RELEASE_APP_KEY }}";
pub const SLACK_SUPPORT_CHANNEL: &str = "https://click-up.slack.com/archives/C043T0JBJKY";
pub const DEFAULT_TIER: &str = "low";
pub const NOT_PROVIDED: &str = "Not Provided";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    /// Unique across all services; defaults to the project name.
    pub service_name: Option<String>,
    pub description: Option<String>,
    pub application: Option<String>,
    pub team: Option<String>,
    pub lifecycle: Option<String>,
    pub tier: Option<String>,
    pub pagerduty_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactType {
    Email,
    Slack,
    MicrosoftTeams,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Slack => "slack",
            Self::MicrosoftTeams => "microsoft-teams",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ContactType,
    pub contact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Doc,
    Runbook,
    Repo,
    Dashboard,
    Other,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Runbook => "runbook",
            Self::Repo => "repo",
            Self::Dashboard => "dashboard",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LinkType,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCatalogOptions {
    /// One publish step per entry.
    #[serde(default)]
    pub service_info: Vec<ServiceInfo>,
    pub contacts: Option<Vec<ContactInfo>>,
    pub links: Option<Vec<LinkInfo>>,
    pub service_tags: Option<BTreeMap<String, String>>,
}

/// Default tags followed by `user_tags`; a user tag replaces a default in place.
pub fn merge_service_tags(
    project_name: &str,
    user_tags: Option<&BTreeMap<String, String>>,
) -> Vec<(String, String)> {
    let mut tags: Vec<(String, String)> = [
        ("project", project_name),
        ("release", "true"),
        ("version", "${{ steps.event_metadata.outputs.release_tag }}"),
        ("actor", "${{ github.actor }}"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (key, value) in user_tags.into_iter().flatten() {
        match tags.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.clone(),
            None => tags.push((key.clone(), value.clone())),
        }
    }
    tags
}

/// YAML list fragments joined with `,`, as the action parses them.
fn render_list<T>(items: Option<&[T]>, render: impl Fn(&T) -> String) -> String {
    items
        .unwrap_or_default()
        .iter()
        .map(render)
        .collect::<Vec<_>>()
        .join(",")
}

fn publish_step(
    project_name: &str,
    info: &ServiceInfo,
    options: &ServiceCatalogOptions,
    tags: &[(String, String)],
) -> Step {
    let service_name = info.service_name.as_deref().unwrap_or(project_name);
    let or_missing = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_PROVIDED.into());

    let contacts = render_list(options.contacts.as_deref(), |c| {
        format!(
            "\n- type: {}\n  contact: {}\n  name: {}",
            c.kind.as_str(),
            c.contact,
            c.name
        )
    });
    let links = render_list(options.links.as_deref(), |l| {
        format!(
            "\n- type: {}\n  url: {}\n  name: {}",
            l.kind.as_str(),
            l.url,
            l.name
        )
    });
    let tags = render_list(Some(tags), |(k, v)| format!("\n- {k}:{v}"));

    Step::uses(
        format!("Publish DD Service Catalog for {service_name}"),
        PUBLISH_ACTION,
    )
    .with_input("schema-version", SCHEMA_VERSION)
    .with_input("datadog-hostname", DATADOG_HOSTNAME)
    .with_input("datadog-key", DATADOG_KEY)
    .with_input("datadog-app-key", DATADOG_APP_KEY)
    .with_input("service-name", service_name)
    .with_input("description", or_missing(&info.description))
    .with_input("application", or_missing(&info.application))
    .with_input(
        "tier",
        info.tier.clone().unwrap_or_else(|| DEFAULT_TIER.into()),
    )
    .with_input("lifecycle", or_missing(&info.lifecycle))
    .with_input("team", or_missing(&info.team))
    .with_input("pagerdutyUrl", or_missing(&info.pagerduty_url))
    .with_input("slack-support-channel", SLACK_SUPPORT_CHANNEL)
    .with_input("contacts", contacts)
    .with_input("links", links)
    .with_input("tags", tags)
}

pub fn build_service_catalog_job(
    project_name: &str,
    artifacts_directory: &str,
    options: &ServiceCatalogOptions,
) -> Job {
    let tags = merge_service_tags(project_name, options.service_tags.as_ref());
    let publish = options
        .service_info
        .iter()
        .map(|info| publish_step(project_name, info, options, &tags));

    Job::runs_on(RunsOn::labels(&[RunsOn::UBUNTU]))
        .named("Send to Datadog Service Catalog")
        .permissions(Permissions::read_contents())
        .needs(&[Release::JOB_ID])
        .when(Release::IS_LATEST_COMMIT)
        .steps(version_steps(artifacts_directory))
        .steps(publish)
}

/// No-op when the project does not release.
pub fn add_service_catalog(
    project: &mut Project,
    options: &ServiceCatalogOptions,
) -> Result<(), DomainError> {
    let name = project.name().to_string();
    let Some(release) = project.release_mut() else {
        return Ok(());
    };
    let job = build_service_catalog_job(&name, release.artifacts_directory(), options);
    release.add_job(JOB_ID, job)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    fn options() -> ServiceCatalogOptions {
        ServiceCatalogOptions {
            service_info: vec![
                ServiceInfo {
                    service_name: Some("payments".into()),
                    team: Some("billing".into()),
                    ..Default::default()
                },
                ServiceInfo::default(),
            ],
            contacts: Some(vec![
                ContactInfo {
                    name: "Oncall".into(),
                    kind: ContactType::Slack,
                    contact: "#oncall".into(),
                },
                ContactInfo {
                    name: "Team".into(),
                    kind: ContactType::Email,
                    contact: "team@example.com".into(),
                },
            ]),
            links: None,
            service_tags: Some(BTreeMap::from([
                ("release".to_string(), "false".to_string()),
                ("domain".to_string(), "billing".to_string()),
            ])),
        }
    }

    #[test]
    fn one_publish_step_per_service() {
        let job = build_service_catalog_job("@time-loop/widget", "dist", &options());
        assert_eq!(job.steps.len(), 4);
        assert_eq!(
            job.steps[2].display_name(),
            Some("Publish DD Service Catalog for payments")
        );
        assert_eq!(
            job.steps[3].display_name(),
            Some("Publish DD Service Catalog for @time-loop/widget")
        );
    }

    #[test]
    fn missing_fields_use_placeholders() {
        let job = build_service_catalog_job("@time-loop/widget", "dist", &options());
        let value = serde_yaml::to_value(&job.steps[3]).unwrap();
        assert_eq!(value["with"]["team"], Value::from("Not Provided"));
        assert_eq!(value["with"]["tier"], Value::from("low"));
        assert_eq!(value["with"]["links"], Value::from(""));
    }

    #[test]
    fn contacts_are_comma_joined_yaml_fragments() {
        let job = build_service_catalog_job("@time-loop/widget", "dist", &options());
        let value = serde_yaml::to_value(&job.steps[2]).unwrap();
        assert_eq!(
            value["with"]["contacts"],
            Value::from(
                "\n- type: slack\n  contact: #oncall\n  name: Oncall,\n- type: email\n  contact: team@example.com\n  name: Team"
            )
        );
    }

    #[test]
    fn user_tags_replace_defaults_in_place() {
        let tags = merge_service_tags("@time-loop/widget", options().service_tags.as_ref());
        let keys: Vec<&str> = tags.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["project", "release", "version", "actor", "domain"]);
        assert_eq!(tags[1].1, "false");
    }
}
