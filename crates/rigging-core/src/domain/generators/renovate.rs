//! Self-hosted renovate: the `upgrade-main` workflow and `renovate.json5`.

use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use crate::domain::{
    error::DomainError,
    merge::{ArrayStrategy, DeepMerge},
    project::{GeneratedFile, Project},
    workflow::{EventFilter, Job, Permissions, RunsOn, Step, Triggers, Workflow},
};

use super::{BOT_USERNAME, Overrides, TOOLING_PACKAGE};

pub const WORKFLOW_PATH: &str = ".github/workflows/renovate.yml";
pub const CONFIG_PATH: &str = "renovate.json5";

pub const AUTO_APPROVE_PR_LABEL: &str = "auto-approve";
pub const DEFAULT_RENOVATE_PR_LABEL: &str = "renovate";
pub const OPTIONAL_RENOVATE_PR_LABEL: &str = "optional";

const MINUTES_IN_HOUR: u64 = 60;
const MINUTE_GROUP_INTERVAL: u64 = 5;

/// Sum of the UTF-16 code units of `name`.
fn name_hash(name: &str) -> u64 {
    name.encode_utf16().map(u64::from).sum()
}

/// Minute past midnight at which renovate runs for `project_name`.
///
/// Spreads repositories over the first hour in 5 minute slots. Always a
/// multiple of 5 in `0..=55`.
pub fn cron_minute(project_name: &str) -> u64 {
    let minute = name_hash(project_name) % MINUTES_IN_HOUR;
    minute / MINUTE_GROUP_INTERVAL * MINUTE_GROUP_INTERVAL
}

/// Weekday schedule derived from the project name.
pub fn cron_schedule(project_name: &str) -> String {
    format!("{} 0 * * MON-FRI", cron_minute(project_name))
}

pub fn build_renovate_workflow(project_name: &str) -> Result<Workflow, DomainError> {
    let renovate = Step::uses("Self-hosted Renovate", "renovatebot/github-action@v40.1.6")
        .when(format!(
            "(github.event_name != 'issues' && github.event_name != 'pull_request') || github.actor != '{BOT_USERNAME}'"
        ))
        .with_input("configurationFile", CONFIG_PATH)
        .with_input(
            "token",
            "x-access-token:${{ secrets.RENOVATEBOT_GITHUB_TOKEN }}",
        )
        .with_env(
            "RENOVATE_HOST_RULES",
            r#"[{"matchHost":"https://npm.pkg.github.com/","hostType":"npm","token":"${{ secrets.ALL_PACKAGE_READ_TOKEN }}"}]"#,
        )
        .with_env(
            "RENOVATE_NPMRC",
            "@${{ github.repository_owner }}:registry=https://npm.pkg.github.com",
        )
        .with_env("RENOVATE_ENABLED_MANAGERS", r#"["npm"]"#)
        .with_env("RENOVATE_REPOSITORIES", r#"["${{ github.repository }}"]"#)
        .with_env(
            "RENOVATE_FORCE",
            r#"${{ github.event_name == 'workflow_dispatch' && '{"schedule":null}' || '' }}"#,
        );

    let job = Job::runs_on(RunsOn::ubuntu())
        .permissions(Permissions::read_contents())
        .step(Step::uses("Checkout", "actions/checkout@v4"))
        .step(renovate);

    let triggers = Triggers::new()
        .cron(cron_schedule(project_name))
        .manual()
        .push(EventFilter::branches(&["main"]).with_paths(&[CONFIG_PATH, WORKFLOW_PATH]))
        .issues(EventFilter::types(&["edited"]))
        .pull_request(EventFilter::types(&["edited"]));

    Workflow::new("upgrade-main", triggers)
        .concurrency(
            "${{ github.workflow }}-${{ github.event_name == 'workflow_dispatch' && github.event_name || '' }}",
        )
        .with_job("upgrade-main", job)
}

pub fn add_renovate_workflow(project: &mut Project, overrides: Overrides) -> Result<(), DomainError> {
    let workflow = build_renovate_workflow(project.name())?;
    project.add_workflow(WORKFLOW_PATH, &workflow, overrides)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenovateOptionsConfig {
    /// Let GitHub auto merge minor and patch updates.
    #[serde(default)]
    pub auto_merge_non_breaking_updates: bool,
    /// Deep-merged over the defaults; arrays are concatenated.
    pub default_overrides: Option<JsonValue>,
}

/// Resolved renovate options: schedule, ignores and the override config.
pub fn renovate_options(config: &RenovateOptionsConfig) -> JsonValue {
    let mut all_non_major = json!({
        "groupName": "all non-major dependencies",
        "groupSlug": "all-minor-patch",
        "matchPackagePatterns": ["*"],
        "excludePackagePatterns": ["^@time-loop\\/clickup-projen"],
        "matchUpdateTypes": ["minor", "patch"]
    });
    if config.auto_merge_non_breaking_updates {
        if let JsonValue::Object(rule) = &mut all_non_major {
            rule.insert("automerge".into(), JsonValue::Bool(true));
            rule.insert("addLabels".into(), json!([AUTO_APPROVE_PR_LABEL]));
        }
    }

    let mut options = json!({
        "scheduleInterval": ["before 2am on Monday"],
        "ignoreProjen": true,
        "ignore": ["node", TOOLING_PACKAGE],
        "overrideConfig": {
            "extends": [
                "config:base",
                "group:recommended",
                "group:monorepos",
                "github>whitesource/merge-confidence:beta"
            ],
            "packageRules": [
                all_non_major,
                {
                    "matchDepTypes": ["optionalDependencies"],
                    "addLabels": [OPTIONAL_RENOVATE_PR_LABEL]
                },
                {
                    "matchPackagePatterns": ["^@time-loop\\/clickup-projen"],
                    "allowedVersions": "!/^[0-9]+\\.[0-9]+\\.[0-9]+(\\.[0-9]+)?-(alpha|beta).*$/"
                },
                {
                    "matchPackagePrefixes": ["@time-loop/"],
                    "matchUpdateTypes": ["major"],
                    "prBodyNotes": ["# MAJOR VERSION UPDATE", "Read the release notes!"]
                }
            ],
            "rangeStrategy": "bump",
            "prHourlyLimit": 0,
            "prConcurrentLimit": 0,
            "automergeType": "pr",
            "platformAutomerge": true
        }
    });

    let overrides = config
        .default_overrides
        .clone()
        .unwrap_or_else(|| json!({ "labels": [DEFAULT_RENOVATE_PR_LABEL] }));
    options.deep_merge(overrides, ArrayStrategy::Concat);
    options
}

/// The `renovate.json5` document for resolved `options`.
pub fn build_renovate_config(options: &JsonValue) -> JsonValue {
    let mut ignore_deps: Vec<JsonValue> = options["ignore"].as_array().cloned().unwrap_or_default();
    if options["ignoreProjen"].as_bool().unwrap_or(true) {
        let projen = JsonValue::from("projen");
        if !ignore_deps.contains(&projen) {
            ignore_deps.push(projen);
        }
    }

    let mut document = serde_json::Map::new();
    if let Some(labels) = options.get("labels") {
        document.insert("labels".into(), labels.clone());
    }
    document.insert(
        "schedule".into(),
        options["scheduleInterval"].clone(),
    );
    document.insert("ignoreDeps".into(), JsonValue::Array(ignore_deps));
    if let Some(JsonValue::Object(config)) = options.get("overrideConfig") {
        for (key, value) in config {
            document.insert(key.clone(), value.clone());
        }
    }
    JsonValue::Object(document)
}

pub fn add_renovate_config(
    project: &mut Project,
    config: &RenovateOptionsConfig,
) -> Result<(), DomainError> {
    let document = build_renovate_config(&renovate_options(config));
    project.add_file(GeneratedFile::json(CONFIG_PATH, document)?)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;
    use crate::domain::project::ProjectOptions;

    #[test]
    fn cron_minute_is_a_five_minute_slot() {
        for name in ["a", "@time-loop/widget", "@time-loop/ecs-payments", "ü", ""] {
            let minute = cron_minute(name);
            assert!(minute <= 55, "{name} -> {minute}");
            assert_eq!(minute % 5, 0);
        }
    }

    #[test]
    fn cron_uses_code_unit_sum() {
        // 'a' + 'b' = 97 + 98 = 195; 195 % 60 = 15
        assert_eq!(cron_schedule("ab"), "15 0 * * MON-FRI");
        // 'a' = 97; 97 % 60 = 37 -> 35
        assert_eq!(cron_schedule("a"), "35 0 * * MON-FRI");
    }

    #[test]
    fn workflow_skips_bot_triggered_runs() {
        let workflow = build_renovate_workflow("@time-loop/widget").unwrap();
        let value = workflow.to_value(None).unwrap();
        let step = &value["jobs"]["upgrade-main"]["steps"][1];
        assert!(step["if"].as_str().unwrap().contains("cu-infra-svc-git"));
        assert_eq!(step["with"]["configurationFile"], Value::from("renovate.json5"));
        assert_eq!(
            value["on"]["push"]["paths"][1],
            Value::from(".github/workflows/renovate.yml")
        );
    }

    #[test]
    fn workflow_overrides_deep_merge() {
        let mut project = Project::new(ProjectOptions::new("@time-loop/widget")).unwrap();
        let overrides: Value =
            serde_yaml::from_str("jobs:\n  upgrade-main:\n    timeout-minutes: 30\n").unwrap();
        add_renovate_workflow(&mut project, Some(&overrides)).unwrap();
        let structure = project.synth("/tmp/widget").unwrap();
        let content = &structure.file(WORKFLOW_PATH).unwrap().content;
        assert!(content.contains("timeout-minutes: 30"));
        assert!(content.contains("renovatebot/github-action@v40.1.6"));
    }

    #[test]
    fn automerge_adds_label_only_when_enabled() {
        let off = renovate_options(&RenovateOptionsConfig::default());
        let rule = &off["overrideConfig"]["packageRules"][0];
        assert!(rule.get("automerge").is_none());
        assert!(rule.get("addLabels").is_none());

        let on = renovate_options(&RenovateOptionsConfig {
            auto_merge_non_breaking_updates: true,
            default_overrides: None,
        });
        let rule = &on["overrideConfig"]["packageRules"][0];
        assert_eq!(rule["automerge"], true);
        assert_eq!(rule["addLabels"], json!(["auto-approve"]));
    }

    #[test]
    fn default_overrides_replace_default_label() {
        let options = renovate_options(&RenovateOptionsConfig {
            auto_merge_non_breaking_updates: false,
            default_overrides: Some(json!({ "ignore": ["aws-cdk-lib"] })),
        });
        assert!(options.get("labels").is_none());
        assert_eq!(
            options["ignore"],
            json!(["node", "@time-loop/clickup-projen", "aws-cdk-lib"])
        );

        let defaults = renovate_options(&RenovateOptionsConfig::default());
        assert_eq!(defaults["labels"], json!(["renovate"]));
    }

    #[test]
    fn config_document_flattens_override_config() {
        let document = build_renovate_config(&renovate_options(&RenovateOptionsConfig::default()));
        assert_eq!(document["schedule"], json!(["before 2am on Monday"]));
        assert_eq!(
            document["ignoreDeps"],
            json!(["node", "@time-loop/clickup-projen", "projen"])
        );
        assert_eq!(document["rangeStrategy"], "bump");
        assert_eq!(document["packageRules"].as_array().unwrap().len(), 4);
    }
}
