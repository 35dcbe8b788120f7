//! Caller-facing options shared by every archetype.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use serde_yaml::Value as YamlValue;

use crate::domain::{
    generators::{
        codecov::DEFAULT_TOKEN_SECRET, codecov_bypass::CodecovBypassOptions,
        datadog::ReleaseEventOptions, renovate::RenovateOptionsConfig,
        service_catalog::ServiceCatalogOptions, slack::SlackAlertOptions,
    },
    merge::{Merge, append_unique, merge_by_replacement, merge_maps},
    parameters::{MIN_ENGINE_NODE_VERSION, NODE_VERSION},
    project::PackageManager,
    workflow::Step,
};

use super::{docgen::DocgenOptions, organization::Organization};

merge_by_replacement!(
    PackageManager,
    RenovateOptionsConfig,
    CodecovBypassOptions,
    SlackAlertOptions,
    ReleaseEventOptions,
    ServiceCatalogOptions,
    DocgenOptions,
);

/// A named shell step run before dependencies are installed in CI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapStep {
    pub name: String,
    pub run: String,
}

impl From<&BootstrapStep> for Step {
    fn from(step: &BootstrapStep) -> Self {
        Step::run(step.name.clone(), step.run.clone())
    }
}

/// Options for a TypeScript project. Every field is optional so a record
/// can act as one layer of a stack; see [`Merge`] for how layers combine.
///
/// | Field                                        | Merge                 |
/// |----------------------------------------------|-----------------------|
/// | scalars and integration options              | overlay replaces      |
/// | `deps`, `dev_deps`, `peer_deps`, `gitignore` | append, no duplicates |
/// | `workflow_bootstrap_steps`                   | append, no duplicates |
/// | `prettier_options`, `jest_config`            | deep merge            |
/// | `overrides`                                  | per path, deep merge  |
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeScriptProjectOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_organization: Option<bool>,
    /// `false` renders `UNLICENSED`.
    pub licensed: Option<bool>,
    /// SPDX identifier used when `licensed`.
    pub license: Option<String>,
    pub package_manager: Option<PackageManager>,

    pub release: Option<bool>,
    pub release_to_npm: Option<bool>,
    pub npm_registry_url: Option<String>,
    pub workflow_bootstrap_steps: Option<Vec<BootstrapStep>>,
    pub min_node_version: Option<String>,
    pub workflow_node_version: Option<String>,

    pub prettier: Option<bool>,
    pub prettier_options: Option<JsonValue>,
    pub jest_config: Option<JsonValue>,
    pub code_cov: Option<bool>,
    pub code_cov_token_secret: Option<String>,

    pub deps: Option<Vec<String>>,
    pub dev_deps: Option<Vec<String>>,
    pub peer_deps: Option<Vec<String>>,
    pub gitignore: Option<Vec<String>>,
    pub srcdir: Option<String>,
    pub testdir: Option<String>,

    pub renovate_options_config: Option<RenovateOptionsConfig>,
    pub codeql: Option<bool>,
    pub add_to_project: Option<bool>,
    pub codecov_bypass_options: Option<CodecovBypassOptions>,
    pub slack_alert: Option<bool>,
    pub slack_alert_options: Option<SlackAlertOptions>,
    pub send_release_event: Option<bool>,
    pub release_event_options: Option<ReleaseEventOptions>,
    pub service_catalog_options: Option<ServiceCatalogOptions>,
    pub docgen: Option<bool>,
    pub docgen_options: Option<DocgenOptions>,

    /// Documents deep-merged over generated files, keyed by path.
    pub overrides: Option<BTreeMap<String, YamlValue>>,
}

impl TypeScriptProjectOptions {
    /// The organization's defaults: the lowest layer every archetype
    /// starts from.
    pub fn organization_defaults(org: &Organization) -> Self {
        Self {
            author_name: Some(org.author_name.clone()),
            author_email: Some(org.author_email.clone()),
            author_organization: Some(true),
            licensed: Some(false),
            package_manager: Some(PackageManager::Pnpm),
            release: Some(true),
            release_to_npm: Some(true),
            npm_registry_url: Some(org.registry.clone()),
            workflow_bootstrap_steps: Some(vec![org.packages_auth_step()]),
            min_node_version: Some(MIN_ENGINE_NODE_VERSION.into()),
            workflow_node_version: Some(NODE_VERSION.into()),
            prettier: Some(true),
            prettier_options: Some(json!({
                "printWidth": 120,
                "singleQuote": true,
                "trailingComma": "all"
            })),
            jest_config: Some(json!({ "collectCoverageFrom": ["src/**/*.ts"] })),
            code_cov: Some(true),
            code_cov_token_secret: Some(DEFAULT_TOKEN_SECRET.into()),
            dev_deps: Some(
                [
                    "esbuild",
                    "eslint-config-prettier",
                    "eslint-plugin-prettier",
                    "jsii-release",
                    "prettier",
                ]
                .map(String::from)
                .to_vec(),
            ),
            ..Self::default()
        }
    }

    /// Override document for the generated file at `path`.
    pub fn override_for(&self, path: &str) -> Option<&YamlValue> {
        self.overrides.as_ref().and_then(|docs| docs.get(path))
    }
}

impl Merge for TypeScriptProjectOptions {
    fn merge(self, overlay: Self) -> Self {
        Self {
            name: self.name.merge(overlay.name),
            description: self.description.merge(overlay.description),
            author_name: self.author_name.merge(overlay.author_name),
            author_email: self.author_email.merge(overlay.author_email),
            author_organization: self.author_organization.merge(overlay.author_organization),
            licensed: self.licensed.merge(overlay.licensed),
            license: self.license.merge(overlay.license),
            package_manager: self.package_manager.merge(overlay.package_manager),

            release: self.release.merge(overlay.release),
            release_to_npm: self.release_to_npm.merge(overlay.release_to_npm),
            npm_registry_url: self.npm_registry_url.merge(overlay.npm_registry_url),
            workflow_bootstrap_steps: append_unique(
                self.workflow_bootstrap_steps,
                overlay.workflow_bootstrap_steps,
            ),
            min_node_version: self.min_node_version.merge(overlay.min_node_version),
            workflow_node_version: self
                .workflow_node_version
                .merge(overlay.workflow_node_version),

            prettier: self.prettier.merge(overlay.prettier),
            prettier_options: self.prettier_options.merge(overlay.prettier_options),
            jest_config: self.jest_config.merge(overlay.jest_config),
            code_cov: self.code_cov.merge(overlay.code_cov),
            code_cov_token_secret: self
                .code_cov_token_secret
                .merge(overlay.code_cov_token_secret),

            deps: append_unique(self.deps, overlay.deps),
            dev_deps: append_unique(self.dev_deps, overlay.dev_deps),
            peer_deps: append_unique(self.peer_deps, overlay.peer_deps),
            gitignore: append_unique(self.gitignore, overlay.gitignore),
            srcdir: self.srcdir.merge(overlay.srcdir),
            testdir: self.testdir.merge(overlay.testdir),

            renovate_options_config: self
                .renovate_options_config
                .merge(overlay.renovate_options_config),
            codeql: self.codeql.merge(overlay.codeql),
            add_to_project: self.add_to_project.merge(overlay.add_to_project),
            codecov_bypass_options: self
                .codecov_bypass_options
                .merge(overlay.codecov_bypass_options),
            slack_alert: self.slack_alert.merge(overlay.slack_alert),
            slack_alert_options: self.slack_alert_options.merge(overlay.slack_alert_options),
            send_release_event: self.send_release_event.merge(overlay.send_release_event),
            release_event_options: self
                .release_event_options
                .merge(overlay.release_event_options),
            service_catalog_options: self
                .service_catalog_options
                .merge(overlay.service_catalog_options),
            docgen: self.docgen.merge(overlay.docgen),
            docgen_options: self.docgen_options.merge(overlay.docgen_options),

            overrides: merge_maps(self.overrides, overlay.overrides),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(json: &str) -> TypeScriptProjectOptions {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn caller_fields_are_camel_case() {
        let options = caller(r#"{ "name": "widget", "releaseToNpm": false, "devDeps": ["zod"] }"#);
        assert_eq!(options.name.as_deref(), Some("widget"));
        assert_eq!(options.release_to_npm, Some(false));
        assert_eq!(options.dev_deps, Some(vec!["zod".to_string()]));
    }

    #[test]
    fn dev_deps_extend_organization_defaults() {
        let merged = TypeScriptProjectOptions::organization_defaults(&Organization::default())
            .merge(caller(r#"{ "devDeps": ["prettier", "zod"] }"#));
        let dev_deps = merged.dev_deps.unwrap();
        assert_eq!(dev_deps.first().map(String::as_str), Some("esbuild"));
        assert_eq!(dev_deps.last().map(String::as_str), Some("zod"));
        assert_eq!(dev_deps.iter().filter(|d| *d == "prettier").count(), 1);
    }

    #[test]
    fn prettier_options_merge_deeply() {
        let merged = TypeScriptProjectOptions::organization_defaults(&Organization::default())
            .merge(caller(r#"{ "prettierOptions": { "printWidth": 100 } }"#));
        assert_eq!(
            merged.prettier_options,
            Some(json!({ "printWidth": 100, "singleQuote": true, "trailingComma": "all" }))
        );
    }

    #[test]
    fn absent_caller_fields_keep_defaults() {
        let defaults = TypeScriptProjectOptions::organization_defaults(&Organization::default());
        let merged = defaults.clone().merge(TypeScriptProjectOptions::default());
        assert_eq!(merged, defaults);
    }

    #[test]
    fn overrides_merge_per_path() {
        let base = caller(r#"{ "overrides": { "codecov.yml": { "coverage": { "precision": 2 } } } }"#);
        let overlay = caller(r#"{ "overrides": { "codecov.yml": { "coverage": { "round": "up" } } } }"#);
        let merged = base.merge(overlay);
        let doc = merged.override_for("codecov.yml").unwrap();
        assert_eq!(doc["coverage"]["precision"], YamlValue::from(2));
        assert_eq!(doc["coverage"]["round"], YamlValue::from("up"));
        assert!(merged.override_for("renovate.json5").is_none());
    }

    #[test]
    fn bootstrap_steps_convert_to_run_steps() {
        let step = Step::from(&Organization::default().packages_auth_step());
        assert_eq!(step.display_name(), Some("GitHub Packages authorization"));
        assert!(step.script().unwrap().contains("_authToken"));
    }
}
