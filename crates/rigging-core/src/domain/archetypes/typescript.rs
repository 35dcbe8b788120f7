//! The organization's TypeScript project.

use tracing::{debug, instrument};

use crate::domain::{
    error::DomainError,
    generators::{
        add_to_project, codecov, codecov_bypass, codeql, datadog, github_settings,
        node::{self, PnpmConfigOptions},
        renovate, semgrep, service_catalog, slack, update_projen,
    },
    merge::Merge,
    naming::normalize_name,
    project::{Author, GeneratedFile, Project, ProjectOptions},
    workflow::Step,
};

use super::{
    docgen,
    options::TypeScriptProjectOptions,
    organization::Organization,
};

/// How the project is consumed; libraries hoist `node_modules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    Library,
    Application,
}

/// A TypeScript project with the organization's descriptors attached.
#[derive(Debug, Clone)]
pub struct TypeScriptProject {
    project: Project,
}

impl TypeScriptProject {
    /// Merge `options` over the organization defaults and build the project.
    pub fn new(org: &Organization, options: TypeScriptProjectOptions) -> Result<Self, DomainError> {
        let merged = TypeScriptProjectOptions::organization_defaults(org).merge(options);
        let mut project = build(org, &merged, Flavor::Library)?;
        add_sample_code(&mut project)?;
        Ok(Self { project })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }
}

const INDEX_SAMPLE: &str = "export class Hello {
  public sayHello() {
    return 'hello, world!';
  }
}
";

const HELLO_TEST_SAMPLE: &str = "import { Hello } from '../src';

test('hello', () => {
  expect(new Hello().sayHello()).toBe('hello, world!');
});
";

/// Starter source and test, written once and then owned by the user.
fn add_sample_code(project: &mut Project) -> Result<(), DomainError> {
    let index = format!("{}/index.ts", project.srcdir());
    let test = format!("{}/hello.test.ts", project.testdir());
    project.add_file(GeneratedFile::sample(&index, INDEX_SAMPLE)?)?;
    project.add_file(GeneratedFile::sample(&test, HELLO_TEST_SAMPLE)?)
}

/// Build and decorate a project from fully merged options.
#[instrument(skip_all, fields(name = options.name.as_deref().unwrap_or_default()))]
pub(crate) fn build(
    org: &Organization,
    options: &TypeScriptProjectOptions,
    flavor: Flavor,
) -> Result<Project, DomainError> {
    if options.docgen_options.is_some() && options.docgen != Some(true) {
        return Err(DomainError::DocgenOptionsWithoutDocgen);
    }
    let mut project = Project::new(project_options(org, options)?)?;
    attach_descriptors(&mut project, options, flavor)?;
    debug!(name = project.name(), "Built TypeScript project");
    Ok(project)
}

/// Resolve the merged option layers into the base project's options.
pub(crate) fn project_options(
    org: &Organization,
    options: &TypeScriptProjectOptions,
) -> Result<ProjectOptions, DomainError> {
    let raw = options
        .name
        .as_deref()
        .ok_or(DomainError::MissingRequiredField { field: "name" })?;
    let mut resolved = ProjectOptions::new(normalize_name(raw, &org.scope)?);

    resolved.description = options.description.clone();
    resolved.author = Author {
        name: options.author_name.clone().unwrap_or_default(),
        email: options.author_email.clone(),
        organization: options.author_organization.unwrap_or(false),
    };
    if options.licensed.unwrap_or(true) {
        resolved.license = Some(
            options
                .license
                .clone()
                .unwrap_or_else(|| "Apache-2.0".into()),
        );
    }
    if let Some(pm) = options.package_manager {
        resolved.package_manager = pm;
    }
    if let Some(version) = &options.min_node_version {
        resolved.min_node_version = version.clone();
    }
    if let Some(version) = &options.workflow_node_version {
        resolved.workflow_node_version = version.clone();
    }
    if let Some(registry) = &options.npm_registry_url {
        resolved.registry = registry.clone();
    }
    resolved.release = options.release.unwrap_or(true);
    resolved.release_to_npm = options.release_to_npm.unwrap_or(false);
    resolved.bootstrap_steps = options
        .workflow_bootstrap_steps
        .iter()
        .flatten()
        .map(Step::from)
        .collect();

    if options.prettier.unwrap_or(false) {
        resolved.prettier = Some(
            options
                .prettier_options
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
        );
    }
    resolved.jest_config = options.jest_config.clone();

    resolved.deps = options.deps.clone().unwrap_or_default();
    resolved.dev_deps = options.dev_deps.clone().unwrap_or_default();
    resolved.peer_deps = options.peer_deps.clone().unwrap_or_default();
    resolved.gitignore = options.gitignore.clone().unwrap_or_default();
    if let Some(srcdir) = &options.srcdir {
        resolved.srcdir = srcdir.clone();
    }
    if let Some(testdir) = &options.testdir {
        resolved.testdir = testdir.clone();
    }
    Ok(resolved)
}

fn attach_descriptors(
    project: &mut Project,
    options: &TypeScriptProjectOptions,
    flavor: Flavor,
) -> Result<(), DomainError> {
    let node_version = project.options().workflow_node_version.clone();
    node::add_node_version_file(project, Some(&node_version))?;
    node::add_pnpm_config(
        project,
        &PnpmConfigOptions {
            workflow_node_version: Some(node_version),
            for_library: flavor == Flavor::Library,
        },
    );

    renovate::add_renovate_workflow(project, options.override_for(renovate::WORKFLOW_PATH))?;
    renovate::add_renovate_config(
        project,
        &options.renovate_options_config.clone().unwrap_or_default(),
    )?;

    if options.code_cov.unwrap_or(false) {
        codecov::add_codecov_config(project, options.override_for(codecov::PATH))?;
        let secret = options
            .code_cov_token_secret
            .as_deref()
            .unwrap_or(codecov::DEFAULT_TOKEN_SECRET);
        codecov::add_coverage_upload(project, secret)?;
    }

    github_settings::add_github_settings(project, options.override_for(github_settings::PATH))?;
    semgrep::add_semgrep_workflow(project, options.override_for(semgrep::PATH))?;
    update_projen::add_update_projen_workflows(
        project,
        options.override_for(update_projen::ADD_TO_PROJECT_PATH),
    )?;
    codecov_bypass::add_codecov_bypass_workflow(
        project,
        &options.codecov_bypass_options.clone().unwrap_or_default(),
        options.override_for(codecov_bypass::PATH),
    )?;

    if options.codeql.unwrap_or(false) {
        codeql::add_codeql_workflow(project, options.override_for(codeql::PATH))?;
    }
    if options.add_to_project.unwrap_or(false) {
        add_to_project::add_add_to_project_workflow(
            project,
            options.override_for(add_to_project::PATH),
        )?;
    }
    if options.slack_alert.unwrap_or(true) {
        slack::add_slack_alert(
            project,
            &options.slack_alert_options.clone().unwrap_or_default(),
        )?;
    }
    if options.send_release_event.unwrap_or(false) {
        datadog::add_release_event(
            project,
            &options.release_event_options.clone().unwrap_or_default(),
        )?;
    }
    if let Some(catalog) = &options.service_catalog_options {
        service_catalog::add_service_catalog(project, catalog)?;
    }

    docgen::add_docgen(
        project,
        options.docgen.unwrap_or(false),
        options.docgen_options.as_ref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::FileContent;

    fn options(json: &str) -> TypeScriptProjectOptions {
        serde_json::from_str(json).unwrap()
    }

    fn widget() -> Project {
        TypeScriptProject::new(&Organization::default(), options(r#"{ "name": "widget" }"#))
            .unwrap()
            .into_project()
    }

    #[test]
    fn name_is_required() {
        let err = TypeScriptProject::new(&Organization::default(), TypeScriptProjectOptions::default())
            .unwrap_err();
        assert_eq!(err, DomainError::MissingRequiredField { field: "name" });
    }

    #[test]
    fn bare_name_gets_organization_scope() {
        assert_eq!(widget().name(), "@time-loop/widget");
    }

    #[test]
    fn sample_code_is_written_once() {
        let structure = widget().synth("/tmp/widget").unwrap();
        for path in ["src/index.ts", "test/hello.test.ts"] {
            assert!(structure.file(path).unwrap().is_sample(), "{path}");
        }
    }

    #[test]
    fn default_descriptors_are_attached() {
        let project = widget();
        for path in [
            node::NVMRC_PATH,
            codecov::PATH,
            renovate::CONFIG_PATH,
            renovate::WORKFLOW_PATH,
            github_settings::PATH,
            semgrep::PATH,
            update_projen::UPGRADE_PATH,
            update_projen::ADD_TO_PROJECT_PATH,
            codecov_bypass::PATH,
        ] {
            assert!(project.try_find_file(path).is_some(), "{path} missing");
        }
        for path in [codeql::PATH, add_to_project::PATH] {
            assert!(project.try_find_file(path).is_none(), "{path} unexpected");
        }
    }

    #[test]
    fn release_carries_slack_and_coverage_jobs() {
        let project = widget();
        let release = project.release().unwrap().workflow();
        assert!(release.job(slack::JOB_ID).is_some());
        assert!(release.job(codecov::UPLOAD_JOB_ID).is_some());
        assert!(release.job(datadog::JOB_ID).is_none());
    }

    #[test]
    fn organization_defaults_reach_the_manifest() {
        let project = widget();
        let manifest = project.manifest();
        assert_eq!(manifest.license, "UNLICENSED");
        assert!(manifest.has_dependency("jsii-release"));
        assert_eq!(
            manifest.field("jest"),
            Some(&serde_json::json!({ "collectCoverageFrom": ["src/**/*.ts"] }))
        );
        assert_eq!(project.npmrc().get("node-linker"), Some("hoisted"));
    }

    #[test]
    fn optional_workflows_follow_flags() {
        let project = TypeScriptProject::new(
            &Organization::default(),
            options(r#"{ "name": "widget", "codeql": true, "addToProject": true, "slackAlert": false }"#),
        )
        .unwrap()
        .into_project();
        assert!(project.try_find_file(codeql::PATH).is_some());
        assert!(project.try_find_file(add_to_project::PATH).is_some());
        assert!(project.release().unwrap().workflow().job(slack::JOB_ID).is_none());
    }

    #[test]
    fn overrides_apply_to_their_path() {
        let project = TypeScriptProject::new(
            &Organization::default(),
            options(
                r#"{ "name": "widget", "overrides": { "codecov.yml": { "coverage": { "status": { "project": { "default": { "threshold": "5%" } } } } } } }"#,
            ),
        )
        .unwrap()
        .into_project();
        let Some(FileContent::Yaml(doc)) = project.try_find_file(codecov::PATH).map(|f| f.content())
        else {
            panic!("codecov.yml missing");
        };
        let default = &doc["coverage"]["status"]["project"]["default"];
        assert_eq!(default["threshold"], serde_yaml::Value::from("5%"));
    }

    #[test]
    fn docgen_options_need_docgen() {
        let err = TypeScriptProject::new(
            &Organization::default(),
            options(r#"{ "name": "widget", "docgenOptions": { "html": true } }"#),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::DocgenOptionsWithoutDocgen);
    }

    #[test]
    fn same_options_synthesize_identically() {
        let first = widget().synth("/tmp/widget").unwrap();
        let second = widget().synth("/tmp/widget").unwrap();
        assert_eq!(first, second);
    }
}
