//! CDK application archetype.

use serde::Deserialize;
use serde_json::json;

use crate::domain::{
    error::DomainError,
    generators::{
        cdk_context::{self, CdkContextOptions},
        cdk_diff::{self, CdkDiffOptions},
    },
    merge::{Merge, merge_by_replacement},
    project::{GeneratedFile, Project, Task},
};

use super::{
    options::TypeScriptProjectOptions,
    organization::Organization,
    typescript::{self, Flavor},
};

merge_by_replacement!(CdkDiffOptions, CdkContextOptions);

/// aws-cdk-lib line the samples are written against.
pub const CDK_VERSION: &str = "2.150.0";
pub const CDK_CONFIG_PATH: &str = "cdk.json";

const README_SAMPLE: &str = include_str!("../../../assets/cdk/README.md");
const MAIN_SAMPLE: &str = include_str!("../../../assets/cdk/src/main.ts");
const WIDGET_SAMPLE: &str = include_str!("../../../assets/cdk/src/widget.ts");
const WIDGET_TEST_SAMPLE: &str = include_str!("../../../assets/cdk/test/widget.test.ts");

/// Runtime dependencies of the sample app.
pub const CDK_DEPS: [&str; 5] = [
    "@time-loop/cdk-library",
    "cdk-constants",
    "cdk-iam-floyd",
    "colors",
    "multi-convention-namer",
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdkAppOptions {
    #[serde(flatten)]
    pub project: TypeScriptProjectOptions,
    pub cdk_version: Option<String>,
    /// Adds the `cdk-diff` workflow when present.
    pub cdk_diff_options: Option<CdkDiffOptions>,
    /// Injects lookup credentials into the build when present.
    pub cdk_context_options: Option<CdkContextOptions>,
}

impl CdkAppOptions {
    pub fn defaults(org: &Organization) -> Self {
        let project = TypeScriptProjectOptions {
            deps: Some(CDK_DEPS.map(String::from).to_vec()),
            send_release_event: Some(true),
            gitignore: Some(vec!["cdk.out/".into(), ".cdk.staging/".into()]),
            ..Default::default()
        };
        Self {
            project: TypeScriptProjectOptions::organization_defaults(org).merge(project),
            cdk_version: Some(CDK_VERSION.into()),
            ..Default::default()
        }
    }
}

impl Merge for CdkAppOptions {
    fn merge(self, overlay: Self) -> Self {
        Self {
            project: self.project.merge(overlay.project),
            cdk_version: self.cdk_version.merge(overlay.cdk_version),
            cdk_diff_options: self.cdk_diff_options.merge(overlay.cdk_diff_options),
            cdk_context_options: self.cdk_context_options.merge(overlay.cdk_context_options),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CdkApp {
    project: Project,
}

impl CdkApp {
    pub fn new(org: &Organization, options: CdkAppOptions) -> Result<Self, DomainError> {
        let options = CdkAppOptions::defaults(org).merge(options);
        let mut project = typescript::build(org, &options.project, Flavor::Application)?;

        let version = options.cdk_version.as_deref().unwrap_or(CDK_VERSION);
        project.manifest_mut().add_dev_deps(&[
            format!("aws-cdk@^{version}"),
            format!("aws-cdk-lib@^{version}"),
            "constructs@^10.0.5".to_string(),
            "ts-node".to_string(),
        ]);
        add_cdk_tasks(&mut project)?;
        add_samples(&mut project)?;

        if let Some(diff) = &options.cdk_diff_options {
            cdk_diff::add_cdk_diff_workflow(
                &mut project,
                diff,
                options.project.override_for(cdk_diff::PATH),
            )?;
        }
        if let Some(context) = &options.cdk_context_options {
            cdk_context::add_cdk_context(&mut project, context)?;
        }
        Ok(Self { project })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }
}

fn add_cdk_tasks(project: &mut Project) -> Result<(), DomainError> {
    let srcdir = project.srcdir().to_string();
    project.add_file(GeneratedFile::json(
        CDK_CONFIG_PATH,
        json!({
            "app": format!("npx ts-node -P tsconfig.json --prefer-ts-exts {srcdir}/main.ts"),
            "output": "cdk.out",
        }),
    )?)?;

    for (name, description) in [
        ("synth", "Synthesizes your cdk app into cdk.out"),
        ("deploy", "Deploys your CDK app to the AWS cloud"),
        ("diff", "Diffs the currently deployed app against your code"),
        ("destroy", "Destroys your cdk app in the AWS cloud"),
    ] {
        project
            .add_task(Task::new(name).described(description))?
            .exec(format!("cdk {name}"));
    }
    Ok(())
}

fn add_samples(project: &mut Project) -> Result<(), DomainError> {
    let srcdir = project.srcdir().to_string();
    let testdir = project.testdir().to_string();
    for (path, contents) in [
        ("README.md".to_string(), README_SAMPLE),
        (format!("{srcdir}/main.ts"), MAIN_SAMPLE),
        (format!("{srcdir}/widget.ts"), WIDGET_SAMPLE),
        (format!("{testdir}/widget.test.ts"), WIDGET_TEST_SAMPLE),
    ] {
        project.add_file(GeneratedFile::sample(&path, contents)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        generators::{codecov, datadog},
        project::WritePolicy,
    };

    fn app(json: &str) -> Project {
        let options: CdkAppOptions = serde_json::from_str(json).unwrap();
        CdkApp::new(&Organization::default(), options)
            .unwrap()
            .into_project()
    }

    #[test]
    fn flattened_options_reach_the_base_project() {
        let project = app(r#"{ "name": "widget", "description": "Widgets" }"#);
        assert_eq!(project.name(), "@time-loop/widget");
        assert_eq!(project.manifest().description.as_deref(), Some("Widgets"));
    }

    #[test]
    fn samples_are_written_once() {
        let project = app(r#"{ "name": "widget" }"#);
        for path in ["README.md", "src/main.ts", "src/widget.ts", "test/widget.test.ts"] {
            let file = project.try_find_file(path).unwrap();
            assert_eq!(file.policy(), WritePolicy::IfMissing, "{path}");
        }
    }

    #[test]
    fn release_event_and_coverage_are_on() {
        let project = app(r#"{ "name": "widget" }"#);
        let release = project.release().unwrap().workflow();
        assert!(release.job(datadog::JOB_ID).is_some());
        assert!(release.job(codecov::UPLOAD_JOB_ID).is_some());
        assert!(project.try_find_file(codecov::PATH).is_some());
    }

    #[test]
    fn cdk_dependencies_are_added() {
        let project = app(r#"{ "name": "widget", "deps": ["zod"] }"#);
        let manifest = project.manifest();
        for dep in CDK_DEPS.iter().chain(&["zod", "aws-cdk-lib", "constructs"]) {
            assert!(manifest.has_dependency(dep), "{dep}");
        }
        assert_eq!(project.npmrc().get("node-linker"), None);
    }

    #[test]
    fn diff_workflow_only_when_configured() {
        let project = app(r#"{ "name": "widget" }"#);
        assert!(project.try_find_file(cdk_diff::PATH).is_none());

        let project = app(
            r#"{ "name": "widget", "cdkDiffOptions": { "envsToDiff": [
                { "name": "qa", "oidcRoleArn": "arn:aws:iam::123456789012:role/diff",
                  "labelToApplyWhenNoDiffPresent": "no-qa-diff", "stackSearchString": "Qa" }
            ] } }"#,
        );
        assert!(project.try_find_file(cdk_diff::PATH).is_some());
        assert!(project.manifest().has_dependency(cdk_diff::LOG_PARSER_PACKAGE));
    }

    #[test]
    fn synth_task_runs_cdk() {
        let project = app(r#"{ "name": "widget" }"#);
        assert!(project.tasks().get("synth").is_some());
        assert!(project.try_find_file(CDK_CONFIG_PATH).is_some());
    }
}
