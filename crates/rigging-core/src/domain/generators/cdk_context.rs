//! Lets the build job refresh `cdk.context.json` by assuming a lookup role.

use serde::Deserialize;

use crate::domain::{
    error::DomainError,
    project::{GeneratedFile, Project},
    workflow::{PermissionLevel, Permissions, Step},
};

use super::{GITHUB_ORG, fill_template};

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_ROLE_DURATION: u32 = 900;

const LOOKUP_ROLE_SAMPLE: &str = include_str!("../../../assets/cdk/oidc/context-lookup-role.ts");

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionOptions {
    /// Account holding the role; bootstrapped with `--trust-for-lookup`.
    pub lookup_account_id: String,
    pub aws_region: Option<String>,
    pub role_duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdkContextOptions {
    #[serde(default)]
    pub create_oidc_role_stack: bool,
    /// Leave the build workflow alone when unset.
    pub injection_options: Option<InjectionOptions>,
}

/// The credentials step placed first in the build job.
pub fn build_credentials_step(project_name: &str, options: &InjectionOptions) -> Result<Step, DomainError> {
    if options.lookup_account_id.trim().is_empty() {
        return Err(DomainError::MissingRequiredField {
            field: "lookupAccountId",
        });
    }
    let step = Step::uses(
        "Configure AWS Credentials",
        "aws-actions/configure-aws-credentials@v2",
    )
    .with_input(
        "aws-region",
        options.aws_region.as_deref().unwrap_or(DEFAULT_REGION),
    )
    .with_input(
        "role-to-assume",
        format!(
            "arn:aws:iam::{}:role/{project_name}-github-actions-role",
            options.lookup_account_id
        ),
    )
    .with_input(
        "role-duration-seconds",
        options.role_duration_seconds.unwrap_or(DEFAULT_ROLE_DURATION),
    );
    Ok(step)
}

pub fn inject_aws_auth_into_build(
    project: &mut Project,
    options: &InjectionOptions,
) -> Result<(), DomainError> {
    let step = build_credentials_step(project.name(), options)?;
    let build = project.build_workflow_mut();
    build.set_build_permissions(Permissions::default().id_token(PermissionLevel::Write))?;
    build.prepend_build_step(step)
}

pub fn add_oidc_role_stack(project: &mut Project) -> Result<(), DomainError> {
    let path = format!(
        "{}/github-actions-oidc-cdk-context-lookup-role.ts",
        project.srcdir()
    );
    let contents = fill_template(
        LOOKUP_ROLE_SAMPLE,
        &[("PROJECT_NAME", project.name()), ("GITHUB_ORG", GITHUB_ORG)],
    );
    project.add_file(GeneratedFile::sample(&path, contents)?)
}

pub fn add_cdk_context(project: &mut Project, options: &CdkContextOptions) -> Result<(), DomainError> {
    if let Some(injection) = &options.injection_options {
        inject_aws_auth_into_build(project, injection)?;
    }
    if options.create_oidc_role_stack {
        add_oidc_role_stack(project)?;
    }
    Ok(())
}
