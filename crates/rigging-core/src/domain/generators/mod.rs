//! Descriptor generators.
//!
//! One module per concern. Each exposes a pure `build_*` function that
//! returns a typed document and an `add_*` function that attaches the
//! result to a [`Project`](super::project::Project), deep-merging an
//! optional override document on top. Generators take their options by
//! reference and never mutate them.

pub mod add_to_project;
pub mod cdk_context;
pub mod cdk_diff;
pub mod codecov;
pub mod codecov_bypass;
pub mod codeql;
pub mod datadog;
pub mod ecs;
pub mod github_settings;
pub mod node;
pub mod renovate;
pub mod semgrep;
pub mod service_catalog;
pub mod slack;
pub mod update_projen;

use serde_yaml::Value as YamlValue;

use super::{
    project::Release,
    workflow::{Step, secret},
};

/// Loosely typed document deep-merged over a generated one.
pub type Overrides<'a> = Option<&'a YamlValue>;

/// GitHub organization that owns generated repositories.
pub const GITHUB_ORG: &str = "time-loop";

/// Bot account that opens dependency and tooling PRs.
pub const BOT_USERNAME: &str = "cu-infra-svc-git";

/// The organization's tooling package, upgraded by its own workflow.
pub const TOOLING_PACKAGE: &str = "@time-loop/clickup-projen";

pub const SECRET_PACKAGE_READ_TOKEN: &str = "ALL_PACKAGE_READ_TOKEN";

pub(crate) fn checkout_step() -> Step {
    Step::uses("Checkout", "actions/checkout@v3")
}

/// Writes an `.npmrc` able to read the organization's private packages.
pub fn github_packages_auth_step() -> Step {
    Step::run(
        "GitHub Packages authorization",
        packages_auth_script(GITHUB_ORG, "npm.pkg.github.com"),
    )
}

/// Heredoc writing an `.npmrc` with the read token for `@scope` on `host`.
pub fn packages_auth_script(scope: &str, host: &str) -> String {
    [
        "cat > .npmrc <<EOF".to_string(),
        format!(
            "//{host}/:_authToken={}",
            secret(SECRET_PACKAGE_READ_TOKEN)
        ),
        format!("@{scope}:registry=https://{host}/"),
        "EOF".to_string(),
    ]
    .join("\n")
}

/// Replace every `<%KEY%>` placeholder in `template`.
pub(crate) fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("<%{key}%>"), value)
    })
}

/// Download the release artifacts and expose the tag as
/// `steps.event_metadata.outputs.release_tag`.
pub(crate) fn version_steps(artifacts_directory: &str) -> [Step; 2] {
    [
        Release::download_step(artifacts_directory),
        Step::run(
            "Get version",
            format!(
                "echo \"release_tag=$(cat {artifacts_directory}/releasetag.txt)\" >> $GITHUB_OUTPUT"
            ),
        )
        .with_id("event_metadata"),
    ]
}
