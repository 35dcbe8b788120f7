//! The organization every generated project belongs to.

use serde::{Deserialize, Serialize};

use crate::domain::generators::{GITHUB_ORG, packages_auth_script};

use super::options::BootstrapStep;

/// Identity stamped into manifests and registry configuration.
///
/// The default is the organization the descriptors were written for; the
/// CLI lets users swap the scope through configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    /// npm scope without the leading `@`.
    pub scope: String,
    pub author_name: String,
    pub author_email: String,
    /// Registry packages are published to.
    pub registry: String,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            scope: GITHUB_ORG.into(),
            author_name: "ClickUp".into(),
            author_email: "devops@clickup.com".into(),
            registry: "https://npm.pkg.github.com".into(),
        }
    }
}

impl Organization {
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into().trim_start_matches('@').to_string();
        self
    }

    /// Registry host without scheme or trailing slash.
    pub fn registry_host(&self) -> &str {
        let host = self
            .registry
            .split_once("://")
            .map_or(self.registry.as_str(), |(_, host)| host);
        host.trim_end_matches('/')
    }

    /// CI step writing an `.npmrc` that can read the organization's
    /// private packages.
    pub fn packages_auth_step(&self) -> BootstrapStep {
        BootstrapStep {
            name: "GitHub Packages authorization".into(),
            run: packages_auth_script(&self.scope, self.registry_host()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_time_loop_on_github_packages() {
        let org = Organization::default();
        assert_eq!(org.scope, "time-loop");
        assert_eq!(org.registry_host(), "npm.pkg.github.com");
    }

    #[test]
    fn scope_loses_leading_at() {
        let org = Organization::default().with_scope("@acme");
        assert_eq!(org.scope, "acme");
    }

    #[test]
    fn auth_step_writes_scoped_registry() {
        let step = Organization::default().with_scope("acme").packages_auth_step();
        assert!(step.run.starts_with("cat > .npmrc <<EOF\n"));
        assert!(step.run.contains("${{ secrets.ALL_PACKAGE_READ_TOKEN }}"));
        assert!(step.run.contains("@acme:registry=https://npm.pkg.github.com/"));
        assert!(step.run.ends_with("\nEOF"));
    }
}
