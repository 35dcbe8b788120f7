//! Node toolchain pins: `.nvmrc` and pnpm settings.

use serde_json::json;

use crate::domain::{
    error::DomainError,
    parameters::{NODE_VERSION, PNPM_VERSION},
    project::{GeneratedFile, PackageManager, Project},
};

pub const NVMRC_PATH: &str = ".nvmrc";

/// Pin the local Node.js version. Falls back to [`NODE_VERSION`].
pub fn add_node_version_file(
    project: &mut Project,
    node_version: Option<&str>,
) -> Result<(), DomainError> {
    let version = node_version.unwrap_or(NODE_VERSION);
    project.add_file(GeneratedFile::text(NVMRC_PATH, format!("{version}\n"))?)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnpmConfigOptions {
    /// Written as `use-node-version`; defaults to [`NODE_VERSION`].
    pub workflow_node_version: Option<String>,
    /// Hoist `node_modules` so bundled dependencies resolve.
    pub for_library: bool,
}

/// Configure pnpm. Does nothing for other package managers.
pub fn add_pnpm_config(project: &mut Project, options: &PnpmConfigOptions) {
    if project.package_manager() != PackageManager::Pnpm {
        return;
    }

    let manifest = project.manifest_mut();
    manifest.add_field("packageManager", json!(format!("pnpm@{PNPM_VERSION}")));
    // Dependencies with install scripts must be listed explicitly.
    manifest.add_field(
        "pnpm",
        json!({ "onlyBuiltDependencies": ["esbuild", "unrs-resolver"] }),
    );

    let node_version = options
        .workflow_node_version
        .as_deref()
        .unwrap_or(NODE_VERSION)
        .to_string();
    let npmrc = project.npmrc_mut();
    npmrc.add_config("package-manager-strict", "false");
    npmrc.add_config("manage-package-manager-versions", "true");
    npmrc.add_config("use-node-version", node_version);
    if options.for_library {
        npmrc.add_config("node-linker", "hoisted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::ProjectOptions;

    fn project(pm: PackageManager) -> Project {
        let mut options = ProjectOptions::new("@time-loop/widget");
        options.package_manager = pm;
        Project::new(options).unwrap()
    }

    #[test]
    fn nvmrc_defaults_to_pinned_version() {
        let mut project = project(PackageManager::Pnpm);
        add_node_version_file(&mut project, None).unwrap();
        let structure = project.synth("/tmp/widget").unwrap();
        assert_eq!(structure.file(".nvmrc").unwrap().content, "22.13.1\n");
    }

    #[test]
    fn nvmrc_uses_explicit_version() {
        let mut project = project(PackageManager::Pnpm);
        add_node_version_file(&mut project, Some("16")).unwrap();
        let structure = project.synth("/tmp/widget").unwrap();
        assert_eq!(structure.file(".nvmrc").unwrap().content, "16\n");
    }

    #[test]
    fn pnpm_settings_land_in_manifest_and_npmrc() {
        let mut project = project(PackageManager::Pnpm);
        add_pnpm_config(
            &mut project,
            &PnpmConfigOptions {
                workflow_node_version: Some("20.1.0".into()),
                for_library: true,
            },
        );
        assert_eq!(
            project.manifest().field("packageManager"),
            Some(&json!("pnpm@9.15.5"))
        );
        assert_eq!(project.npmrc().get("use-node-version"), Some("20.1.0"));
        assert_eq!(project.npmrc().get("node-linker"), Some("hoisted"));
    }

    #[test]
    fn other_package_managers_are_untouched() {
        let mut project = project(PackageManager::Yarn);
        add_pnpm_config(&mut project, &PnpmConfigOptions::default());
        assert!(project.manifest().field("packageManager").is_none());
        assert!(project.npmrc().get("use-node-version").is_none());
    }
}
