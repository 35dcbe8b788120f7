//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only sees the [`Organization`] it
//! carries.
//!
//! # Resolution order (highest priority first)
//!
//! 1. `GITHUB_OWNER` (organization scope only)
//! 2. Environment variables prefixed `RIGGING__`, e.g.
//!    `RIGGING__ORGANIZATION__SCOPE=acme`
//! 3. Config file (`--config`, or the platform config directory)
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use rigging_core::domain::Organization;

use crate::cli::global::OutputFormat;

/// Environment variable whose value replaces the organization scope.
pub const OWNER_ENV: &str = "GITHUB_OWNER";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Identity stamped into generated projects.
    pub organization: Organization,
    /// Output settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    /// Used when `--output-format` is left at `auto`.
    pub format: OutputFormat,
}

impl AppConfig {
    /// Load configuration, starting from defaults.
    ///
    /// `config_file` is the path passed via `--config` and must exist when
    /// given. Otherwise the default location is read if present.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let (path, required) = match config_file {
            Some(path) => (path.clone(), true),
            None => (Self::config_path(), false),
        };
        let owner = std::env::var(OWNER_ENV).ok();
        Self::load_from(&path, required, owner.as_deref())
    }

    fn load_from(path: &Path, required: bool, owner: Option<&str>) -> anyhow::Result<Self> {
        debug!(path = %path.display(), required, "Loading configuration");

        let settings = Config::builder()
            .add_source(Config::try_from(&Self::default()).context("serializing default configuration")?)
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix("RIGGING")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("reading configuration from {}", path.display()))?;

        let mut config: Self = settings
            .try_deserialize()
            .context("invalid configuration values")?;

        if let Some(owner) = owner.map(str::trim).filter(|owner| !owner.is_empty()) {
            debug!(owner, "Organization scope taken from {OWNER_ENV}");
            config.organization = config.organization.with_scope(owner);
        }

        Ok(config)
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.rigging.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "rigging", "rigging")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".rigging.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn missing(dir: &TempDir) -> PathBuf {
        dir.path().join("absent.toml")
    }

    #[test]
    fn defaults_use_the_builtin_organization() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.organization, Organization::default());
        assert!(!cfg.output.no_color);
        assert_eq!(cfg.output.format, OutputFormat::Auto);
    }

    #[test]
    fn optional_file_may_be_missing() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(&missing(&dir), false, None).unwrap();
        assert_eq!(cfg.organization.scope, Organization::default().scope);
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::load_from(&missing(&dir), true, None).is_err());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[organization]\nscope = \"acme\"\nauthor_name = \"Acme\"\n\n[output]\nno_color = true\nformat = \"json\"\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path, true, None).unwrap();
        assert_eq!(cfg.organization.scope, "acme");
        assert_eq!(cfg.organization.author_name, "Acme");
        assert_eq!(cfg.organization.registry, Organization::default().registry);
        assert!(cfg.output.no_color);
        assert_eq!(cfg.output.format, OutputFormat::Json);
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[output]\nformat = \"fancy\"\n").unwrap();
        assert!(AppConfig::load_from(&path, true, None).is_err());
    }

    #[test]
    fn github_owner_replaces_the_scope() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(&missing(&dir), false, Some("@acme")).unwrap();
        assert_eq!(cfg.organization.scope, "acme");

        let cfg = AppConfig::load_from(&missing(&dir), false, Some("  ")).unwrap();
        assert_eq!(cfg.organization.scope, Organization::default().scope);
    }

    #[test]
    fn config_path_is_not_empty() {
        let p = AppConfig::config_path();
        assert!(!p.as_os_str().is_empty());
    }
}
