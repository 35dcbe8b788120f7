//! Option file loader.
//!
//! Reads archetype option layers from disk. The format is chosen by file
//! extension:
//!
//! | Extension       | Format |
//! |-----------------|--------|
//! | `.toml`         | TOML   |
//! | `.yaml`, `.yml` | YAML   |
//! | `.json`         | JSON   |
//!
//! Keys are the camelCase option names in every format, e.g.
//!
//! ```toml
//! name = "payments"
//! serviceName = "payments"
//! buildArchitectures = ["arm64", "amd64"]
//!
//! [deployWorkflowOptions]
//! deployToProd = false
//! ```
//!
//! Layers are merged left to right with each options type's `Merge` rules,
//! so later files win field by field.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use rigging_core::{
    application::ApplicationError,
    domain::{ArchetypeKind, ArchetypeOptions, Merge, merge::merge_layers},
    error::RiggingResult,
};

/// Supported option file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsFormat {
    Toml,
    Yaml,
    Json,
}

impl OptionsFormat {
    /// Pick the format from `path`'s extension (case-insensitive).
    pub fn from_path(path: &Path) -> RiggingResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ApplicationError::UnsupportedOptionsFormat {
                path: path.to_path_buf(),
                extension,
            }
            .into()),
        }
    }

    /// Deserialize `raw` in this format.
    pub fn parse<T: DeserializeOwned>(self, raw: &str) -> Result<T, String> {
        match self {
            Self::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for OptionsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        })
    }
}

/// Loads typed option layers from files.
#[derive(Debug, Clone, Default)]
pub struct OptionsLoader {
    base_dir: Option<PathBuf>,
}

impl OptionsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir` instead of the working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Load one layer.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> RiggingResult<T> {
        let path = self.resolve(path.as_ref());
        let format = OptionsFormat::from_path(&path)?;

        if !path.is_file() {
            return Err(ApplicationError::OptionsNotFound { path }.into());
        }

        let raw = fs::read_to_string(&path).map_err(|e| ApplicationError::OptionsLoadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let layer = format
            .parse(&raw)
            .map_err(|reason| ApplicationError::OptionsLoadFailed {
                path: path.clone(),
                reason,
            })?;
        debug!(%format, "Loaded options layer");
        Ok(layer)
    }

    /// Load every layer in order and merge them. No paths yields `T::default()`.
    pub fn load_layers<T, I, P>(&self, paths: I) -> RiggingResult<T>
    where
        T: DeserializeOwned + Merge + Default,
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let layers = paths
            .into_iter()
            .map(|path| self.load::<T>(path))
            .collect::<RiggingResult<Vec<T>>>()?;
        Ok(merge_layers(layers))
    }

    /// Load merged options for one archetype.
    pub fn load_archetype<I, P>(&self, kind: ArchetypeKind, paths: I) -> RiggingResult<ArchetypeOptions>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Ok(match kind {
            ArchetypeKind::TypeScript => ArchetypeOptions::TypeScript(self.load_layers(paths)?),
            ArchetypeKind::Cdk => ArchetypeOptions::Cdk(self.load_layers(paths)?),
            ArchetypeKind::EcsService => ArchetypeOptions::EcsService(self.load_layers(paths)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_core::{
        domain::{EcsServiceOptions, TypeScriptProjectOptions},
        error::RiggingError,
    };
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(OptionsFormat::from_path(Path::new("a.toml")).unwrap(), OptionsFormat::Toml);
        assert_eq!(OptionsFormat::from_path(Path::new("a.YML")).unwrap(), OptionsFormat::Yaml);
        assert_eq!(OptionsFormat::from_path(Path::new("a.json")).unwrap(), OptionsFormat::Json);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = OptionsFormat::from_path(Path::new("options.ini")).unwrap_err();
        assert!(matches!(
            err,
            RiggingError::Application(ApplicationError::UnsupportedOptionsFormat { ref extension, .. })
                if extension == "ini"
        ));
    }

    #[test]
    fn same_options_in_every_format() {
        let dir = TempDir::new().unwrap();
        let toml = write(&dir, "a.toml", "name = \"widget\"\ndevDeps = [\"zod\"]\n");
        let yaml = write(&dir, "a.yaml", "name: widget\ndevDeps:\n  - zod\n");
        let json = write(&dir, "a.json", r#"{ "name": "widget", "devDeps": ["zod"] }"#);

        let loader = OptionsLoader::new();
        let from_toml: TypeScriptProjectOptions = loader.load(&toml).unwrap();
        let from_yaml: TypeScriptProjectOptions = loader.load(&yaml).unwrap();
        let from_json: TypeScriptProjectOptions = loader.load(&json).unwrap();

        assert_eq!(from_toml.name.as_deref(), Some("widget"));
        assert_eq!(from_toml, from_yaml);
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = OptionsLoader::new()
            .load::<TypeScriptProjectOptions>(dir.path().join("nope.toml"))
            .unwrap_err();
        assert!(matches!(
            err,
            RiggingError::Application(ApplicationError::OptionsNotFound { .. })
        ));
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.json", "{ \"name\": ");
        let err = OptionsLoader::new()
            .load::<TypeScriptProjectOptions>(&path)
            .unwrap_err();
        assert!(matches!(
            err,
            RiggingError::Application(ApplicationError::OptionsLoadFailed { .. })
        ));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn later_layers_win_and_lists_append() {
        let dir = TempDir::new().unwrap();
        write(&dir, "base.yaml", "name: widget\ndeps: [zod]\nworkflowNodeVersion: '18'\n");
        write(&dir, "local.json", r#"{ "deps": ["yaml"], "workflowNodeVersion": "20" }"#);

        let merged: TypeScriptProjectOptions = OptionsLoader::new()
            .with_base_dir(dir.path())
            .load_layers(["base.yaml", "local.json"])
            .unwrap();

        assert_eq!(merged.name.as_deref(), Some("widget"));
        assert_eq!(merged.workflow_node_version.as_deref(), Some("20"));
        assert_eq!(merged.deps, Some(vec!["zod".to_string(), "yaml".to_string()]));
    }

    #[test]
    fn archetype_layers_deserialize_into_the_right_options() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "service.toml",
            "name = \"payments\"\nserviceName = \"payments\"\nbuildArchitectures = [\"amd64\"]\n",
        );

        let options = OptionsLoader::new()
            .load_archetype(ArchetypeKind::EcsService, [&path])
            .unwrap();
        assert_eq!(options.kind(), ArchetypeKind::EcsService);

        let ArchetypeOptions::EcsService(EcsServiceOptions {
            service_name,
            build_architectures,
            ..
        }) = options
        else {
            panic!("expected ECS options");
        };
        assert_eq!(service_name.as_deref(), Some("payments"));
        assert_eq!(build_architectures.map(|a| a.len()), Some(1));
    }

    #[test]
    fn no_layers_means_defaults() {
        let options = OptionsLoader::new()
            .load_archetype(ArchetypeKind::Cdk, Vec::<PathBuf>::new())
            .unwrap();
        assert_eq!(options, ArchetypeOptions::empty(ArchetypeKind::Cdk));
    }
}
