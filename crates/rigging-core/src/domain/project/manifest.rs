//! `package.json` and `.npmrc` models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Which dependency table a spec lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Runtime,
    Dev,
    Peer,
}

/// `name@range` split into its parts. A scoped name keeps its leading `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub version: Option<String>,
}

impl DependencySpec {
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        // The separator is the last '@' that is not the scope marker.
        match spec.rfind('@') {
            Some(idx) if idx > 0 => Self {
                name: spec[..idx].to_string(),
                version: Some(spec[idx + 1..].to_string()).filter(|v| !v.is_empty()),
            },
            _ => Self {
                name: spec.to_string(),
                version: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    #[default]
    Pnpm,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
        }
    }

    /// Install command used in CI; `frozen` refuses lockfile changes.
    pub fn install_command(&self, frozen: bool) -> &'static str {
        match (self, frozen) {
            (Self::Npm, true) => "npm ci",
            (Self::Npm, false) => "npm install",
            (Self::Yarn, true) => "yarn install --check-files --frozen-lockfile",
            (Self::Yarn, false) => "yarn install --check-files",
            (Self::Pnpm, true) => "pnpm i --frozen-lockfile",
            (Self::Pnpm, false) => "pnpm i --no-frozen-lockfile",
        }
    }

    pub fn run_task(&self, task: &str) -> String {
        format!("{} run {task}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub organization: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishConfig {
    pub registry: String,
}

/// The package manifest. Extra top-level fields go through [`add_field`].
///
/// [`add_field`]: PackageManifest::add_field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scripts: BTreeMap<String, String>,
    pub author: Author,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    pub main: String,
    pub types: String,
    pub license: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_config: Option<PublishConfig>,
    pub engines: BTreeMap<String, String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, JsonValue>,
}

impl PackageManifest {
    pub fn new(name: impl Into<String>, author: Author) -> Self {
        Self {
            name: name.into(),
            description: None,
            scripts: BTreeMap::new(),
            author,
            dev_dependencies: BTreeMap::new(),
            peer_dependencies: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            main: "lib/index.js".into(),
            types: "lib/index.d.ts".into(),
            license: "UNLICENSED".into(),
            version: "0.0.0".into(),
            publish_config: None,
            engines: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn add_deps<S: AsRef<str>>(&mut self, kind: DependencyKind, specs: &[S]) {
        let table = match kind {
            DependencyKind::Runtime => &mut self.dependencies,
            DependencyKind::Dev => &mut self.dev_dependencies,
            DependencyKind::Peer => &mut self.peer_dependencies,
        };
        for spec in specs {
            let spec = DependencySpec::parse(spec.as_ref());
            let version = spec.version.unwrap_or_else(|| "*".into());
            // An explicit range always beats a wildcard added earlier.
            match table.get(&spec.name) {
                Some(existing) if version == "*" && existing != "*" => {}
                _ => {
                    table.insert(spec.name, version);
                }
            }
        }
    }

    pub fn add_dev_deps<S: AsRef<str>>(&mut self, specs: &[S]) {
        self.add_deps(DependencyKind::Dev, specs);
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.peer_dependencies.contains_key(name)
    }

    /// Set an arbitrary top-level field (`packageManager`, `pnpm`, `jest`).
    pub fn add_field(&mut self, key: impl Into<String>, value: JsonValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }
}

/// `.npmrc` as ordered `key=value` lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Npmrc {
    entries: Vec<(String, String)>,
}

impl Npmrc {
    /// Set a key; re-setting keeps the original position.
    pub fn add_config(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }
}
