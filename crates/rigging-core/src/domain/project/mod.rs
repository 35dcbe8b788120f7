//! In-memory project handle.
//!
//! Archetypes and generators attach files, tasks, manifest fields and
//! pipeline jobs to a [`Project`]. Nothing touches the disk here:
//! [`Project::synth`] renders everything into a [`ProjectStructure`] that
//! the synth service materializes.

mod files;
mod manifest;
mod pipelines;
mod structure;
mod tasks;

pub use files::{FileContent, GENERATED_MARKER, GeneratedFile};
pub use manifest::{
    Author, DependencyKind, DependencySpec, Npmrc, PackageManager, PackageManifest, PublishConfig,
};
pub use pipelines::{BuildWorkflow, Release};
pub(crate) use pipelines::setup_steps;
pub use structure::{FileToWrite, ProjectStructure, WritePolicy};
pub use tasks::{Task, TaskStep, Tasks};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{Value as JsonValue, json};
use serde_yaml::Value as YamlValue;
use tracing::debug;

use super::{
    error::DomainError,
    parameters::{MIN_ENGINE_NODE_VERSION, NODE_VERSION},
    workflow::{Step, Workflow},
};

/// Fully resolved options for the base project.
///
/// Archetypes produce this after merging their option layers; every field
/// here is final.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
    /// Package name, already scope-normalized.
    pub name: String,
    pub description: Option<String>,
    pub author: Author,
    /// SPDX identifier; `None` renders `UNLICENSED`.
    pub license: Option<String>,
    pub package_manager: PackageManager,
    pub min_node_version: String,
    pub workflow_node_version: String,
    pub registry: String,
    pub release: bool,
    pub release_to_npm: bool,
    pub bootstrap_steps: Vec<Step>,
    /// `.prettierrc.json` settings; `None` disables prettier.
    pub prettier: Option<JsonValue>,
    /// `jest` manifest field.
    pub jest_config: Option<JsonValue>,
    pub deps: Vec<String>,
    pub dev_deps: Vec<String>,
    pub peer_deps: Vec<String>,
    pub gitignore: Vec<String>,
    pub srcdir: String,
    pub testdir: String,
}

impl ProjectOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            author: Author {
                name: String::new(),
                email: None,
                organization: false,
            },
            license: None,
            package_manager: PackageManager::default(),
            min_node_version: MIN_ENGINE_NODE_VERSION.into(),
            workflow_node_version: NODE_VERSION.into(),
            registry: "https://registry.npmjs.org".into(),
            release: true,
            release_to_npm: false,
            bootstrap_steps: Vec::new(),
            prettier: None,
            jest_config: None,
            deps: Vec::new(),
            dev_deps: Vec::new(),
            peer_deps: Vec::new(),
            gitignore: Vec::new(),
            srcdir: "src".into(),
            testdir: "test".into(),
        }
    }

    /// `@scope` of the package name, if any.
    pub fn scope(&self) -> Option<&str> {
        if !self.name.starts_with('@') {
            return None;
        }
        self.name.split_once('/').map(|(scope, _)| scope)
    }
}

const DEFAULT_GITIGNORE: &[&str] = &[
    "node_modules/",
    "lib/",
    "dist/",
    "coverage/",
    "test-reports/",
    "junit.xml",
    "*.tsbuildinfo",
    ".DS_Store",
    ".env",
];

pub const TASKS_PATH: &str = ".rigging/tasks.json";

#[derive(Debug, Clone)]
pub struct Project {
    options: ProjectOptions,
    manifest: PackageManifest,
    npmrc: Npmrc,
    tasks: Tasks,
    build: BuildWorkflow,
    release: Option<Release>,
    gitignore: Vec<String>,
    files: BTreeMap<String, GeneratedFile>,
}

impl Project {
    pub fn new(options: ProjectOptions) -> Result<Self, DomainError> {
        if options.name.trim().is_empty() {
            return Err(DomainError::MissingRequiredField { field: "name" });
        }

        let mut manifest = PackageManifest::new(options.name.clone(), options.author.clone());
        manifest.description = options.description.clone();
        if let Some(license) = &options.license {
            manifest.license = license.clone();
        }
        manifest
            .engines
            .insert("node".into(), format!(">= {}", options.min_node_version));
        manifest.add_deps(DependencyKind::Runtime, &options.deps);
        manifest.add_deps(DependencyKind::Peer, &options.peer_deps);
        manifest.add_dev_deps(&["typescript", "jest", "ts-jest", "@types/jest", "@types/node"]);
        manifest.add_dev_deps(&options.dev_deps);
        if let Some(jest) = &options.jest_config {
            manifest.add_field("jest", jest.clone());
        }
        if options.release_to_npm {
            manifest.publish_config = Some(PublishConfig {
                registry: options.registry.clone(),
            });
        }

        let mut npmrc = Npmrc::default();
        if let Some(scope) = options.scope() {
            if options.registry.contains("npm.pkg.github.com") {
                npmrc.add_config(
                    format!("{scope}:registry"),
                    "https://npm.pkg.github.com/",
                );
            }
        }

        let mut gitignore: Vec<String> = DEFAULT_GITIGNORE.iter().map(|p| p.to_string()).collect();
        for pattern in &options.gitignore {
            if !gitignore.contains(pattern) {
                gitignore.push(pattern.clone());
            }
        }

        let build = BuildWorkflow::new(&options)?;
        let release = if options.release {
            Some(Release::new(&options)?)
        } else {
            None
        };

        Ok(Self {
            tasks: Tasks::standard(options.package_manager),
            options,
            manifest,
            npmrc,
            build,
            release,
            gitignore,
            files: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn srcdir(&self) -> &str {
        &self.options.srcdir
    }

    pub fn testdir(&self) -> &str {
        &self.options.testdir
    }

    pub fn package_manager(&self) -> PackageManager {
        self.options.package_manager
    }

    /// Attach a file. Two components may not claim the same path.
    pub fn add_file(&mut self, file: GeneratedFile) -> Result<(), DomainError> {
        let key = file.path().to_slash();
        if self.files.contains_key(&key) || self.is_builtin_path(&key) {
            return Err(DomainError::DuplicatePath { path: key });
        }
        debug!(path = %key, "Attached file");
        self.files.insert(key, file);
        Ok(())
    }

    /// Render `workflow`, apply `overrides`, and attach it at `path`.
    pub fn add_workflow(
        &mut self,
        path: &str,
        workflow: &Workflow,
        overrides: Option<&YamlValue>,
    ) -> Result<(), DomainError> {
        let value = workflow.to_value(overrides)?;
        self.add_file(GeneratedFile::yaml(path, value)?)
    }

    pub fn try_find_file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.get(path)
    }

    pub fn try_find_file_mut(&mut self, path: &str) -> Option<&mut GeneratedFile> {
        self.files.get_mut(path)
    }

    pub fn add_task(&mut self, task: Task) -> Result<&mut Task, DomainError> {
        self.tasks.add_task(task)
    }

    pub fn tasks(&self) -> &Tasks {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut Tasks {
        &mut self.tasks
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut PackageManifest {
        &mut self.manifest
    }

    pub fn npmrc(&self) -> &Npmrc {
        &self.npmrc
    }

    pub fn npmrc_mut(&mut self) -> &mut Npmrc {
        &mut self.npmrc
    }

    pub fn add_gitignore(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.gitignore.contains(&pattern) {
            self.gitignore.push(pattern);
        }
    }

    pub fn build_workflow(&self) -> &BuildWorkflow {
        &self.build
    }

    pub fn build_workflow_mut(&mut self) -> &mut BuildWorkflow {
        &mut self.build
    }

    pub fn release(&self) -> Option<&Release> {
        self.release.as_ref()
    }

    /// `None` when releases are disabled; release jobs are then skipped.
    pub fn release_mut(&mut self) -> Option<&mut Release> {
        self.release.as_mut()
    }

    fn is_builtin_path(&self, path: &str) -> bool {
        matches!(
            path,
            "package.json" | ".npmrc" | ".gitignore" | "tsconfig.json" | TASKS_PATH
        ) || path == BuildWorkflow::PATH
            || (self.release.is_some() && path == Release::PATH)
            || (self.options.prettier.is_some() && path == ".prettierrc.json")
    }

    fn builtin_files(&self) -> Result<Vec<GeneratedFile>, DomainError> {
        let pm = self.options.package_manager;
        let mut manifest = self.manifest.clone();
        manifest.scripts = self.tasks.scripts(pm);
        let manifest = serde_json::to_value(&manifest).map_err(|e| DomainError::RenderFailed {
            path: "package.json".into(),
            reason: e.to_string(),
        })?;

        let tasks = serde_json::to_value(&self.tasks).map_err(|e| DomainError::RenderFailed {
            path: TASKS_PATH.into(),
            reason: e.to_string(),
        })?;

        let mut files = vec![
            GeneratedFile::json("package.json", manifest)?,
            GeneratedFile::lines(".gitignore", self.gitignore.iter().cloned())?,
            GeneratedFile::json("tsconfig.json", self.tsconfig())?,
            GeneratedFile::json(TASKS_PATH, tasks)?,
            GeneratedFile::yaml(BuildWorkflow::PATH, self.build.workflow().to_value(None)?)?,
        ];
        if !self.npmrc.lines().is_empty() {
            files.push(GeneratedFile::lines(".npmrc", self.npmrc.lines())?);
        }
        if let Some(release) = &self.release {
            files.push(GeneratedFile::yaml(
                Release::PATH,
                release.workflow().to_value(None)?,
            )?);
        }
        if let Some(settings) = &self.options.prettier {
            files.push(GeneratedFile::json(".prettierrc.json", settings.clone())?);
        }
        Ok(files)
    }

    fn tsconfig(&self) -> JsonValue {
        json!({
            "compilerOptions": {
                "rootDir": self.options.srcdir,
                "outDir": "lib",
                "alwaysStrict": true,
                "declaration": true,
                "esModuleInterop": true,
                "experimentalDecorators": true,
                "inlineSourceMap": true,
                "inlineSources": true,
                "lib": ["es2020"],
                "module": "CommonJS",
                "noEmitOnError": false,
                "noFallthroughCasesInSwitch": true,
                "noImplicitAny": true,
                "noImplicitReturns": true,
                "noImplicitThis": true,
                "noUnusedLocals": true,
                "noUnusedParameters": true,
                "resolveJsonModule": true,
                "strict": true,
                "strictNullChecks": true,
                "strictPropertyInitialization": true,
                "stripInternal": true,
                "target": "ES2020"
            },
            "include": [format!("{}/**/*.ts", self.options.srcdir)],
            "exclude": ["node_modules", "lib"]
        })
    }

    /// Render every file, sorted by path. Pure: the same project always
    /// yields the same structure.
    pub fn synth(&self, root: impl Into<PathBuf>) -> Result<ProjectStructure, DomainError> {
        self.tasks.validate()?;

        let mut rendered: BTreeMap<String, &GeneratedFile> = BTreeMap::new();
        let builtins = self.builtin_files()?;
        for file in builtins.iter().chain(self.files.values()) {
            let key = file.path().to_slash();
            if rendered.insert(key.clone(), file).is_some() {
                return Err(DomainError::DuplicatePath { path: key });
            }
        }

        let mut structure = ProjectStructure::new(root);
        for (path, file) in rendered {
            structure.add_file(path, file.render()?, file.mode(), file.policy());
        }
        structure.validate()?;
        Ok(structure)
    }
}
