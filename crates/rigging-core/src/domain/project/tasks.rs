//! Named task graph rendered to `package.json` scripts and `.rigging/tasks.json`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::error::DomainError;

use super::manifest::PackageManager;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStep {
    /// Run a shell command.
    Exec(String),
    /// Run another task by name.
    Spawn(String),
    /// Print a message.
    Say(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TaskStep>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            env: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn exec(&mut self, command: impl Into<String>) -> &mut Self {
        self.steps.push(TaskStep::Exec(command.into()));
        self
    }

    pub fn spawn(&mut self, task: impl Into<String>) -> &mut Self {
        self.steps.push(TaskStep::Spawn(task.into()));
        self
    }

    pub fn say(&mut self, message: impl Into<String>) -> &mut Self {
        self.steps.push(TaskStep::Say(message.into()));
        self
    }

    pub fn prepend_exec(&mut self, command: impl Into<String>) -> &mut Self {
        self.steps.insert(0, TaskStep::Exec(command.into()));
        self
    }

    pub fn prepend_spawn(&mut self, task: impl Into<String>) -> &mut Self {
        self.steps.insert(0, TaskStep::Spawn(task.into()));
        self
    }

    /// Drop every step, keeping name, description and env.
    pub fn reset(&mut self) -> &mut Self {
        self.steps.clear();
        self
    }

    pub fn steps(&self) -> &[TaskStep] {
        &self.steps
    }

    /// The `package.json` script for this task.
    pub fn script(&self, pm: PackageManager) -> String {
        let commands: Vec<String> = self
            .steps
            .iter()
            .map(|step| match step {
                TaskStep::Exec(cmd) => cmd.clone(),
                TaskStep::Spawn(task) => pm.run_task(task),
                TaskStep::Say(msg) => format!("echo \"{msg}\""),
            })
            .collect();

        if commands.is_empty() {
            return format!("echo \"{}: nothing to do\"", self.name);
        }

        let script = commands.join(" && ");
        if self.env.is_empty() {
            script
        } else {
            let env: Vec<String> = self.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{} {script}", env.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tasks {
    tasks: BTreeMap<String, Task>,
}

impl Tasks {
    /// The standard compile/test/package/release pipeline.
    pub fn standard(pm: PackageManager) -> Self {
        let mut tasks = Self::default();
        let mut add = |task: Task| {
            tasks.tasks.insert(task.name.clone(), task);
        };

        let mut default = Task::new("default").described("Regenerate managed project files");
        default.say("Run `rigging new` with your options file to regenerate managed files");
        add(default);

        add(Task::new("pre-compile").described("Prepare the project for compilation"));

        let mut compile = Task::new("compile").described("Only compile");
        compile.exec("tsc --build");
        add(compile);

        add(Task::new("post-compile").described("Runs after successful compilation"));

        let mut test = Task::new("test").described("Run tests");
        test.exec("jest --passWithNoTests --updateSnapshot");
        add(test);

        let mut package = Task::new("package").described("Creates the distribution package");
        package
            .exec("mkdir -p dist/js")
            .exec(format!("{} pack --pack-destination dist/js", pm.as_str()));
        add(package);

        let mut build = Task::new("build").described("Full release build");
        for step in ["default", "pre-compile", "compile", "post-compile", "test", "package"] {
            build.spawn(step);
        }
        add(build);

        let mut bump = Task::new("bump")
            .described("Bumps version based on latest git tag and generates a changelog entry")
            .with_env("OUTFILE", "package.json")
            .with_env("CHANGELOG", "dist/changelog.md")
            .with_env("BUMPFILE", "dist/version.txt")
            .with_env("RELEASETAG", "dist/releasetag.txt");
        bump.exec("mkdir -p dist")
            .exec("npx commit-and-tag-version --skip.commit --skip.tag --infile dist/changelog.md")
            .exec("node -p \"require('./package.json').version\" > dist/version.txt")
            .exec("node -p \"'v' + require('./package.json').version\" > dist/releasetag.txt");
        add(bump);

        let mut unbump = Task::new("unbump")
            .described("Restores version to 0.0.0")
            .with_env("OUTFILE", "package.json");
        unbump.exec("npm version 0.0.0 --no-git-tag-version --allow-same-version");
        add(unbump);

        let mut release = Task::new("release")
            .described("Prepare a release from \"main\" branch")
            .with_env("RELEASE", "true");
        release
            .spawn("bump")
            .spawn("build")
            .spawn("unbump")
            .exec("git diff --ignore-space-at-eol --exit-code");
        add(release);

        tasks
    }

    pub fn add_task(&mut self, task: Task) -> Result<&mut Task, DomainError> {
        if self.tasks.contains_key(&task.name) {
            return Err(DomainError::DuplicateTask { name: task.name });
        }
        let name = task.name.clone();
        Ok(self.tasks.entry(name).or_insert(task))
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Task, DomainError> {
        self.tasks
            .get_mut(name)
            .ok_or_else(|| DomainError::UnknownTask { name: name.into() })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Every spawned task must exist.
    pub fn validate(&self) -> Result<(), DomainError> {
        for task in self.tasks.values() {
            for step in &task.steps {
                match step {
                    TaskStep::Spawn(target) if !self.tasks.contains_key(target) => {
                        return Err(DomainError::UnknownTask {
                            name: target.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn scripts(&self, pm: PackageManager) -> BTreeMap<String, String> {
        self.tasks
            .iter()
            .map(|(name, task)| (name.clone(), task.script(pm)))
            .collect()
    }
}
