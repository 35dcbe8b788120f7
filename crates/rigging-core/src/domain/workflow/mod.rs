//! Typed model of a GitHub Actions workflow.
//!
//! Builders assemble a [`Workflow`] once; it is then converted to a YAML
//! value (where an optional override document is deep-merged) and never
//! mutated again.

mod job;
mod ordered;
mod step;
mod triggers;

pub use job::{Concurrency, Container, Job, PermissionLevel, Permissions, RunsOn, Strategy};
pub use ordered::OrderedMap;
pub use step::{Step, StepAction};
pub use triggers::{
    EventFilter, InputType, Schedule, Triggers, WorkflowCall, WorkflowInput, WorkflowSecret,
};

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::DomainError;
use super::merge::{ArrayStrategy, DeepMerge};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    pub name: String,
    pub on: Triggers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Mapping>,
    pub jobs: OrderedMap<Job>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, on: Triggers) -> Self {
        Self {
            name: name.into(),
            on,
            concurrency: None,
            permissions: None,
            env: None,
            jobs: OrderedMap::new(),
        }
    }

    pub fn concurrency(mut self, group: impl Into<String>) -> Self {
        self.concurrency = Some(Concurrency::group(group));
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn env_var(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.env
            .get_or_insert_with(Mapping::new)
            .insert(key.into(), value.into());
        self
    }

    /// Add a job; job ids must be unique within the workflow.
    pub fn add_job(&mut self, id: impl Into<String>, job: Job) -> Result<(), DomainError> {
        let id = id.into();
        self.jobs
            .try_insert(id.clone(), job)
            .map_err(|_| DomainError::DuplicateJob {
                workflow: self.name.clone(),
                job: id,
            })
    }

    /// Builder form of [`Workflow::add_job`].
    pub fn with_job(mut self, id: impl Into<String>, job: Job) -> Result<Self, DomainError> {
        self.add_job(id, job)?;
        Ok(self)
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn job_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    /// Render to a YAML value with `overrides` deep-merged on top.
    ///
    /// Override sequences replace the generated ones rather than appending.
    pub fn to_value(&self, overrides: Option<&Value>) -> Result<Value, DomainError> {
        let mut value = serde_yaml::to_value(self).map_err(|e| DomainError::RenderFailed {
            path: format!("workflow '{}'", self.name),
            reason: e.to_string(),
        })?;
        if let Some(overrides) = overrides {
            value.deep_merge(overrides.clone(), ArrayStrategy::Replace);
        }
        Ok(value)
    }
}

/// Wrap `inner` in a `${{ }}` expression.
pub fn expr(inner: &str) -> String {
    format!("${{{{ {inner} }}}}")
}

/// `${{ secrets.NAME }}`.
pub fn secret(name: &str) -> String {
    expr(&format!("secrets.{name}"))
}

/// Build a YAML mapping from key/value pairs, keeping their order.
pub fn yaml_map<I, K, V>(pairs: I) -> Mapping
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (Value::String(k.into()), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Workflow {
        Workflow::new("ci", Triggers::new().manual())
            .with_job(
                "build",
                Job::runs_on(RunsOn::ubuntu()).step(Step::run("Build", "make")),
            )
            .unwrap()
    }

    #[test]
    fn expressions_are_wrapped() {
        assert_eq!(expr("inputs.version"), "${{ inputs.version }}");
        assert_eq!(secret("GITHUB_TOKEN"), "${{ secrets.GITHUB_TOKEN }}");
    }

    #[test]
    fn duplicate_job_ids_are_rejected() {
        let mut workflow = sample();
        let err = workflow
            .add_job("build", Job::runs_on(RunsOn::ubuntu()))
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateJob { .. }));
    }

    #[test]
    fn empty_trigger_and_permissions_render_as_empty_maps() {
        let value = sample()
            .permissions(Permissions::none())
            .to_value(None)
            .unwrap();
        assert_eq!(value["on"]["workflow_dispatch"], Value::Mapping(Mapping::new()));
        assert_eq!(value["permissions"], Value::Mapping(Mapping::new()));
    }

    #[test]
    fn overrides_merge_into_rendered_value() {
        let overrides: Value = serde_yaml::from_str("name: renamed\njobs:\n  build:\n    timeout-minutes: 5\n").unwrap();
        let value = sample().to_value(Some(&overrides)).unwrap();
        assert_eq!(value["name"], Value::from("renamed"));
        assert_eq!(value["jobs"]["build"]["timeout-minutes"], Value::from(5));
        assert_eq!(value["jobs"]["build"]["runs-on"], Value::from("ubuntu-latest"));
    }
}
