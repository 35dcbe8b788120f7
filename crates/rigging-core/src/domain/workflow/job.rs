use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::Step;
use crate::domain::merge::{Merge, merge_by_replacement};

/// One entry under `jobs:`.
///
/// A job either runs `steps` on a runner or calls a reusable workflow via
/// `uses`/`with`/`secrets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs_on: Option<RunsOn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs: Option<Vec<String>>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Mapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Mapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with: Option<Mapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Mapping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

impl Job {
    /// A job executed on the given runner.
    pub fn runs_on(runner: impl Into<RunsOn>) -> Self {
        Self {
            runs_on: Some(runner.into()),
            ..Self::default()
        }
    }

    /// A job that calls a reusable workflow.
    pub fn calling(workflow: impl Into<String>) -> Self {
        Self {
            uses: Some(workflow.into()),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn needs<S: AsRef<str>>(mut self, jobs: &[S]) -> Self {
        self.needs = Some(jobs.iter().map(|j| j.as_ref().to_string()).collect());
        self
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = Some(true);
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn concurrency(mut self, group: impl Into<String>) -> Self {
        self.concurrency = Some(Concurrency::group(group));
        self
    }

    pub fn matrix(mut self, key: &str, values: &[&str]) -> Self {
        let values: Vec<Value> = values.iter().map(|v| Value::from(*v)).collect();
        let mut matrix = Mapping::new();
        matrix.insert(key.into(), Value::Sequence(values));
        self.strategy = Some(Strategy { matrix });
        self
    }

    pub fn container(mut self, image: impl Into<String>) -> Self {
        self.container = Some(Container {
            image: image.into(),
        });
        self
    }

    pub fn env_var(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.env
            .get_or_insert_with(Mapping::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn output(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.outputs
            .get_or_insert_with(Mapping::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_input(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.with
            .get_or_insert_with(Mapping::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn secret(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.secrets
            .get_or_insert_with(Mapping::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }
}

/// `runs-on`: a single label or a label list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunsOn {
    Label(String),
    Labels(Vec<String>),
}

impl RunsOn {
    pub const UBUNTU: &'static str = "ubuntu-latest";

    pub fn ubuntu() -> Self {
        Self::Label(Self::UBUNTU.into())
    }

    pub fn labels(labels: &[&str]) -> Self {
        Self::Labels(labels.iter().map(|l| l.to_string()).collect())
    }
}

impl From<&str> for RunsOn {
    fn from(label: &str) -> Self {
        Self::Label(label.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
    None,
}

/// Token permissions. Unset scopes are omitted; an empty block renders `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Permissions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<PermissionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<PermissionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<PermissionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<PermissionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_requests: Option<PermissionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_events: Option<PermissionLevel>,
}

impl Permissions {
    pub fn none() -> Self {
        Self::default()
    }

    /// `contents: read`, the most common job permission.
    pub fn read_contents() -> Self {
        Self::default().contents(PermissionLevel::Read)
    }

    pub fn actions(mut self, level: PermissionLevel) -> Self {
        self.actions = Some(level);
        self
    }

    pub fn contents(mut self, level: PermissionLevel) -> Self {
        self.contents = Some(level);
        self
    }

    pub fn id_token(mut self, level: PermissionLevel) -> Self {
        self.id_token = Some(level);
        self
    }

    pub fn packages(mut self, level: PermissionLevel) -> Self {
        self.packages = Some(level);
        self
    }

    pub fn pull_requests(mut self, level: PermissionLevel) -> Self {
        self.pull_requests = Some(level);
        self
    }

    pub fn security_events(mut self, level: PermissionLevel) -> Self {
        self.security_events = Some(level);
        self
    }
}

merge_by_replacement!(PermissionLevel);

/// Scopes set on the overlay win; scopes it leaves unset are kept.
impl Merge for Permissions {
    fn merge(self, overlay: Self) -> Self {
        Self {
            actions: self.actions.merge(overlay.actions),
            contents: self.contents.merge(overlay.contents),
            id_token: self.id_token.merge(overlay.id_token),
            packages: self.packages.merge(overlay.packages),
            pull_requests: self.pull_requests.merge(overlay.pull_requests),
            security_events: self.security_events.merge(overlay.security_events),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Concurrency {
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_in_progress: Option<bool>,
}

impl Concurrency {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            cancel_in_progress: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub matrix: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    pub image: String,
}
