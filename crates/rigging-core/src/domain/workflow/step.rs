use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_yaml::{Mapping, Value};

/// What a step does: run a shell script or invoke an action.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    Run { run: String, shell: Option<String> },
    Uses { uses: String, with: Option<Mapping> },
}

/// A single workflow step.
///
/// Constructed through [`Step::run`], [`Step::uses`] or one of the
/// specialised constructors, then refined with the fluent setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: Option<String>,
    pub id: Option<String>,
    pub condition: Option<String>,
    pub action: StepAction,
    pub env: Option<Mapping>,
}

impl Step {
    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(
            Some(name.into()),
            StepAction::Run {
                run: script.into(),
                shell: None,
            },
        )
    }

    pub fn uses(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(
            Some(name.into()),
            StepAction::Uses {
                uses: action.into(),
                with: None,
            },
        )
    }

    /// An action step without a display name.
    pub fn bare_uses(action: impl Into<String>) -> Self {
        Self::new(
            None,
            StepAction::Uses {
                uses: action.into(),
                with: None,
            },
        )
    }

    /// `aws-actions/configure-aws-credentials` assuming `role`.
    pub fn aws_credentials(
        name: impl Into<String>,
        action_version: &str,
        role: impl Into<String>,
        duration_seconds: u32,
        region: impl Into<String>,
    ) -> Self {
        Self::uses(
            name,
            format!("aws-actions/configure-aws-credentials@{action_version}"),
        )
        .with_input("role-to-assume", role.into())
        .with_input("role-duration-seconds", duration_seconds)
        .with_input("aws-region", region.into())
    }

    fn new(name: Option<String>, action: StepAction) -> Self {
        Self {
            name,
            id: None,
            condition: None,
            action,
            env: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Guard the step with an `if:` expression.
    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Add an action input. Ignored for run steps.
    pub fn with_input(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let StepAction::Uses { with, .. } = &mut self.action {
            with.get_or_insert_with(Mapping::new)
                .insert(key.into(), value.into());
        }
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.env
            .get_or_insert_with(Mapping::new)
            .insert(key.into(), value.into());
        self
    }

    /// Select the shell for a run step. Ignored for action steps.
    pub fn shell(mut self, name: impl Into<String>) -> Self {
        if let StepAction::Run { shell, .. } = &mut self.action {
            *shell = Some(name.into());
        }
        self
    }

    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The action reference for `uses` steps.
    pub fn action_ref(&self) -> Option<&str> {
        match &self.action {
            StepAction::Uses { uses, .. } => Some(uses),
            StepAction::Run { .. } => None,
        }
    }

    pub fn script(&self) -> Option<&str> {
        match &self.action {
            StepAction::Run { run, .. } => Some(run),
            StepAction::Uses { .. } => None,
        }
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(name) = &self.name {
            map.serialize_entry("name", name)?;
        }
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        if let Some(condition) = &self.condition {
            map.serialize_entry("if", condition)?;
        }
        match &self.action {
            StepAction::Run { run, shell } => {
                if let Some(shell) = shell {
                    map.serialize_entry("shell", shell)?;
                }
                map.serialize_entry("run", run)?;
            }
            StepAction::Uses { uses, with } => {
                map.serialize_entry("uses", uses)?;
                if let Some(with) = with {
                    map.serialize_entry("with", with)?;
                }
            }
        }
        if let Some(env) = &self.env {
            map.serialize_entry("env", env)?;
        }
        map.end()
    }
}
