use serde::Serialize;

use super::OrderedMap;

/// The `on:` block of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Triggers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<Schedule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_dispatch: Option<EventFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_call: Option<WorkflowCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<EventFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<EventFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<EventFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_suite: Option<EventFilter>,
}

impl Triggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cron(mut self, cron: impl Into<String>) -> Self {
        self.schedule
            .get_or_insert_with(Vec::new)
            .push(Schedule { cron: cron.into() });
        self
    }

    pub fn manual(mut self) -> Self {
        self.workflow_dispatch = Some(EventFilter::any());
        self
    }

    pub fn push(mut self, filter: EventFilter) -> Self {
        self.push = Some(filter);
        self
    }

    pub fn issues(mut self, filter: EventFilter) -> Self {
        self.issues = Some(filter);
        self
    }

    pub fn pull_request(mut self, filter: EventFilter) -> Self {
        self.pull_request = Some(filter);
        self
    }

    pub fn check_suite(mut self, filter: EventFilter) -> Self {
        self.check_suite = Some(filter);
        self
    }

    pub fn called(mut self, call: WorkflowCall) -> Self {
        self.workflow_call = Some(call);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub cron: String,
}

/// Event filter shared by the push/pull_request/issues style triggers.
/// With every field unset it renders as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
}

impl EventFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn types(types: &[&str]) -> Self {
        Self {
            types: Some(types.iter().map(|t| t.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn branches(branches: &[&str]) -> Self {
        Self {
            branches: Some(branches.iter().map(|b| b.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_paths(mut self, paths: &[&str]) -> Self {
        self.paths = Some(paths.iter().map(|p| p.to_string()).collect());
        self
    }
}

/// `workflow_call` trigger of a reusable workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowCall {
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub inputs: OrderedMap<WorkflowInput>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub secrets: OrderedMap<WorkflowSecret>,
}

impl WorkflowCall {
    pub fn input(mut self, name: &str, input: WorkflowInput) -> Self {
        self.inputs.insert(name, input);
        self
    }

    pub fn secret(mut self, name: &str, description: &str) -> Self {
        self.secrets.insert(
            name,
            WorkflowSecret {
                description: description.into(),
                required: true,
            },
        );
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Boolean,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<InputType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,
}

impl WorkflowInput {
    pub fn string() -> Self {
        Self {
            kind: Some(InputType::String),
            ..Self::default()
        }
    }

    pub fn boolean(default: bool) -> Self {
        Self {
            kind: Some(InputType::Boolean),
            default: Some(default.into()),
            ..Self::default()
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn default_value(mut self, value: impl Into<serde_yaml::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSecret {
    pub description: String,
    pub required: bool,
}
