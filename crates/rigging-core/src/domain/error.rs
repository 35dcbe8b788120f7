// ============================================================================
// domain/error.rs - GENERATION ERROR DOMAIN
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (so archetypes can be re-run against the same error)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors (caller must fix the options and regenerate)
    // ========================================================================
    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },

    #[error("Invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error(
        "No valid build architecture selected. Please select at least one of the following: {supported}"
    )]
    NoBuildArchitectures { supported: String },

    #[error("At least one deploy environment must be selected")]
    NoDeployEnvironments,

    #[error("At least one environment to diff must be configured")]
    NoDiffEnvironments,

    #[error("Invalid diff environment '{name}': {reason}")]
    InvalidDiffEnvironment { name: String, reason: String },

    #[error("docgen attribute must be set to utilize docgenOptions.")]
    DocgenOptionsWithoutDocgen,

    #[error("Invalid value for '{field}': {reason}")]
    InvalidOption { field: String, reason: String },

    // ========================================================================
    // Conflicts (two components claimed the same slot)
    // ========================================================================
    #[error("Duplicate path in project: {path}")]
    DuplicatePath { path: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Job '{job}' already exists in workflow '{workflow}'")]
    DuplicateJob { workflow: String, job: String },

    #[error("Task '{name}' already exists")]
    DuplicateTask { name: String },

    // ========================================================================
    // Constraint Violations
    // ========================================================================
    #[error("Project has no files to synthesize")]
    EmptyProject,

    #[error("Unknown task: {name}")]
    UnknownTask { name: String },

    #[error("Workflow '{workflow}' has no job '{job}'")]
    UnknownJob { workflow: String, job: String },

    #[error("Failed to render '{path}': {reason}")]
    RenderFailed { path: String, reason: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::MissingRequiredField { field } => vec![
                format!("Provide a value for '{}'", field),
                "Required fields can be set in an options file or on the command line".into(),
            ],
            Self::InvalidProjectName { name, .. } => vec![
                format!("'{}' cannot be used as a package name", name),
                "Use a bare name like 'my-service'; the organization scope is added for you".into(),
            ],
            Self::NoBuildArchitectures { supported } => vec![
                "buildArchitectures must not be empty".into(),
                format!("Supported architectures: {}", supported),
            ],
            Self::NoDeployEnvironments => vec![
                "Set deployEnvs to at least one of: qa, staging, prod".into(),
            ],
            Self::NoDiffEnvironments | Self::InvalidDiffEnvironment { .. } => vec![
                "Each diff environment needs a name, an OIDC role ARN and a label".into(),
                "Provide either stackSearchString or a non-empty stacks list".into(),
            ],
            Self::DocgenOptionsWithoutDocgen => vec![
                "Set docgen = true, or remove docgenOptions".into(),
            ],
            Self::DuplicatePath { path } => vec![
                format!("Two components tried to generate '{}'", path),
                "Use the override parameter instead of attaching the file twice".into(),
            ],
            Self::DuplicateJob { job, .. } => vec![
                format!("Rename the job '{}' or drop one of the components adding it", job),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingRequiredField { .. }
            | Self::InvalidProjectName { .. }
            | Self::NoBuildArchitectures { .. }
            | Self::NoDeployEnvironments
            | Self::NoDiffEnvironments
            | Self::InvalidDiffEnvironment { .. }
            | Self::DocgenOptionsWithoutDocgen
            | Self::InvalidOption { .. }
            | Self::AbsolutePathNotAllowed { .. } => ErrorCategory::Validation,
            Self::DuplicatePath { .. } | Self::DuplicateJob { .. } | Self::DuplicateTask { .. } => {
                ErrorCategory::Conflict
            }
            _ => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docgen_message_matches_documented_text() {
        assert_eq!(
            DomainError::DocgenOptionsWithoutDocgen.to_string(),
            "docgen attribute must be set to utilize docgenOptions."
        );
    }

    #[test]
    fn architecture_error_lists_supported_values() {
        let err = DomainError::NoBuildArchitectures {
            supported: "arm64, amd64".into(),
        };
        assert!(err.to_string().ends_with("arm64, amd64"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn duplicates_are_conflicts() {
        let err = DomainError::DuplicateJob {
            workflow: "release".into(),
            job: "cd".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }
}
