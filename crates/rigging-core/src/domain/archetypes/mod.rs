//! Project emitters.
//!
//! Each archetype merges the caller's options over its defaults, builds the
//! base [`Project`] and attaches descriptors and samples. Emitting performs
//! no I/O and stops at the first error.

pub mod cdk;
pub mod docgen;
pub mod ecs_service;
pub mod options;
pub mod organization;
pub mod typescript;

pub use cdk::{CdkApp, CdkAppOptions};
pub use docgen::DocgenOptions;
pub use ecs_service::{EcsServiceOptions, EcsServiceProject};
pub use options::{BootstrapStep, TypeScriptProjectOptions};
pub use organization::Organization;
pub use typescript::TypeScriptProject;

use std::fmt;
use std::str::FromStr;

use super::{error::DomainError, project::Project};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchetypeKind {
    TypeScript,
    Cdk,
    EcsService,
}

impl ArchetypeKind {
    pub const ALL: [ArchetypeKind; 3] = [Self::TypeScript, Self::Cdk, Self::EcsService];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Cdk => "cdk",
            Self::EcsService => "ecs-service",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript package with the organization's CI, release and tooling",
            Self::Cdk => "AWS CDK application with sample stack, diff and context workflows",
            Self::EcsService => "Containerized service built into ECR and deployed to ECS",
        }
    }
}

impl fmt::Display for ArchetypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchetypeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Ok(Self::TypeScript),
            "cdk" | "cdk-app" => Ok(Self::Cdk),
            "ecs-service" | "ecs" | "service" => Ok(Self::EcsService),
            other => Err(DomainError::InvalidOption {
                field: "archetype".into(),
                reason: format!("unknown archetype '{other}', expected typescript, cdk or ecs-service"),
            }),
        }
    }
}

/// Merged options for one archetype, ready to emit.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchetypeOptions {
    TypeScript(TypeScriptProjectOptions),
    Cdk(CdkAppOptions),
    EcsService(EcsServiceOptions),
}

impl ArchetypeOptions {
    /// Empty options for `kind`; defaults are applied when emitting.
    pub fn empty(kind: ArchetypeKind) -> Self {
        match kind {
            ArchetypeKind::TypeScript => Self::TypeScript(TypeScriptProjectOptions::default()),
            ArchetypeKind::Cdk => Self::Cdk(CdkAppOptions::default()),
            ArchetypeKind::EcsService => Self::EcsService(EcsServiceOptions::default()),
        }
    }

    pub fn kind(&self) -> ArchetypeKind {
        match self {
            Self::TypeScript(_) => ArchetypeKind::TypeScript,
            Self::Cdk(_) => ArchetypeKind::Cdk,
            Self::EcsService(_) => ArchetypeKind::EcsService,
        }
    }

    pub fn project_options_mut(&mut self) -> &mut TypeScriptProjectOptions {
        match self {
            Self::TypeScript(options) => options,
            Self::Cdk(options) => &mut options.project,
            Self::EcsService(options) => &mut options.project,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.project_options_mut().name = Some(name.into());
    }

    /// Only meaningful for ECS services; ignored elsewhere.
    pub fn set_service_name(&mut self, service_name: impl Into<String>) {
        if let Self::EcsService(options) = self {
            options.service_name = Some(service_name.into());
        }
    }

    /// Run the archetype.
    pub fn emit(self, org: &Organization) -> Result<Project, DomainError> {
        match self {
            Self::TypeScript(options) => Ok(TypeScriptProject::new(org, options)?.into_project()),
            Self::Cdk(options) => Ok(CdkApp::new(org, options)?.into_project()),
            Self::EcsService(options) => Ok(EcsServiceProject::new(org, options)?.into_project()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_their_names() {
        for kind in ArchetypeKind::ALL {
            assert_eq!(kind.as_str().parse::<ArchetypeKind>().unwrap(), kind);
        }
        assert_eq!("TS".parse::<ArchetypeKind>().unwrap(), ArchetypeKind::TypeScript);
    }

    #[test]
    fn unknown_kind_is_a_validation_error() {
        let err = "lambda".parse::<ArchetypeKind>().unwrap_err();
        assert!(err.to_string().contains("lambda"));
    }

    #[test]
    fn service_name_only_applies_to_services() {
        let mut options = ArchetypeOptions::empty(ArchetypeKind::TypeScript);
        options.set_service_name("payments");
        assert_eq!(options, ArchetypeOptions::empty(ArchetypeKind::TypeScript));

        let mut options = ArchetypeOptions::empty(ArchetypeKind::EcsService);
        options.set_name("payments");
        options.set_service_name("payments");
        let project = options.emit(&Organization::default()).unwrap();
        assert_eq!(project.name(), "@time-loop/payments");
    }

    #[test]
    fn every_kind_emits_with_just_a_name() {
        for kind in ArchetypeKind::ALL {
            let mut options = ArchetypeOptions::empty(kind);
            options.set_name("example");
            options.set_service_name("example");
            let project = options.emit(&Organization::default()).unwrap();
            assert!(project.synth("/tmp/example").unwrap().file_count() > 10, "{kind}");
        }
    }
}
