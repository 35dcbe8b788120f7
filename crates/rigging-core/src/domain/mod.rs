// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for rigging.
//!
//! Pure generation logic: option merging, typed workflow documents, the
//! in-memory project handle, descriptor generators and archetypes. Nothing
//! here performs I/O; writing files is the synth service's job, through the
//! `Filesystem` port.
//!
//! - **No I/O**: archetypes only attach files to a [`Project`]
//! - **Deterministic**: the same options always produce the same files
//! - **Fail fast**: every validation error aborts generation

pub mod archetypes;
pub mod common;
pub mod error;
pub mod generators;
pub mod merge;
pub mod naming;
pub mod parameters;
pub mod project;
pub mod workflow;

pub use archetypes::{
    ArchetypeKind, ArchetypeOptions, CdkApp, CdkAppOptions, EcsServiceOptions, EcsServiceProject,
    Organization, TypeScriptProject, TypeScriptProjectOptions,
};
pub use common::{FileMode, RelativePath};
pub use error::{DomainError, ErrorCategory};
pub use merge::{ArrayStrategy, DeepMerge, Merge};
pub use naming::{Namer, normalize_name, pinned_deps};
pub use project::{
    FileToWrite, GeneratedFile, Project, ProjectOptions, ProjectStructure, WritePolicy,
};
pub use workflow::{Job, Step, Workflow};
