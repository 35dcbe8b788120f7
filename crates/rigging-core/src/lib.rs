//! Rigging Core - project scaffolding for the organization's Node services.
//!
//! This crate provides the domain and application layers of the `rigging`
//! generator, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           rigging-cli (CLI)             │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   Application Services (SynthService)   │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     Application Ports (Filesystem)      │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    rigging-adapters (Infrastructure)    │
//! │   (LocalFilesystem, OptionsLoader, ..)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │ (Merge, Workflow, Project, Archetypes)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rigging_core::prelude::*;
//!
//! # fn run(filesystem: Box<dyn Filesystem>) -> RiggingResult<()> {
//! let mut options = ArchetypeOptions::empty(ArchetypeKind::TypeScript);
//! options.set_name("widget");
//! let project = options.emit(&Organization::default())?;
//!
//! let report = SynthService::new(filesystem).synth(&project, "./widget", false)?;
//! println!("wrote {} files", report.written.len());
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod error;

pub mod prelude {
    pub use crate::application::{Filesystem, SynthReport, SynthService};
    pub use crate::domain::{
        ArchetypeKind, ArchetypeOptions, CdkAppOptions, EcsServiceOptions, Merge, Organization,
        Project, ProjectStructure, TypeScriptProjectOptions,
    };
    pub use crate::error::{RiggingError, RiggingResult};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
