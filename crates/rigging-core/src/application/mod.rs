//! Application layer for Rigging.
//!
//! This layer contains:
//! - **Services**: use case orchestration (`SynthService`)
//! - **Ports**: traits for the outside world (`Filesystem`)
//! - **Errors**: orchestration failures
//!
//! Generation rules live in `crate::domain`; this layer only moves a
//! synthesized project onto a filesystem.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::Filesystem;
pub use services::{SynthReport, SynthService};
