//! Infrastructure adapters for Rigging.
//!
//! This crate implements the ports defined in `rigging-core::application::ports`
//! and owns every piece of I/O: writing synthesized projects and reading
//! option files.

pub mod filesystem;
pub mod options_loader;

pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use options_loader::{OptionsFormat, OptionsLoader};
