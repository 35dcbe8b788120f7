//! Driven ports, implemented by `rigging-adapters`.
//!
//! - `Filesystem`: where synthesized files end up

use std::path::Path;

use crate::error::RiggingResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `rigging_adapters::filesystem::LocalFilesystem` (production)
/// - `rigging_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> RiggingResult<()>;

    /// Write content to a file, replacing it if present.
    fn write_file(&self, path: &Path, content: &str) -> RiggingResult<()>;

    /// Set the executable flag.
    fn set_permissions(&self, path: &Path, executable: bool) -> RiggingResult<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> RiggingResult<()>;
}
