//! Runtime version pins consulted at generation time.
//!
//! These are fixed when the crate is built. Archetypes read them when the
//! caller does not provide an explicit version.

/// Lowest Node.js engine written to `engines.node`.
pub const MIN_ENGINE_NODE_VERSION: &str = "18.17.1";

/// Node.js version used by workflows and written to `.nvmrc`.
pub const NODE_VERSION: &str = "22.13.1";

/// pnpm version written to the `packageManager` manifest field.
pub const PNPM_VERSION: &str = "9.15.5";
