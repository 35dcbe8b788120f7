//! Application services.

pub mod synth_service;

pub use synth_service::{SynthReport, SynthService};
