//! Command handlers. Each translates parsed arguments into core calls and
//! renders the result; no generation logic lives here.

pub mod completions;
pub mod config;
pub mod cron;
pub mod list;
pub mod new;
