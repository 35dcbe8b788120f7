//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rigging_core::domain::ArchetypeKind;

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "rigging",
    bin_name = "rigging",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{26a1} Opinionated scaffolding for Node/TypeScript repositories",
    long_about = "Rigging generates TypeScript packages, CDK apps and ECS services \
                  together with their CI/CD workflows, tooling configuration \
                  and sample code.",
    after_help = "EXAMPLES:\n\
        \x20 rigging new widget\n\
        \x20 rigging new infra    --archetype cdk --options cdk.yaml\n\
        \x20 rigging new payments --archetype ecs-service --service-name payments\n\
        \x20 rigging list --format json\n\
        \x20 rigging completions bash > /usr/share/bash-completion/completions/rigging",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a new project.
    #[command(
        visible_alias = "n",
        about = "Generate a new project",
        after_help = "EXAMPLES:\n\
            \x20 rigging new widget\n\
            \x20 rigging new widget --options base.toml --options local.json\n\
            \x20 rigging new payments --archetype ecs-service --service-name payments --dry-run"
    )]
    New(NewArgs),

    /// List archetypes.
    #[command(
        visible_alias = "ls",
        about = "List available archetypes",
        after_help = "EXAMPLES:\n\
            \x20 rigging list\n\
            \x20 rigging list --files\n\
            \x20 rigging list --format json"
    )]
    List(ListArgs),

    /// Print the renovate schedule derived from a project name.
    #[command(
        about = "Show the renovate schedule for a project name",
        after_help = "EXAMPLES:\n\
            \x20 rigging cron widget\n\
            \x20 rigging cron @time-loop/widget"
    )]
    Cron(CronArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 rigging completions bash > ~/.local/share/bash-completion/completions/rigging\n\
            \x20 rigging completions zsh  > ~/.zfunc/_rigging\n\
            \x20 rigging completions fish > ~/.config/fish/completions/rigging.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Rigging configuration.
    #[command(
        about = "Configuration inspection",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 rigging config get organization.scope\n\
            \x20 rigging config list\n\
            \x20 rigging config path"
    )]
    Config(ConfigCommands),
}

// ── new ───────────────────────────────────────────────────────────────────────

/// Arguments for `rigging new`.
#[derive(Debug, Args)]
pub struct NewArgs {
    /// Package name. Bare names are placed under the organization scope.
    #[arg(value_name = "NAME", help = "Package name, e.g. widget or @time-loop/widget")]
    pub name: String,

    /// Project archetype.
    #[arg(
        short = 'a',
        long = "archetype",
        value_name = "ARCHETYPE",
        value_enum,
        default_value = "typescript",
        help = "Project archetype"
    )]
    pub archetype: Archetype,

    /// Option files merged in order over the archetype defaults.
    #[arg(
        short = 'o',
        long = "options",
        value_name = "FILE",
        help = "Option file (.toml, .yaml, .yml, .json); repeatable, later files win"
    )]
    pub options: Vec<PathBuf>,

    /// ECS service name (ecs-service only).
    #[arg(
        long = "service-name",
        value_name = "SERVICE",
        help = "Service name for ecs-service projects"
    )]
    pub service_name: Option<String>,

    /// Directory to generate into.
    #[arg(
        short = 'd',
        long = "output",
        value_name = "DIR",
        help = "Output directory (default: ./<name without scope>)"
    )]
    pub output: Option<PathBuf>,

    /// Regenerate into an existing directory. Samples are never replaced.
    #[arg(long = "force", help = "Write into an existing directory")]
    pub force: bool,

    /// Preview what would be created without writing any files.
    #[arg(long = "dry-run", help = "Show what would be created without creating")]
    pub dry_run: bool,
}

// ── list ──────────────────────────────────────────────────────────────────────

/// Arguments for `rigging list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Show the files each archetype emits.
    #[arg(long = "files", help = "Include the files each archetype emits")]
    pub files: bool,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// Output format for the `list` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One name per line.
    List,
    /// JSON array.
    Json,
}

// ── cron ──────────────────────────────────────────────────────────────────────

/// Arguments for `rigging cron`.
#[derive(Debug, Args)]
pub struct CronArgs {
    /// Package name; normalized the same way `new` does.
    #[arg(value_name = "NAME")]
    pub name: String,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `rigging completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `rigging config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `organization.scope`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── value enums ───────────────────────────────────────────────────────────────

/// Project archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Archetype {
    /// Also accepted as `ts`.
    #[value(name = "typescript", alias = "ts")]
    TypeScript,
    #[value(name = "cdk", alias = "cdk-app")]
    Cdk,
    #[value(name = "ecs-service", alias = "ecs")]
    EcsService,
}

impl From<Archetype> for ArchetypeKind {
    fn from(archetype: Archetype) -> Self {
        match archetype {
            Archetype::TypeScript => Self::TypeScript,
            Archetype::Cdk => Self::Cdk,
            Archetype::EcsService => Self::EcsService,
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&ArchetypeKind::from(*self), f)
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
