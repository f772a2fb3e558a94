//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    action::ActionCommands, completions::CompletionsArgs, config::ConfigCommands,
    doc::DocCommands, incident::IncidentCommands, init::InitArgs,
};

#[derive(Parser)]
#[command(name = "rca")]
#[command(author, version, about = "Closed-loop root cause analysis tracking")]
#[command(long_about = "Closed-loop root cause analysis tracking.\n\nIngest RCA documents, track the remedial actions they call for, and flag incidents that recur.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .rca/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new rcatrack project
    Init(InitArgs),

    /// RCA document management (ingest, extract, inspect)
    #[command(subcommand)]
    Doc(DocCommands),

    /// Remedial action tracking
    #[command(subcommand)]
    Action(ActionCommands),

    /// Incident recurrence checks
    #[command(subcommand)]
    Incident(IncidentCommands),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (pretty for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
