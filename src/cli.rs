//! CLI definitions for TourGuide.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// TourGuide CLI.
#[derive(Parser)]
#[command(name = "tourguide")]
#[command(about = "Resolve tour targets and simulate tours against page snapshots")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config dir when present)
    #[arg(short, long, global = true, env = "TOURGUIDE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// A page snapshot and the tours to run against it.
#[derive(Args)]
pub(crate) struct PageArgs {
    /// Page snapshot (JSON)
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Tour definitions (JSON array)
    #[arg(short, long)]
    pub tours: PathBuf,
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check every tour's step selectors against a snapshot
    Validate {
        #[command(flatten)]
        page: PageArgs,

        /// Only check this tour
        #[arg(long)]
        tour: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Resolve the element one step targets
    Resolve {
        #[command(flatten)]
        page: PageArgs,

        /// Tour id
        #[arg(long)]
        tour: String,

        /// Zero-based step index
        #[arg(long, default_value_t = 0)]
        step: usize,

        /// Override the configured default precision
        #[arg(long)]
        precision: Option<f64>,
    },

    /// Run orchestrator ticks against a snapshot and print captured events
    Simulate {
        #[command(flatten)]
        page: PageArgs,

        /// Persisted outcomes to start from (JSON object)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Feature flags as KEY=true|false
        #[arg(long = "flag", value_parser = parse_flag)]
        flags: Vec<(String, bool)>,

        /// Number of ticks to run
        #[arg(long, default_value_t = 1)]
        ticks: usize,

        /// Click through every step after the tour starts
        #[arg(long)]
        complete: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Load and validate the configuration
    Check,

    /// Print the effective configuration as TOML
    Show,
}

fn parse_flag(raw: &str) -> Result<(String, bool), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=true|false, got '{}'", raw))?;
    let enabled = value
        .parse::<bool>()
        .map_err(|_| format!("flag value must be true or false, got '{}'", value))?;
    Ok((key.to_string(), enabled))
}
