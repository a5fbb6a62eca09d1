mod commands;
mod logging;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sluice",
    version,
    about = "Config-driven acquire, reshape and export pipelines for file-based projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Directory holding one sub-directory per project
    #[arg(long, default_value = "projects", global = true)]
    root: PathBuf,

    /// Path to the SQLite state database
    #[arg(long, default_value = ".sluice/state.db", global = true)]
    state: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one project, or every project with `all`
    Run {
        /// Project name, or `all`
        project: String,
        /// Journal project failures and keep going instead of stopping
        #[arg(long)]
        wrap: bool,
        /// Acquisition window start (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        start: Option<DateTime<Utc>>,
        /// Acquisition window end (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        end: Option<DateTime<Utc>>,
    },
    /// Validate a project's configuration against the available plugins
    Check {
        /// Project name
        project: String,
    },
    /// List projects and whether they are active
    Projects,
    /// Show the most recent journaled failures for a project
    Failures {
        /// Project name
        project: String,
        /// Maximum number of notes to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let paths = commands::Paths {
        root: cli.root,
        state: cli.state,
    };
    match cli.command {
        Commands::Run {
            project,
            wrap,
            start,
            end,
        } => commands::run::execute(&paths, &project, wrap, start, end),
        Commands::Check { project } => commands::check::execute(&paths, &project),
        Commands::Projects => commands::projects::execute(&paths),
        Commands::Failures { project, limit } => {
            commands::failures::execute(&paths, &project, limit)
        }
    }
}
