//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Gradle Relocate - Migrate Gradle builds from Nexus to Artifactory
#[derive(Parser, Debug)]
#[command(name = "gradle-relocate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone, rewrite, verify and push a batch of repositories
    Migrate(commands::migrate::MigrateArgs),

    /// Classify a local Gradle project without changing it
    Inspect(commands::inspect::InspectArgs),

    /// Collect unresolved dependencies from verification logs
    Aggregate(commands::aggregate::AggregateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Migrate(args) => commands::migrate::execute(args, &self.color),
            Commands::Inspect(args) => commands::inspect::execute(args, &self.color),
            Commands::Aggregate(args) => commands::aggregate::execute(args, &self.color),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level.to_lowercase());
    // Ignored when a logger is already installed.
    let _ = env_logger::Builder::from_env(env)
        .format_target(false)
        .format_timestamp_secs()
        .try_init();
}
