//! # Aggregate Command Implementation
//!
//! Collects unresolved dependency coordinates from the verification logs of
//! earlier runs into one ledger file.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use gradle_relocate::aggregate::aggregate_logs;
use gradle_relocate::defaults::default_logs_dir;
use gradle_relocate::output::{emoji, OutputConfig};

/// Collect unresolved dependencies from verification logs
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Directory containing `dependency-resolution-*.log` files.
    #[arg(long, value_name = "DIR", env = "GRADLE_RELOCATE_LOGS_DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Ledger file new coordinates are appended to.
    #[arg(short, long, value_name = "FILE", default_value = "unresolved-dependencies.txt")]
    pub output: PathBuf,
}

/// Execute the `aggregate` command.
pub fn execute(args: AggregateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let logs_dir = args.logs_dir.unwrap_or_else(default_logs_dir);

    println!(
        "{} Scanning {}",
        emoji(&out, "🔍", "[SCAN]"),
        logs_dir.display()
    );
    let report = aggregate_logs(&logs_dir, &args.output)
        .with_context(|| format!("Failed to aggregate logs in {}", logs_dir.display()))?;

    println!(
        "{} {} logs scanned, {} new coordinates, {} already recorded",
        emoji(&out, "📊", "[INFO]"),
        report.scanned.len(),
        report.added.len(),
        report.already_recorded
    );
    for (coordinate, repositories) in &report.added {
        let repositories: Vec<&str> = repositories.iter().map(String::as_str).collect();
        println!("   {} ({})", coordinate, repositories.join(", "));
    }
    if !report.added.is_empty() {
        println!(
            "{} Appended to {}",
            emoji(&out, "✅", "[OK]"),
            args.output.display()
        );
    }
    Ok(())
}
