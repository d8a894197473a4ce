//! # Gradle Relocate CLI
//!
//! Binary entry point for `gradle-relocate`. Parses arguments with `clap`
//! and hands off to the command implementations; all migration logic lives
//! in the `gradle_relocate` library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
