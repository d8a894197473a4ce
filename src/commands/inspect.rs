//! # Inspect Command Implementation
//!
//! Classifies a local Gradle project and prints the flow it would take and
//! the files the rewriters would touch. Read-only.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use gradle_relocate::classify::{classify, Flow, ProjectStructure};
use gradle_relocate::defaults::DEFAULT_CATALOG_MARKER;
use gradle_relocate::output::{emoji, structure_report, OutputConfig};
use gradle_relocate::version::{detect_gradle_version, GradleVersion};

/// Classify a local Gradle project
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Project directory.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Version key in `[versions]` that selects the platform flow.
    #[arg(long, value_name = "KEY", default_value = DEFAULT_CATALOG_MARKER)]
    pub catalog_marker: String,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Inspection<'a> {
    flow: Flow,
    gradle_version: Option<GradleVersion>,
    structure: &'a ProjectStructure,
}

/// Execute the `inspect` command.
pub fn execute(args: InspectArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let (flow, structure) = classify(&args.path, &args.catalog_marker)?;
    let gradle_version = detect_gradle_version(&structure);

    if args.json {
        let inspection = Inspection {
            flow,
            gradle_version,
            structure: &structure,
        };
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    print!("{}", structure_report(&out, flow, &structure));
    match gradle_version {
        Some(version) => println!("  gradle version:     {}", version),
        None => println!(
            "{} Gradle version not detected; the legacy settings template would be used",
            emoji(&out, "⚠️", "[WARN]")
        ),
    }
    Ok(())
}
