//! # Console Output
//!
//! Operator-facing status lines for migration runs. These go to stdout and
//! are separate from the `log` stream, which carries the details.
//!
//! Colour and emoji are used only when the terminal and the operator allow
//! it:
//! - `--color=never|always|auto`
//! - `NO_COLOR` set (any value) disables them, see https://no-color.org/
//! - `CLICOLOR=0` disables them, `CLICOLOR_FORCE=1` forces them
//! - `TERM=dumb` disables them
//!
//! ```rust,ignore
//! use gradle_relocate::output::{OutputConfig, run_status_line};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{}", run_status_line(&config, &run));
//! ```

use crate::batch::BatchSummary;
use crate::classify::{Flow, ProjectStructure};
use crate::orchestrator::MigrationRun;
use console::style;
use std::env;

/// Whether colour and emoji may be used.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolves the `--color` flag value against the environment.
    ///
    /// `always` overrides `NO_COLOR`; anything other than `always` or
    /// `never` is treated as `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// Whether stdout is an interactive terminal, used to decide on a
    /// progress bar.
    pub fn is_interactive(&self) -> bool {
        console::Term::stdout().is_term()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// `emoji_str` when colour is on, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// One line per repository: marker, `namespace/name`, flow and outcome.
pub fn run_status_line(config: &OutputConfig, run: &MigrationRun) -> String {
    let flow = run.flow.map_or("-", |f| f.as_str());
    if run.success {
        let marker = emoji(config, "✅", "[OK]");
        let name = if config.use_color {
            style(run.target.display_name()).green().to_string()
        } else {
            run.target.display_name()
        };
        format!(
            "{} {} ({}, {} files changed)",
            marker,
            name,
            flow,
            run.changed_files()
        )
    } else {
        let marker = emoji(config, "❌", "[FAILED]");
        let name = if config.use_color {
            style(run.target.display_name()).red().to_string()
        } else {
            run.target.display_name()
        };
        format!(
            "{} {} ({}): {}",
            marker,
            name,
            flow,
            run.error.as_deref().unwrap_or("unknown error")
        )
    }
}

/// Aggregate count printed after a batch.
pub fn summary_line(config: &OutputConfig, summary: &BatchSummary) -> String {
    let marker = if summary.all_succeeded() {
        emoji(config, "🎉", "[DONE]")
    } else {
        emoji(config, "⚠️", "[DONE]")
    };
    format!(
        "{} {}/{} repositories migrated, {} failed",
        marker, summary.succeeded, summary.total, summary.failed
    )
}

/// Multi-line description of a classified tree, for `inspect`.
pub fn structure_report(config: &OutputConfig, flow: Flow, structure: &ProjectStructure) -> String {
    let mut out = format!(
        "{} {} flow\n",
        emoji(config, "🔍", "[FLOW]"),
        flow
    );
    let show = |path: &Option<std::path::PathBuf>| {
        path.as_ref().map_or_else(
            || "(none)".to_string(),
            |p| structure.relative(p).display().to_string(),
        )
    };
    out.push_str(&format!("  root build file:    {}\n", show(&structure.root_build_file)));
    out.push_str(&format!("  settings file:      {}\n", show(&structure.settings_file)));
    out.push_str(&format!("  wrapper properties: {}\n", show(&structure.wrapper_properties)));
    out.push_str(&format!("  version catalog:    {}\n", show(&structure.version_catalog)));
    out.push_str(&format!(
        "  submodule builds:   {}\n",
        structure.submodule_build_files.len()
    ));
    for file in &structure.submodule_build_files {
        out.push_str(&format!("    {}\n", structure.relative(file).display()));
    }
    out
}
