//! # Migrate Command Implementation
//!
//! Runs the full migration for a batch of repositories: each one is cloned
//! (or its previous checkout reused), classified, rewritten, verified with
//! Gradle and, when verification passes, committed and pushed to the
//! migration branch.
//!
//! Configuration is layered: built-in defaults, then the optional YAML file
//! from `--config`, then the flags below (each with an environment fallback).
//! Exits non-zero when any repository fails.

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;

use gradle_relocate::batch::{resolve_targets, run_batch};
use gradle_relocate::config::MigrationConfig;
use gradle_relocate::orchestrator::Orchestrator;
use gradle_relocate::output::{emoji, run_status_line, summary_line, OutputConfig};
use gradle_relocate::repository::GitCli;
use gradle_relocate::target::parse_repository_list;
use gradle_relocate::verify::GradleCli;

/// Migrate repositories from Nexus to Artifactory
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Repository URL to migrate (repeatable).
    #[arg(long = "repo", value_name = "URL")]
    pub repos: Vec<String>,

    /// File with one repository URL per line; blank lines and `#` comments
    /// are skipped.
    #[arg(long, value_name = "FILE")]
    pub repo_file: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(long, value_name = "FILE", env = "GRADLE_RELOCATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Artifactory base URL; `/artifactory` is appended when missing.
    #[arg(long, value_name = "URL", env = "ARTIFACTORY_URL")]
    pub artifactory_url: Option<String>,

    /// Directory holding the per-repository checkouts.
    #[arg(long, value_name = "DIR", env = "GRADLE_RELOCATE_WORK_ROOT")]
    pub work_root: Option<PathBuf>,

    /// Directory for the dependency resolution logs.
    #[arg(long, value_name = "DIR", env = "GRADLE_RELOCATE_LOGS_DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Branch the migration is committed to.
    #[arg(long, value_name = "NAME", env = "GRADLE_RELOCATE_BRANCH")]
    pub branch: Option<String>,

    /// Number of repositories processed in parallel.
    #[arg(short = 'j', long, value_name = "N", env = "GRADLE_RELOCATE_WORKERS")]
    pub workers: Option<usize>,

    /// Commit author name.
    #[arg(long, value_name = "NAME", env = "GIT_USER")]
    pub git_user: Option<String>,

    /// Commit author email.
    #[arg(long, value_name = "EMAIL", env = "GIT_EMAIL")]
    pub git_email: Option<String>,

    /// Only run the verification gate, without rewriting or committing.
    #[arg(long, conflicts_with = "skip_verification")]
    pub verify_only: bool,

    /// Commit without running the verification gate.
    #[arg(long)]
    pub skip_verification: bool,

    /// Keep the init script and isolated Gradle cache after verifying.
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Verify against the operator's Gradle cache instead of a private one.
    #[arg(long)]
    pub shared_cache: bool,

    /// Rewrite and verify, but never commit or push.
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of every run to this file.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl MigrateArgs {
    /// Loads the configuration file (if any) and applies the flag overrides.
    pub fn to_config(&self) -> Result<MigrationConfig> {
        let mut config = match &self.config {
            Some(path) => MigrationConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => MigrationConfig::default(),
        };

        if let Some(url) = &self.artifactory_url {
            config.artifactory_url = url.clone();
        }
        if let Some(dir) = &self.work_root {
            config.work_root = dir.clone();
        }
        if let Some(dir) = &self.logs_dir {
            config.logs_dir = dir.clone();
        }
        if let Some(branch) = &self.branch {
            config.branch_name = branch.clone();
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(user) = &self.git_user {
            config.git_user = user.clone();
        }
        if let Some(email) = &self.git_email {
            config.git_email = email.clone();
        }
        config.verify_only |= self.verify_only;
        config.skip_verification |= self.skip_verification;
        config.keep_artifacts |= self.keep_artifacts;
        config.dry_run |= self.dry_run;
        if self.shared_cache {
            config.isolated_cache = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Repository URLs from `--repo` and `--repo-file`, in that order.
    pub fn repository_urls(&self) -> Result<Vec<String>> {
        let mut urls = self.repos.clone();
        if let Some(path) = &self.repo_file {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read repository list {}", path.display()))?;
            urls.extend(parse_repository_list(&content));
        }
        Ok(urls)
    }
}

fn progress_bar(out: &OutputConfig, len: usize) -> ProgressBar {
    if !out.is_interactive() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {elapsed_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

/// Execute the `migrate` command.
pub fn execute(args: MigrateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = args.to_config()?;
    let targets = resolve_targets(args.repository_urls()?);
    if targets.is_empty() {
        bail!("No repositories to migrate. Pass --repo or --repo-file.");
    }

    println!(
        "{} Migrating {} repositories to {}",
        emoji(&out, "🚚", "[MIGRATE]"),
        targets.len(),
        config.artifactory_url
    );
    if config.dry_run {
        println!("{} Dry run: nothing will be pushed", emoji(&out, "💡", "[INFO]"));
    }

    let git = GitCli::new();
    let gradle = GradleCli::new();
    let orchestrator = Orchestrator::new(&config, &git, &gradle);
    let bar = progress_bar(&out, targets.len());

    let summary = run_batch(&orchestrator, &targets, config.max_workers, |run| {
        bar.suspend(|| println!("{}", run_status_line(&out, run)));
        bar.inc(1);
    })?;
    bar.finish_and_clear();

    println!("{}", summary_line(&out, &summary));

    if let Some(path) = &args.report {
        summary
            .write_report(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!(
            "{} Report written to {}",
            emoji(&out, "📄", "[REPORT]"),
            path.display()
        );
    }

    if !summary.all_succeeded() {
        bail!("{} of {} repositories failed", summary.failed, summary.total);
    }
    Ok(())
}
