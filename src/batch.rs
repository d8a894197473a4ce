//! Batch driver.
//!
//! Each repository runs the whole state machine on its own rayon worker.
//! Runs share nothing but the configuration and the collaborators, both
//! read-only, and a failed repository never stops the others.

use crate::error::Result;
use crate::orchestrator::{MigrationRun, Orchestrator};
use crate::repository::VersionControl;
use crate::target::RepositoryTarget;
use crate::verify::BuildTool;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Results of a batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub runs: Vec<MigrationRun>,
}

impl BatchSummary {
    pub fn from_runs(runs: Vec<MigrationRun>) -> Self {
        let succeeded = runs.iter().filter(|r| r.success).count();
        Self {
            total: runs.len(),
            succeeded,
            failed: runs.len() - succeeded,
            runs,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Writes the summary as pretty-printed JSON.
    pub fn write_report(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Parses repository URLs into targets, dropping duplicates (same working
/// directory) and URLs no name can be derived from.
pub fn resolve_targets<I, S>(urls: I) -> Vec<RepositoryTarget>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for url in urls {
        let url = url.as_ref();
        match RepositoryTarget::parse(url) {
            Some(target) => {
                if seen.insert(target.work_dir_name()) {
                    targets.push(target);
                } else {
                    log::warn!("Skipping duplicate repository {}", url);
                }
            }
            None => log::warn!("Skipping unrecognised repository URL '{}'", url),
        }
    }
    targets
}

/// Migrates every target on a pool of `max_workers` threads.
///
/// `on_complete` is called from the worker thread as each run finishes.
pub fn run_batch<V, B, F>(
    orchestrator: &Orchestrator<'_, V, B>,
    targets: &[RepositoryTarget],
    max_workers: usize,
    on_complete: F,
) -> Result<BatchSummary>
where
    V: VersionControl,
    B: BuildTool,
    F: Fn(&MigrationRun) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .thread_name(|i| format!("relocate-worker-{}", i))
        .build()?;

    log::info!(
        "Migrating {} repositories with {} workers",
        targets.len(),
        max_workers
    );

    let runs: Vec<MigrationRun> = pool.install(|| {
        targets
            .par_iter()
            .map(|target| {
                let run = orchestrator.run(target);
                on_complete(&run);
                run
            })
            .collect()
    });

    Ok(BatchSummary::from_runs(runs))
}
