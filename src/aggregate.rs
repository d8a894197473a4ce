//! Aggregation of verification logs.
//!
//! Every verification leaves a `dependency-resolution-{namespace}-{name}.log`
//! behind. [`aggregate_logs`] collects the unresolved `group:artifact:version`
//! coordinates from all of them into one ledger file, listing each
//! coordinate once with the repositories that failed on it. Coordinates
//! already in the ledger are not repeated, so the command can be re-run
//! after every batch.

use crate::error::Result;
use crate::verify::scan_output;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const LOG_PATTERN: &str = "dependency-resolution-*.log";
const LOG_PREFIX: &str = "dependency-resolution-";

fn coordinate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9_][A-Za-z0-9_.\-]*):([A-Za-z0-9_][A-Za-z0-9_.\-]*):([A-Za-z0-9_][A-Za-z0-9_.+\-]*)")
            .expect("coordinate regex is valid")
    })
}

fn banner_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\*+ (\S+) DEPENDENCY RESOLUTION \*+$").expect("banner regex is valid")
    })
}

/// Unresolved coordinates mentioned on failure lines of a log.
pub fn extract_coordinates(log: &str) -> BTreeSet<String> {
    scan_output(log)
        .iter()
        .flat_map(|line| {
            coordinate_regex()
                .find_iter(line)
                .map(|m| m.as_str().trim_end_matches(['.', '-']).to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Repository a log belongs to: the banner's `namespace/name`, or the file
/// stem without its prefix.
pub fn attribute(log: &str, path: &Path) -> String {
    if let Some(caps) = banner_regex().captures(log) {
        return caps[1].to_string();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.strip_prefix(LOG_PREFIX).unwrap_or(&stem).to_string()
}

/// Coordinates already recorded in a ledger: the first token of each line.
fn recorded_coordinates(ledger: &str) -> HashSet<String> {
    ledger
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|token| {
            coordinate_regex()
                .find(token)
                .is_some_and(|m| m.as_str() == *token)
        })
        .map(str::to_string)
        .collect()
}

/// What an aggregation run found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    pub scanned: Vec<PathBuf>,
    /// Newly recorded coordinates and the repositories that reported them.
    pub added: BTreeMap<String, BTreeSet<String>>,
    /// Coordinates skipped because the ledger already had them.
    pub already_recorded: usize,
}

/// Scans `logs_dir` for verification logs and appends new coordinates to
/// `ledger` in a timestamped section.
pub fn aggregate_logs(logs_dir: &Path, ledger: &Path) -> Result<AggregateReport> {
    let pattern = logs_dir.join(LOG_PATTERN).to_string_lossy().into_owned();
    let mut logs: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(|e| e.ok()).collect();
    logs.sort();

    let existing = if ledger.is_file() {
        recorded_coordinates(&fs::read_to_string(ledger)?)
    } else {
        HashSet::new()
    };

    let mut report = AggregateReport::default();
    let mut skipped = HashSet::new();
    for path in logs {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let repository = attribute(&text, &path);
        for coordinate in extract_coordinates(&text) {
            if existing.contains(&coordinate) {
                skipped.insert(coordinate);
                continue;
            }
            report
                .added
                .entry(coordinate)
                .or_default()
                .insert(repository.clone());
        }
        report.scanned.push(path);
    }
    report.already_recorded = skipped.len();

    if !report.added.is_empty() {
        append_section(ledger, &report.added)?;
    }
    log::info!(
        "Scanned {} logs: {} new coordinates, {} already recorded",
        report.scanned.len(),
        report.added.len(),
        report.already_recorded
    );
    Ok(report)
}

fn append_section(ledger: &Path, added: &BTreeMap<String, BTreeSet<String>>) -> Result<()> {
    if let Some(parent) = ledger.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let width = added.keys().map(String::len).max().unwrap_or(0);
    let mut section = format!(
        "\n# Unresolved dependencies collected {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    for (coordinate, repositories) in added {
        let repositories: Vec<&str> = repositories.iter().map(String::as_str).collect();
        section.push_str(&format!(
            "{:width$}  # {}\n",
            coordinate,
            repositories.join(", "),
            width = width
        ));
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(ledger)?;
    file.write_all(section.as_bytes())?;
    Ok(())
}
