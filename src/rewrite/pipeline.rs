//! Jenkins pipeline patching.
//!
//! Pipelines that run Gradle need the wrapper credentials passed as system
//! properties. Candidate files are `Jenkinsfile` and `Jenkinsfile*.groovy`
//! at the repository root and anywhere under `jobs/`.

use super::templates::JENKINS_GRADLE_PARAMS;
use super::{guarded, write_if_changed, RewriteOutcome};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub const STEP_PIPELINE: &str = "patch-pipeline";

const GRADLE_PARAMS_MARKER: &str = "env.GRADLE_PARAMS";

fn is_pipeline_name(name: &str) -> bool {
    name == "Jenkinsfile" || (name.starts_with("Jenkinsfile") && name.ends_with(".groovy"))
}

/// Finds pipeline definitions below `root`, sorted.
pub fn discover_pipelines(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    let root_pattern = root.join("Jenkinsfile*");
    let jobs_pattern = root.join("jobs").join("**").join("Jenkinsfile*");
    for pattern in [root_pattern, jobs_pattern] {
        let pattern = pattern.to_string_lossy().into_owned();
        for entry in glob::glob(&pattern)? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    log::debug!("Skipping unreadable pipeline candidate: {}", e);
                    continue;
                }
            };
            let is_candidate = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(is_pipeline_name);
            if is_candidate {
                found.push(path);
            }
        }
    }

    found.sort();
    found.dedup();
    Ok(found)
}

/// Adds the `GRADLE_PARAMS` line to every pipeline that mentions Gradle.
///
/// Returns one outcome per pipeline file that mentions Gradle, plus a
/// failed outcome for every pipeline that cannot be read as UTF-8 text.
pub fn patch_pipelines(root: &Path) -> Vec<RewriteOutcome> {
    let pipelines = match discover_pipelines(root) {
        Ok(p) => p,
        Err(e) => return vec![RewriteOutcome::failed(STEP_PIPELINE, root, e.to_string())],
    };

    pipelines
        .iter()
        .filter_map(|path| {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    return Some(RewriteOutcome::failed(
                        STEP_PIPELINE,
                        path,
                        format!("cannot read pipeline: {}", e),
                    ))
                }
            };
            if !text.to_lowercase().contains("gradle") {
                return None;
            }
            Some(guarded(STEP_PIPELINE, path, || patch_pipeline(path, &text)))
        })
        .collect()
}

fn patch_pipeline(path: &Path, original: &str) -> Result<RewriteOutcome> {
    let mut outcome = RewriteOutcome::new(STEP_PIPELINE, path);
    if original.contains(GRADLE_PARAMS_MARKER) {
        return Ok(outcome);
    }
    let new_text = insert_gradle_params(original);
    outcome.new_value = Some(JENKINS_GRADLE_PARAMS.to_string());
    outcome.changed = write_if_changed(path, original, &new_text)?;
    Ok(outcome)
}

/// Inserts the line after the last `@Library` line, separated by a blank
/// line, or at the top when there is none.
fn insert_gradle_params(text: &str) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let last_library = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("@Library"));

    let mut out = String::with_capacity(text.len() + JENKINS_GRADLE_PARAMS.len() + 4);
    match last_library {
        Some(i) => {
            for line in &lines[..=i] {
                out.push_str(line);
            }
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(JENKINS_GRADLE_PARAMS);
            out.push('\n');
            let rest: String = lines[i + 1..].concat();
            if !rest.is_empty() && !rest.starts_with('\n') {
                out.push('\n');
            }
            out.push_str(&rest);
        }
        None => {
            out.push_str(JENKINS_GRADLE_PARAMS);
            out.push_str("\n\n");
            out.push_str(text);
        }
    }
    out
}
