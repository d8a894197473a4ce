//! # Config Rewriters
//!
//! A family of independent, idempotent edits applied to one file each. Every
//! rewriter returns a [`RewriteOutcome`] describing what happened instead of
//! an error: a missing file, an already-migrated file and a genuine failure
//! are all reported as data and it is up to the orchestrator to decide which
//! of them halts a flow.
//!
//! Rewriters guard every edit with a presence check on the text they are
//! about to add, so running one twice reports `changed = false` the second
//! time and leaves the bytes untouched.
//!
//! ## Modules
//!
//! - [`settings`]: stale-block removal, repository injection, settings checks
//! - [`wrapper`]: distribution URL substitution and `networkTimeout` handling
//! - [`catalog`]: version-catalog and `buildSrc` plugin substitution
//! - [`build_file`]: root build file cleanup and plugin application
//! - [`pipeline`]: Jenkins pipeline patching
//! - [`templates`]: settings snippets rendered against the target base URL

pub mod build_file;
pub mod catalog;
pub mod pipeline;
pub mod settings;
pub mod templates;
pub mod wrapper;

use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of one rewrite step on one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    /// Short identifier of the step, e.g. `inject-repositories`.
    pub step: String,
    pub file: PathBuf,
    pub changed: bool,
    /// The target file does not exist. Never a failure on its own.
    pub missing: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub removed_count: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub removed_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl RewriteOutcome {
    pub fn new(step: &str, file: &Path) -> Self {
        Self {
            step: step.to_string(),
            file: file.to_path_buf(),
            ..Default::default()
        }
    }

    /// Outcome for a target file that does not exist.
    pub fn missing(step: &str, file: &Path, kind: &str) -> Self {
        let mut outcome = Self::new(step, file);
        outcome.missing = true;
        outcome.errors.push(format!("{} not found", kind));
        outcome
    }

    pub fn failed(step: &str, file: &Path, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(step, file);
        outcome.errors.push(message.into());
        outcome
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Whether this outcome is an error rather than a no-op or absence.
    pub fn is_failure(&self) -> bool {
        !self.missing && !self.errors.is_empty()
    }

    /// One-line description for logs and status output.
    pub fn summary(&self) -> String {
        let state = if self.is_failure() {
            "failed"
        } else if self.missing {
            "skipped"
        } else if self.changed {
            "changed"
        } else {
            "unchanged"
        };
        let mut line = format!("{} [{}] {}", self.step, state, self.file.display());
        if let (Some(old), Some(new)) = (&self.old_value, &self.new_value) {
            if old != new {
                line.push_str(&format!(" ({} -> {})", old, new));
            }
        }
        if self.removed_count > 0 {
            line.push_str(&format!(
                " (removed {} blocks, {} bytes)",
                self.removed_count, self.removed_bytes
            ));
        }
        if let Some(err) = self.errors.first() {
            line.push_str(&format!(": {}", err));
        }
        line
    }
}

/// Runs a fallible rewrite body, converting any error into a failed outcome.
pub fn guarded<F>(step: &str, file: &Path, body: F) -> RewriteOutcome
where
    F: FnOnce() -> Result<RewriteOutcome>,
{
    match body() {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("{} failed on {}: {}", step, file.display(), e);
            RewriteOutcome::failed(step, file, e.to_string())
        }
    }
}

/// Writes `new_text` only when it differs from `old_text`.
///
/// Returns whether the file was written.
pub(crate) fn write_if_changed(path: &Path, old_text: &str, new_text: &str) -> Result<bool> {
    if old_text == new_text {
        return Ok(false);
    }
    fs::write(path, new_text)?;
    Ok(true)
}

/// Collapses runs of blank lines into a single blank line and trims
/// trailing blank lines down to one final newline.
pub(crate) fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        previous_blank = blank;
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    if !text.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Leading whitespace of the line containing byte offset `at`.
pub(crate) fn line_indent(text: &str, at: usize) -> &str {
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Prefixes every non-empty line after the first with `indent`.
pub(crate) fn indent_continuation(snippet: &str, indent: &str) -> String {
    let mut out = String::with_capacity(snippet.len());
    for (i, line) in snippet.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
    out
}
