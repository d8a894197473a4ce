//! Build script rewriters.
//!
//! - [`remove_wrapper_block`] drops the deprecated `wrapper { }` task
//!   configuration from the root build file.
//! - [`strip_legacy_publishing`] removes the `com.bmuschko.nexus` publishing
//!   setup.
//! - [`apply_plugin`] adds an `apply plugin:` statement to every build file
//!   that does not mention the plugin yet.

use super::{collapse_blank_lines, guarded, write_if_changed, RewriteOutcome};
use crate::block::{find_block_span, remove_all_blocks, remove_first_matching_named_block};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const STEP_WRAPPER_BLOCK: &str = "remove-wrapper-block";
pub const STEP_LEGACY_PUBLISHING: &str = "strip-nexus-publishing";
pub const STEP_APPLY_PLUGIN: &str = "apply-plugin";

/// Variables inside an `ext { }` block that mark it as Nexus configuration.
const NEXUS_EXT_KEYS: [&str; 4] = [
    "uploadArchivesUrl",
    "nexusCredentials",
    "nexusUsername",
    "nexusPassword",
];

fn legacy_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?mi)^[ \t]*(?:classpath\s*\(?\s*["']com\.bmuschko:gradle-nexus-plugin[^"']*["']\s*\)?|apply\s+plugin\s*:\s*["']com\.bmuschko\.nexus["']|uploadArchives\.enabled\s*=\s*(?:true|false)|def\s+nexusCredentialsLocation\s*=.*)[ \t]*\r?\n?"#,
        )
        .expect("legacy publishing regex is valid")
    })
}

/// Removes the first `wrapper { }` block of the root build file.
pub fn remove_wrapper_block(build_file: &Path) -> RewriteOutcome {
    if !build_file.is_file() {
        return RewriteOutcome::missing(STEP_WRAPPER_BLOCK, build_file, "root build file");
    }
    guarded(STEP_WRAPPER_BLOCK, build_file, || {
        let original = fs::read_to_string(build_file)?;
        let removal = remove_first_matching_named_block(&original, "wrapper");
        let mut outcome = RewriteOutcome::new(STEP_WRAPPER_BLOCK, build_file);
        outcome.removed_count = removal.count;
        outcome.removed_bytes = removal.bytes_removed;
        outcome.changed = write_if_changed(build_file, &original, &removal.text)?;
        Ok(outcome)
    })
}

/// Strips the legacy Nexus publishing setup from a build file.
///
/// Removes the plugin classpath and `apply plugin:` lines,
/// `uploadArchives.enabled` toggles, the credentials location, every
/// `nexus { }` block, Nexus `ext { }` blocks and the credentials
/// `if (ext.nexusCredentials.exists()) { }` guard.
pub fn strip_legacy_publishing(build_file: &Path) -> RewriteOutcome {
    if !build_file.is_file() {
        return RewriteOutcome::missing(STEP_LEGACY_PUBLISHING, build_file, "root build file");
    }
    guarded(STEP_LEGACY_PUBLISHING, build_file, || {
        let original = fs::read_to_string(build_file)?;
        let mut outcome = RewriteOutcome::new(STEP_LEGACY_PUBLISHING, build_file);

        let removed_lines = legacy_line_regex().find_iter(&original).count();
        let mut text = legacy_line_regex().replace_all(&original, "").into_owned();

        let mut blocks = 0;
        for pattern in ["nexus", "if (ext.nexusCredentials.exists())"] {
            let removal = remove_all_blocks(&text, pattern);
            blocks += removal.count;
            text = removal.text;
        }
        let (without_ext, ext_blocks) = remove_nexus_ext_blocks(&text);
        text = without_ext;
        blocks += ext_blocks;

        if removed_lines + blocks == 0 {
            return Ok(outcome);
        }

        let text = collapse_blank_lines(&text);
        outcome.removed_count = removed_lines + blocks;
        outcome.removed_bytes = original.len().saturating_sub(text.len());
        outcome.changed = write_if_changed(build_file, &original, &text)?;
        Ok(outcome)
    })
}

fn remove_nexus_ext_blocks(text: &str) -> (String, usize) {
    let mut current = text.to_string();
    let mut removed = 0;
    let mut from = 0;
    while let Some(span) = find_block_span(&current, "ext", from) {
        let body = &current[span.body()];
        if NEXUS_EXT_KEYS.iter().any(|k| body.contains(k)) {
            let mut end = span.end;
            if current[end..].starts_with('\n') {
                end += 1;
            }
            current.replace_range(span.start..end, "");
            removed += 1;
            from = span.start;
        } else {
            from = span.end;
        }
    }
    (current, removed)
}

/// Adds `statement` to every build file that does not contain `marker`.
///
/// The statement goes at the top of the file, after any leading
/// `buildscript { }` and `plugins { }` blocks, which Gradle requires to come
/// first.
pub fn apply_plugin<'a, I>(build_files: I, marker: &str, statement: &str) -> Vec<RewriteOutcome>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    build_files
        .into_iter()
        .map(|file| apply_plugin_to_file(file, marker, statement))
        .collect()
}

fn apply_plugin_to_file(file: &Path, marker: &str, statement: &str) -> RewriteOutcome {
    if !file.is_file() {
        return RewriteOutcome::missing(STEP_APPLY_PLUGIN, file, "build file");
    }
    guarded(STEP_APPLY_PLUGIN, file, || {
        let original = fs::read_to_string(file)?;
        let outcome = RewriteOutcome::new(STEP_APPLY_PLUGIN, file);
        if original.contains(marker) {
            return Ok(outcome);
        }

        let at = insertion_point(&original);
        let mut new_text = String::with_capacity(original.len() + statement.len() + 2);
        new_text.push_str(&original[..at]);
        if at > 0 && !original[..at].ends_with('\n') {
            new_text.push('\n');
        }
        new_text.push_str(statement.trim_end());
        new_text.push('\n');
        if at > 0 || !original.is_empty() {
            new_text.push('\n');
        }
        new_text.push_str(original[at..].trim_start_matches('\n'));

        let mut outcome = outcome;
        outcome.new_value = Some(statement.trim().to_string());
        outcome.changed = write_if_changed(file, &original, &new_text)?;
        Ok(outcome)
    })
}

/// Byte offset just past the leading `buildscript`/`plugins` blocks, or 0.
fn insertion_point(text: &str) -> usize {
    let mut at = 0;
    loop {
        let rest = &text[at..];
        let skipped = skip_trivia(rest);
        let next = &rest[skipped..];
        let leading = ["buildscript", "plugins"].iter().find_map(|name| {
            if next.starts_with(name) {
                find_block_span(rest, name, skipped).filter(|s| s.start == skipped)
            } else {
                None
            }
        });
        match leading {
            Some(span) => {
                at += span.end;
                if text[at..].starts_with('\n') {
                    at += 1;
                }
            }
            None => return at,
        }
    }
}

/// Length of leading whitespace and `//` comment lines.
fn skip_trivia(text: &str) -> usize {
    let mut i = 0;
    loop {
        let rest = &text[i..];
        let trimmed = rest.trim_start();
        i += rest.len() - trimmed.len();
        if trimmed.starts_with("//") {
            i += trimmed.find('\n').map_or(trimmed.len(), |n| n + 1);
        } else {
            return i;
        }
    }
}
