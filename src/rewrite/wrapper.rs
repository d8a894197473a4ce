//! Wrapper properties rewriter.
//!
//! Points `distributionUrl` at the Artifactory mirror, raising the Gradle
//! version to the configured floor when needed, and manages the temporary
//! `networkTimeout` bump used while verifying.

use super::{guarded, write_if_changed, RewriteOutcome};
use crate::error::{Error, Result};
use crate::version::{distribution_url, parse_distribution, DistributionKind, GradleVersion};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const STEP_DISTRIBUTION: &str = "substitute-wrapper-url";
pub const STEP_TIMEOUT: &str = "network-timeout";
pub const STEP_TIMEOUT_REVERT: &str = "revert-network-timeout";

/// Builds the mirrored distribution URL, unescaped.
pub fn mirror_distribution_url(
    base_url: &str,
    repository_path: &str,
    version: &GradleVersion,
    kind: DistributionKind,
) -> String {
    format!(
        "{}/{}/gradle-{}-{}.zip",
        base_url.trim_end_matches('/'),
        repository_path.trim_matches('/'),
        version,
        kind
    )
}

/// Escapes `:` the way Gradle writes it into properties files.
pub fn escape_property(value: &str) -> String {
    value.replace("\\:", ":").replace(':', "\\:")
}

pub fn unescape_property(value: &str) -> String {
    value.replace("\\:", ":")
}

/// Rewrites `distributionUrl` against the mirror.
///
/// Versions below `floor` are raised to it with the `all` distribution.
/// `new_value` on the outcome holds the unescaped URL.
pub fn substitute_distribution_url(
    properties: &Path,
    base_url: &str,
    repository_path: &str,
    floor: &GradleVersion,
) -> RewriteOutcome {
    if !properties.is_file() {
        return RewriteOutcome::missing(STEP_DISTRIBUTION, properties, "wrapper properties");
    }
    guarded(STEP_DISTRIBUTION, properties, || {
        let original = fs::read_to_string(properties)?;
        let old_raw = distribution_url(&original).ok_or_else(|| Error::Rewrite {
            file: properties.to_path_buf(),
            message: "distributionUrl not found".to_string(),
        })?;
        let (mut version, mut kind) = parse_distribution(old_raw).ok_or_else(|| Error::Rewrite {
            file: properties.to_path_buf(),
            message: format!("unable to extract Gradle version from '{}'", old_raw),
        })?;

        let mut outcome = RewriteOutcome::new(STEP_DISTRIBUTION, properties);
        if version < *floor {
            outcome.notes.push(format!(
                "raised Gradle {} to the {} floor",
                version, floor
            ));
            version = floor.clone();
            kind = DistributionKind::All;
        }

        let new_url = mirror_distribution_url(base_url, repository_path, &version, kind);
        let new_raw = if old_raw.contains("\\:") {
            escape_property(&new_url)
        } else {
            new_url.clone()
        };

        outcome.old_value = Some(unescape_property(old_raw));
        outcome.new_value = Some(new_url);

        let new_text = replace_property(&original, "distributionUrl", &new_raw);
        outcome.changed = write_if_changed(properties, &original, &new_text)?;
        Ok(outcome)
    })
}

/// Record of a `networkTimeout` bump, used to undo it before committing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeoutAdjustment {
    pub file: PathBuf,
    /// Value before the bump; `None` when the property was added.
    pub previous: Option<String>,
    pub applied: u64,
    /// A newline was appended to a file that did not end with one.
    pub added_newline: bool,
}

/// Ensures `networkTimeout` is at least `timeout_ms`.
///
/// Returns the adjustment made, if any, so it can be reverted later.
pub fn ensure_network_timeout(
    properties: &Path,
    timeout_ms: u64,
) -> (RewriteOutcome, Option<TimeoutAdjustment>) {
    if !properties.is_file() {
        return (
            RewriteOutcome::missing(STEP_TIMEOUT, properties, "wrapper properties"),
            None,
        );
    }
    let mut adjustment = None;
    let outcome = guarded(STEP_TIMEOUT, properties, || {
        let original = fs::read_to_string(properties)?;
        let mut outcome = RewriteOutcome::new(STEP_TIMEOUT, properties);
        let current = property_value(&original, "networkTimeout").map(str::to_string);
        let mut added_newline = false;

        let new_text = match &current {
            None => {
                let mut text = original.clone();
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                    added_newline = true;
                }
                text.push_str(&format!("networkTimeout={}\n", timeout_ms));
                text
            }
            Some(value) => match value.parse::<u64>() {
                Ok(n) if n >= timeout_ms => original.clone(),
                Ok(_) => replace_property(&original, "networkTimeout", &timeout_ms.to_string()),
                Err(_) => {
                    return Err(Error::Rewrite {
                        file: properties.to_path_buf(),
                        message: format!("networkTimeout '{}' is not a number", value),
                    })
                }
            },
        };

        outcome.old_value = current.clone();
        outcome.changed = write_if_changed(properties, &original, &new_text)?;
        if outcome.changed {
            outcome.new_value = Some(timeout_ms.to_string());
            adjustment = Some(TimeoutAdjustment {
                file: properties.to_path_buf(),
                previous: current,
                applied: timeout_ms,
                added_newline,
            });
        }
        Ok(outcome)
    });
    (outcome, adjustment)
}

/// Undoes a [`TimeoutAdjustment`].
///
/// Nothing is touched when the property no longer holds the applied value,
/// e.g. after the wrapper files were regenerated.
pub fn revert_network_timeout(adjustment: &TimeoutAdjustment) -> RewriteOutcome {
    let path = adjustment.file.as_path();
    if !path.is_file() {
        return RewriteOutcome::missing(STEP_TIMEOUT_REVERT, path, "wrapper properties");
    }
    guarded(STEP_TIMEOUT_REVERT, path, || {
        let original = fs::read_to_string(path)?;
        let mut outcome = RewriteOutcome::new(STEP_TIMEOUT_REVERT, path);
        let applied = adjustment.applied.to_string();

        if property_value(&original, "networkTimeout") != Some(applied.as_str()) {
            return Ok(outcome.with_note("networkTimeout no longer holds the applied value"));
        }

        let new_text = match &adjustment.previous {
            Some(previous) => replace_property(&original, "networkTimeout", previous),
            None => {
                let mut text = remove_property(&original, "networkTimeout");
                if adjustment.added_newline && text.ends_with('\n') {
                    text.pop();
                }
                text
            }
        };
        outcome.old_value = Some(applied);
        outcome.new_value = adjustment.previous.clone();
        outcome.changed = write_if_changed(path, &original, &new_text)?;
        Ok(outcome)
    })
}

fn property_key(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with('!') {
        return None;
    }
    let sep = trimmed.find(['=', ':'])?;
    Some((trimmed[..sep].trim(), trimmed[sep + 1..].trim()))
}

fn property_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .filter_map(property_key)
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Replaces the value of `key`, keeping the key and separator formatting.
fn replace_property(text: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(text.len() + value.len());
    for line in text.split_inclusive('\n') {
        let is_target = property_key(line).is_some_and(|(k, _)| k == key);
        if !is_target {
            out.push_str(line);
            continue;
        }
        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];
        let value_start = body
            .find(['=', ':'])
            .map(|sep| {
                let after = &body[sep + 1..];
                sep + 1 + (after.len() - after.trim_start().len())
            })
            .unwrap_or(body.len());
        out.push_str(&body[..value_start]);
        out.push_str(value);
        out.push_str(ending);
    }
    out
}

fn remove_property(text: &str, key: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| !property_key(line).is_some_and(|(k, _)| k == key))
        .collect()
}

/// Reads the wrapper properties and returns the unescaped distribution URL.
pub fn read_distribution_url(properties: &Path) -> Result<Option<String>> {
    let text = fs::read_to_string(properties)?;
    Ok(distribution_url(&text).map(unescape_property))
}
