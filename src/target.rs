//! Repository targets.
//!
//! A [`RepositoryTarget`] is derived once from an origin URL in any of the
//! usual SSH or HTTPS forms and never changes afterwards.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Namespace used when the URL has a single path segment.
pub const UNKNOWN_NAMESPACE: &str = "unknown";

/// One repository to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryTarget {
    pub url: String,
    /// Repository short name, e.g. `billing-service`.
    pub name: String,
    /// Owning project or organisation, e.g. `spk`.
    pub namespace: String,
}

impl RepositoryTarget {
    /// Derives name and namespace by splitting on `:` and `/` and dropping a
    /// trailing `.git`.
    ///
    /// Returns `None` when no name can be derived.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let trimmed = url.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let segments: Vec<&str> = trimmed
            .split([':', '/'])
            .filter(|s| !s.is_empty())
            .collect();
        let name = segments.last()?.to_string();
        // A bare scheme is not a namespace.
        let namespace = if segments.len() >= 3 || (segments.len() == 2 && !url.contains("://")) {
            segments[segments.len() - 2].to_string()
        } else {
            UNKNOWN_NAMESPACE.to_string()
        };

        Some(Self {
            url: url.to_string(),
            name,
            namespace,
        })
    }

    /// `namespace/name`, used as a log prefix and in status lines.
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Working directory name below the work root.
    pub fn work_dir_name(&self) -> String {
        format!("mig_{}_{}", sanitize(&self.namespace), sanitize(&self.name))
    }

    pub fn work_dir(&self, work_root: &Path) -> PathBuf {
        work_root.join(self.work_dir_name())
    }
}

impl fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Parses a repository list: one URL per line, blank lines and `#` comments
/// skipped.
pub fn parse_repository_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
