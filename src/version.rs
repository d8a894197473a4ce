//! # Gradle Version Detection
//!
//! Parses and compares dotted Gradle versions and works out which Gradle a
//! checked-out repository is built with.
//!
//! ## Detection order
//!
//! 1.  **Wrapper properties**: the version embedded in `distributionUrl`
//!     (`gradle-<version>-<bin|all>.zip`).
//! 2.  **Build scripts**: an explicit `gradleVersion = '<version>'` declaration
//!     in the root build file or the settings file (typically inside a legacy
//!     `wrapper { }` task).
//!
//! When neither yields a version the result is `None`, which callers treat
//! as "legacy Gradle".

use crate::classify::ProjectStructure;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::str::FromStr;
use std::sync::OnceLock;

/// A dotted numeric Gradle version such as `6.8.2` or `8.5`.
///
/// Missing trailing components compare as zero, so `7.0` equals `7.0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GradleVersion {
    parts: Vec<u64>,
}

impl GradleVersion {
    pub fn new(parts: &[u64]) -> Self {
        Self {
            parts: parts.to_vec(),
        }
    }

    /// Parses `major[.minor[.patch...]]`. Anything else yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let parts = s
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self { parts })
    }

    pub fn major(&self) -> u64 {
        self.parts.first().copied().unwrap_or(0)
    }

    pub fn minor(&self) -> u64 {
        self.parts.get(1).copied().unwrap_or(0)
    }

    /// Gradle 7 and later use the modern settings syntax.
    pub fn is_modern(&self) -> bool {
        self.major() >= 7
    }

    fn component(&self, i: usize) -> u64 {
        self.parts.get(i).copied().unwrap_or(0)
    }
}

impl PartialEq for GradleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GradleVersion {}

impl PartialOrd for GradleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GradleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for GradleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", joined.join("."))
    }
}

impl FromStr for GradleVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid Gradle version '{}'", s))
    }
}

impl TryFrom<String> for GradleVersion {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GradleVersion> for String {
    fn from(value: GradleVersion) -> Self {
        value.to_string()
    }
}

/// Distribution archive flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    Bin,
    All,
}

impl DistributionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionKind::Bin => "bin",
            DistributionKind::All => "all",
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn distribution_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"gradle-(\d+(?:\.\d+)*)-(bin|all)\.zip").expect("distribution regex is valid")
    })
}

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"gradleVersion\s*=\s*['"]([\d.]+)['"]"#).expect("declaration regex is valid")
    })
}

/// Extracts version and archive kind from a distribution URL or file name.
pub fn parse_distribution(url: &str) -> Option<(GradleVersion, DistributionKind)> {
    let caps = distribution_regex().captures(url)?;
    let version = GradleVersion::parse(&caps[1])?;
    let kind = if &caps[2] == "all" {
        DistributionKind::All
    } else {
        DistributionKind::Bin
    };
    Some((version, kind))
}

/// Returns the `distributionUrl` value of a wrapper properties file, with
/// property-file escapes left intact.
pub fn distribution_url(properties: &str) -> Option<&str> {
    properties.lines().find_map(|line| {
        let line = line.trim_start();
        let rest = line.strip_prefix("distributionUrl")?;
        let rest = rest.trim_start();
        let value = rest.strip_prefix('=').or_else(|| rest.strip_prefix(':'))?;
        Some(value.trim())
    })
}

/// Finds an explicit `gradleVersion = '...'` declaration in script text.
pub fn declared_version(script: &str) -> Option<GradleVersion> {
    declaration_regex()
        .captures(script)
        .and_then(|caps| GradleVersion::parse(&caps[1]))
}

/// Detects the Gradle version a working tree is built with.
pub fn detect_gradle_version(structure: &ProjectStructure) -> Option<GradleVersion> {
    if let Some(path) = &structure.wrapper_properties {
        if let Ok(text) = fs::read_to_string(path) {
            if let Some((version, _)) = distribution_url(&text).and_then(parse_distribution) {
                log::debug!("Gradle {} detected from {}", version, path.display());
                return Some(version);
            }
        }
    }

    let scripts = [&structure.root_build_file, &structure.settings_file];
    for path in scripts.into_iter().flatten() {
        if let Some(version) = fs::read_to_string(path)
            .ok()
            .and_then(|text| declared_version(&text))
        {
            log::debug!("Gradle {} declared in {}", version, path.display());
            return Some(version);
        }
    }

    None
}
