//! # Migration Configuration
//!
//! [`MigrationConfig`] holds every tunable of a migration run: the target
//! Artifactory instance, git identity and branch, wrapper policy, settings
//! templates and run modes. It is built once, validated, and then handed to
//! the orchestrator by reference. Nothing in the library reads ambient
//! globals for these values, so tests can substitute their own.
//!
//! ## Sources
//!
//! 1.  Built-in defaults ([`crate::defaults`] and [`crate::rewrite::templates`]).
//! 2.  An optional YAML file (every key optional, unknown keys rejected):
//!
//! ```yaml
//! artifactory_url: https://artifactory.corp.example/artifactory
//! branch_name: feature/artifactory-migration
//! max_workers: 8
//! wrapper_floor: "6.9.2"
//! publishing_plugin:
//!   marker: hzPublish
//!   statement: "apply plugin: 'hzPublish'"
//! ```
//!
//! 3.  CLI flags and their environment fallbacks, applied by the binary.
//!
//! [`MigrationConfig::validate`] must run after the last override; it
//! normalises the base URL and rejects contradictory modes.

use crate::defaults;
use crate::error::{Error, Result};
use crate::rewrite::settings::SettingsTemplates;
use crate::rewrite::templates::{
    BASE_URL_PLACEHOLDER, LEGACY_KOTLIN_SETTINGS_TEMPLATE, LEGACY_SETTINGS_TEMPLATE,
    MODERN_REPOSITORIES_TEMPLATE, MODERN_SETTINGS_TEMPLATE,
};
use crate::version::GradleVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Plugin applied to every build file in the version-catalog flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishingPlugin {
    /// Text whose presence means the plugin is already applied.
    pub marker: String,
    /// Statement inserted when it is not.
    pub statement: String,
}

/// Complete configuration of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    pub artifactory_url: String,
    pub branch_name: String,
    pub commit_message: String,
    /// Parent of the per-repository working directories.
    pub work_root: PathBuf,
    pub max_workers: usize,
    pub wrapper_floor: GradleVersion,
    pub wrapper_repository_path: String,
    pub network_timeout_ms: u64,
    pub clone_timeout_secs: u64,
    /// Give each verification its own Gradle user home.
    pub isolated_cache: bool,
    /// Keep the init script and isolated cache after verifying.
    pub keep_artifacts: bool,
    /// Skip the rewrites and only run the verification gate.
    pub verify_only: bool,
    /// Commit without running the verification gate.
    pub skip_verification: bool,
    /// Never commit or push, even when verification passes.
    pub dry_run: bool,
    pub stale_settings_blocks: Vec<String>,
    pub catalog_marker: String,
    pub publishing_plugin: Option<PublishingPlugin>,
    pub git_user: String,
    pub git_email: String,
    pub logs_dir: PathBuf,
    pub legacy_settings_template: String,
    pub legacy_kotlin_settings_template: String,
    pub modern_settings_template: String,
    pub modern_repositories_template: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            artifactory_url: defaults::DEFAULT_ARTIFACTORY_URL.to_string(),
            branch_name: defaults::DEFAULT_BRANCH_NAME.to_string(),
            commit_message: defaults::DEFAULT_COMMIT_MESSAGE.to_string(),
            work_root: defaults::default_work_root(),
            max_workers: defaults::DEFAULT_MAX_WORKERS,
            wrapper_floor: GradleVersion::new(&[6, 9, 2]),
            wrapper_repository_path: defaults::DEFAULT_WRAPPER_REPOSITORY_PATH.to_string(),
            network_timeout_ms: defaults::DEFAULT_NETWORK_TIMEOUT_MS,
            clone_timeout_secs: defaults::DEFAULT_CLONE_TIMEOUT_SECS,
            isolated_cache: true,
            keep_artifacts: false,
            verify_only: false,
            skip_verification: false,
            dry_run: false,
            stale_settings_blocks: vec![defaults::DEFAULT_STALE_SETTINGS_BLOCK.to_string()],
            catalog_marker: defaults::DEFAULT_CATALOG_MARKER.to_string(),
            publishing_plugin: None,
            git_user: defaults::DEFAULT_GIT_USER.to_string(),
            git_email: defaults::DEFAULT_GIT_EMAIL.to_string(),
            logs_dir: defaults::default_logs_dir(),
            legacy_settings_template: LEGACY_SETTINGS_TEMPLATE.to_string(),
            legacy_kotlin_settings_template: LEGACY_KOTLIN_SETTINGS_TEMPLATE.to_string(),
            modern_settings_template: MODERN_SETTINGS_TEMPLATE.to_string(),
            modern_repositories_template: MODERN_REPOSITORIES_TEMPLATE.to_string(),
        }
    }
}

impl MigrationConfig {
    /// Parses a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            hint: Some("check the --config path".to_string()),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Normalises the base URL and checks the run modes and templates.
    pub fn validate(&mut self) -> Result<()> {
        self.artifactory_url = normalize_base_url(&self.artifactory_url)?;

        if self.branch_name.trim().is_empty() {
            return Err(config_error("branch_name must not be empty", None));
        }
        if self.max_workers == 0 {
            return Err(config_error(
                "max_workers must be at least 1",
                Some("use --workers 1 for sequential processing"),
            ));
        }
        if self.verify_only && self.skip_verification {
            return Err(config_error(
                "verify_only and skip_verification cannot both be set",
                None,
            ));
        }
        for (name, template) in [
            ("legacy_settings_template", &self.legacy_settings_template),
            (
                "legacy_kotlin_settings_template",
                &self.legacy_kotlin_settings_template,
            ),
            ("modern_settings_template", &self.modern_settings_template),
            (
                "modern_repositories_template",
                &self.modern_repositories_template,
            ),
        ] {
            if !template.contains(BASE_URL_PLACEHOLDER) {
                return Err(config_error(
                    &format!("{} has no {} placeholder", name, BASE_URL_PLACEHOLDER),
                    None,
                ));
            }
        }
        if let Some(plugin) = &self.publishing_plugin {
            if plugin.marker.trim().is_empty() || plugin.statement.trim().is_empty() {
                return Err(config_error(
                    "publishing_plugin needs both a marker and a statement",
                    None,
                ));
            }
        }
        Ok(())
    }

    pub fn settings_templates(&self) -> SettingsTemplates<'_> {
        SettingsTemplates {
            legacy: &self.legacy_settings_template,
            legacy_kotlin: &self.legacy_kotlin_settings_template,
            modern: &self.modern_settings_template,
            modern_repositories: &self.modern_repositories_template,
        }
    }
}

fn config_error(message: &str, hint: Option<&str>) -> Error {
    Error::Config {
        message: message.to_string(),
        hint: hint.map(str::to_string),
    }
}

/// Normalises an Artifactory base URL: no trailing slash, and always ending
/// in `/artifactory`.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::Config {
        message: format!("invalid artifactory_url '{}': {}", raw, e),
        hint: Some("expected something like https://artifactory.example.com/artifactory".to_string()),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(config_error(
            &format!("artifactory_url must use http or https, got '{}'", url.scheme()),
            None,
        ));
    }

    let mut normalized = url.as_str().trim_end_matches('/').to_string();
    if !url.path().trim_end_matches('/').ends_with("/artifactory") {
        normalized.push_str("/artifactory");
    }
    Ok(normalized)
}
