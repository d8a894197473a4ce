//! Default values for gradle-relocate configuration.
//!
//! This module provides centralized default values used by the configuration
//! layer and the CLI, so every entry point agrees on them.

use std::path::PathBuf;

/// Default Artifactory base URL.
pub const DEFAULT_ARTIFACTORY_URL: &str = "https://artifactory.example.com/artifactory";

/// Branch the migration is committed to.
pub const DEFAULT_BRANCH_NAME: &str = "feature/artifactory-migration";

pub const DEFAULT_COMMIT_MESSAGE: &str = "Migrate Gradle build from Nexus to Artifactory";

/// Oldest Gradle version the wrapper is allowed to point at.
pub const DEFAULT_WRAPPER_FLOOR: &str = "6.9.2";

/// Path below the Artifactory base where Gradle distributions are mirrored.
pub const DEFAULT_WRAPPER_REPOSITORY_PATH: &str = "libs-release/gradle/wrapper";

/// `networkTimeout` used while verifying, in milliseconds.
pub const DEFAULT_NETWORK_TIMEOUT_MS: u64 = 600_000;

pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Settings-file construct that configured the old Nexus repositories.
pub const DEFAULT_STALE_SETTINGS_BLOCK: &str = "gradle.allprojects";

/// Key in `[versions]` marking a platform-managed version catalog.
pub const DEFAULT_CATALOG_MARKER: &str = "plasmaGradlePlugins";

pub const DEFAULT_GIT_USER: &str = "gradle-relocate";
pub const DEFAULT_GIT_EMAIL: &str = "gradle-relocate@localhost";

/// Returns the default root for per-repository working directories.
///
/// Uses the platform temporary directory so interrupted batches can resume
/// from the same location on the next run.
pub fn default_work_root() -> PathBuf {
    std::env::temp_dir().join("gradle-relocate")
}

/// Returns the default directory for dependency-resolution log artifacts.
///
/// Prefers the platform cache directory, e.g. `~/.cache/gradle-relocate/logs`
/// on Linux, and falls back to the temporary directory.
pub fn default_logs_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("gradle-relocate")
        .join("logs")
}
