//! Shared test utilities for the E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = GradleFixture::new().with_standard_project();
//!     fixture.command().arg("inspect").arg(".").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::projects;
    pub use super::GradleFixture;
}

/// Gradle project files used across the tests.
#[allow(dead_code)]
pub mod projects {
    pub const GROOVY_SETTINGS: &str = "rootProject.name = 'ledger'\ninclude 'core'\n";

    pub const STALE_SETTINGS: &str = r#"gradle.allprojects {
    repositories {
        maven { url "https://nexus.corp/repository/public" }
    }
}
rootProject.name = 'ledger'
"#;

    pub const ROOT_BUILD: &str = r#"plugins {
    id 'java'
}

wrapper {
    gradleVersion = '6.8'
}
"#;

    pub const SUBMODULE_BUILD: &str = "dependencies {\n    implementation 'com.google.guava:guava:31.1-jre'\n}\n";

    pub const WRAPPER_6_8: &str = "distributionBase=GRADLE_USER_HOME\ndistributionPath=wrapper/dists\ndistributionUrl=https\\://services.gradle.org/distributions/gradle-6.8-bin.zip\nzipStoreBase=GRADLE_USER_HOME\nzipStorePath=wrapper/dists\n";

    pub const WRAPPER_8_5: &str = "distributionUrl=https\\://nexus.corp/gradle/gradle-8.5-all.zip\nnetworkTimeout=10000\n";

    pub const CATALOG: &str = r#"[versions]
kotlin = "1.9.22"

[plugins]
kotlin-jvm = { id = "org.jetbrains.kotlin.jvm", version.ref = "kotlin" }
"#;

    pub const PLATFORM_CATALOG: &str = r#"[versions]
plasmaGradlePlugins = "2.3.0"

[plugins]
publishing-nexus = { id = "corp.publishing-nexus", version.ref = "plasmaGradlePlugins" }
"#;

    pub const KOTLIN_SETTINGS: &str = "rootProject.name = \"billing\"\ninclude(\"api\")\n";
}

/// A temporary directory laid out like a Gradle project.
pub struct GradleFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl GradleFixture {
    /// Create a new fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// A Groovy multi-module build on Gradle 6.8 without a version catalog.
    pub fn with_standard_project(self) -> Self {
        self.with_file("settings.gradle", projects::GROOVY_SETTINGS)
            .with_file("build.gradle", projects::ROOT_BUILD)
            .with_file("core/build.gradle", projects::SUBMODULE_BUILD)
            .with_file("gradle/wrapper/gradle-wrapper.properties", projects::WRAPPER_6_8)
    }

    /// A Kotlin DSL build with a version catalog but no platform marker.
    pub fn with_catalog_project(self) -> Self {
        self.with_file("settings.gradle.kts", projects::KOTLIN_SETTINGS)
            .with_file("build.gradle.kts", "plugins {\n    alias(libs.plugins.kotlin.jvm)\n}\n")
            .with_file("gradle/libs.versions.toml", projects::CATALOG)
            .with_file("gradle/wrapper/gradle-wrapper.properties", projects::WRAPPER_8_5)
    }

    /// A Kotlin DSL build whose catalog carries the platform marker.
    pub fn with_platform_project(self) -> Self {
        self.with_file("settings.gradle.kts", projects::KOTLIN_SETTINGS)
            .with_file("build.gradle.kts", "plugins {\n    alias(libs.plugins.publishing.nexus)\n}\n")
            .with_file("gradle/libs.versions.toml", projects::PLATFORM_CATALOG)
            .with_file("gradle/wrapper/gradle-wrapper.properties", projects::WRAPPER_8_5)
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a file from the fixture.
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Create a command running in this fixture's directory with a
    /// predictable environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("gradle-relocate");
        cmd.current_dir(self.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("ARTIFACTORY_URL")
            .env_remove("GRADLE_RELOCATE_CONFIG")
            .env_remove("GRADLE_RELOCATE_WORK_ROOT")
            .env_remove("GRADLE_RELOCATE_LOGS_DIR")
            .env_remove("GRADLE_RELOCATE_BRANCH")
            .env_remove("GRADLE_RELOCATE_WORKERS");
        cmd
    }
}

impl Default for GradleFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = GradleFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_standard_project_layout() {
        let fixture = GradleFixture::new().with_standard_project();
        assert!(fixture.path().join("core/build.gradle").exists());
        assert!(fixture.read("settings.gradle").contains("include 'core'"));
    }
}
