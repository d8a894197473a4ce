//! Settings-file snippets injected by the repository rewriter.
//!
//! Each template carries a single `{base_url}` placeholder that is replaced by
//! the normalised Artifactory base URL. The defaults below can be overridden
//! through the configuration file.

use crate::error::{Error, Result};

pub const BASE_URL_PLACEHOLDER: &str = "{base_url}";

/// Prepended to the settings file of Gradle builds older than 7.
pub const LEGACY_SETTINGS_TEMPLATE: &str = r#"// Artifactory repositories for dependency resolution
gradle.beforeProject { project ->
    project.repositories {
        maven {
            url "{base_url}/libs-release"
            credentials {
                username = System.getProperty("gradle.wrapperUser")
                password = System.getProperty("gradle.wrapperPassword")
            }
        }
        maven {
            url "{base_url}/libs-snapshot"
            credentials {
                username = System.getProperty("gradle.wrapperUser")
                password = System.getProperty("gradle.wrapperPassword")
            }
        }
    }
}
"#;

/// Kotlin DSL counterpart of [`LEGACY_SETTINGS_TEMPLATE`], used for
/// `settings.gradle.kts`.
pub const LEGACY_KOTLIN_SETTINGS_TEMPLATE: &str = r#"// Artifactory repositories for dependency resolution
gradle.beforeProject {
    repositories {
        maven {
            url = uri("{base_url}/libs-release")
            credentials {
                username = System.getProperty("gradle.wrapperUser")
                password = System.getProperty("gradle.wrapperPassword")
            }
            authentication {
                create<BasicAuthentication>("basic")
            }
        }
        maven {
            url = uri("{base_url}/libs-snapshot")
            credentials {
                username = System.getProperty("gradle.wrapperUser")
                password = System.getProperty("gradle.wrapperPassword")
            }
            authentication {
                create<BasicAuthentication>("basic")
            }
        }
    }
}
"#;

/// Prepended to modern settings files that have no
/// `dependencyResolutionManagement` block yet.
pub const MODERN_SETTINGS_TEMPLATE: &str = r#"// Artifactory repositories for dependency resolution
dependencyResolutionManagement {
    repositories {
        maven {
            url = uri("{base_url}/libs-release")
            credentials {
                username = System.getProperty("gradle.wrapperUser")
                password = System.getProperty("gradle.wrapperPassword")
            }
        }
        maven {
            url = uri("{base_url}/libs-snapshot")
            credentials {
                username = System.getProperty("gradle.wrapperUser")
                password = System.getProperty("gradle.wrapperPassword")
            }
        }
    }
}
"#;

/// Inserted inside an existing `dependencyResolutionManagement` block.
pub const MODERN_REPOSITORIES_TEMPLATE: &str = r#"repositories {
    maven {
        url = uri("{base_url}/libs-release")
        credentials {
            username = System.getProperty("gradle.wrapperUser")
            password = System.getProperty("gradle.wrapperPassword")
        }
    }
    maven {
        url = uri("{base_url}/libs-snapshot")
        credentials {
            username = System.getProperty("gradle.wrapperUser")
            password = System.getProperty("gradle.wrapperPassword")
        }
    }
}"#;

/// Line added to Jenkins pipelines so wrapper downloads authenticate.
pub const JENKINS_GRADLE_PARAMS: &str = r#"env.GRADLE_PARAMS = " -Dgradle.wrapperUser=\${ORG_GRADLE_PROJECT_artifactory_user} -Dgradle.wrapperPassword=\${ORG_GRADLE_PROJECT_artifactory_password}""#;

/// Substitutes the base URL into a template.
pub fn render(template: &str, base_url: &str) -> Result<String> {
    if !template.contains(BASE_URL_PLACEHOLDER) {
        return Err(Error::Template {
            message: format!("template is missing the {} placeholder", BASE_URL_PLACEHOLDER),
        });
    }
    Ok(template.replace(BASE_URL_PLACEHOLDER, base_url.trim_end_matches('/')))
}
