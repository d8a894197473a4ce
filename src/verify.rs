//! # Verification Gate
//!
//! After the rewriters run, the repository must still resolve every
//! dependency through the new mirror before anything is committed. The gate
//! runs Gradle with an injected init script that resolves all resolvable
//! configurations of all projects and prints one `UNRESOLVED_DEPENDENCY:`
//! line per failure.
//!
//! Each run gets:
//!
//! - a private `GRADLE_USER_HOME` inside the working directory (unless
//!   `isolated_cache` is off), so concurrent verifications never share a cache
//! - a `JAVA_HOME` picked from the Gradle version (see [`required_jdk`])
//! - wrapper credentials from `ARTIFACTORY_USER` / `ARTIFACTORY_PASSWORD`
//!
//! The combined output is scanned for failure markers and written, together
//! with the command line and a summary, to a log artifact named after the
//! repository. Success is decided by the exit code alone; marker lines seen
//! on a successful run are still reported in [`Verification::unresolved`].
//!
//! The external tool sits behind the [`BuildTool`] trait so the orchestrator
//! can be tested without Gradle installed.

use crate::config::MigrationConfig;
use crate::error::{Error, Result};
use crate::target::RepositoryTarget;
use crate::version::GradleVersion;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const INIT_SCRIPT_NAME: &str = "initResolveAll.gradle";
pub const ISOLATED_CACHE_DIR: &str = ".gradle-user-home";
pub const RESOLVE_TASK: &str = "resolveAllDependencies";

/// Case-insensitive substrings that mark an unresolved dependency.
pub const FAILURE_MARKERS: [&str; 4] = [
    "could not resolve",
    "could not find",
    "unresolved_dependency",
    "failed to resolve",
];

const LOG_FOOTER: &str = "**************END*******************";
const MASK: &str = "****";
const PASSWORD_PROPERTY: &str = "-Dgradle.wrapperPassword=";

/// Init script registering the resolve-everything task in every project.
pub const INIT_SCRIPT: &str = r#"allprojects {
    tasks.register('resolveAllDependencies') {
        doLast {
            project.configurations.findAll { it.canBeResolved }.each { configuration ->
                def lenient = configuration.resolvedConfiguration.lenientConfiguration
                lenient.unresolvedModuleDependencies.each { dependency ->
                    def selector = dependency.selector
                    println "UNRESOLVED_DEPENDENCY: ${selector.group}:${selector.name}:${selector.version}"
                }
            }
        }
    }
}
"#;

/// Banner line that opens a log artifact for `target`.
pub fn log_banner(namespace: &str, name: &str) -> String {
    format!(
        "******************** {}/{} DEPENDENCY RESOLUTION ********************",
        namespace, name
    )
}

/// `{logs_dir}/dependency-resolution-{namespace}-{name}.log`
pub fn log_path(logs_dir: &Path, target: &RepositoryTarget) -> PathBuf {
    logs_dir.join(format!(
        "dependency-resolution-{}-{}.log",
        target.namespace, target.name
    ))
}

/// Exit status and combined output of a build tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl BuildOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for running the external build tool - allows mocking in tests
pub trait BuildTool: Send + Sync {
    /// Runs the tool in `work_dir` with extra arguments and environment.
    fn run(&self, work_dir: &Path, args: &[String], env: &[(String, String)]) -> Result<BuildOutput>;

    /// Program name as shown in the log artifact.
    fn program(&self, work_dir: &Path) -> String;
}

/// Runs `./gradlew` when the repository has one, `gradle` from `PATH`
/// otherwise.
#[derive(Debug, Clone, Default)]
pub struct GradleCli;

impl GradleCli {
    pub fn new() -> Self {
        Self
    }

    fn executable(work_dir: &Path) -> PathBuf {
        let wrapper = work_dir.join("gradlew");
        if wrapper.is_file() {
            wrapper
        } else {
            PathBuf::from("gradle")
        }
    }
}

impl BuildTool for GradleCli {
    fn run(&self, work_dir: &Path, args: &[String], env: &[(String, String)]) -> Result<BuildOutput> {
        let executable = Self::executable(work_dir);
        let output = Command::new(&executable)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Verification {
                message: format!("failed to run {}: {}", executable.display(), e),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(BuildOutput {
            exit_code: output.status.code(),
            output: combined,
        })
    }

    fn program(&self, work_dir: &Path) -> String {
        if work_dir.join("gradlew").is_file() {
            "./gradlew".to_string()
        } else {
            "gradle".to_string()
        }
    }
}

/// Result of one verification attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub success: bool,
    pub message: String,
    pub log_path: Option<PathBuf>,
    /// Deduplicated output lines matching a failure marker.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

impl Verification {
    /// Passed on exit code but printed failure markers anyway.
    pub fn is_suspicious(&self) -> bool {
        self.success && !self.unresolved.is_empty()
    }
}

/// Looks up an environment variable.
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// JDK major version needed to run a given Gradle version.
pub fn required_jdk(version: Option<&GradleVersion>) -> u32 {
    match version {
        Some(v) if *v >= GradleVersion::new(&[7, 3]) => 17,
        _ => 8,
    }
}

/// Finds a Java home for JDK `jdk`, trying `JAVA_HOME_{N}`, `JDK{N}_HOME`,
/// `JAVA{N}_HOME` and finally `JAVA_HOME`.
pub fn find_java_home(jdk: u32, lookup: EnvLookup) -> Option<String> {
    [
        format!("JAVA_HOME_{}", jdk),
        format!("JDK{}_HOME", jdk),
        format!("JAVA{}_HOME", jdk),
        "JAVA_HOME".to_string(),
    ]
    .iter()
    .find_map(|name| lookup(name))
}

/// Output lines containing a failure marker, trimmed and deduplicated in
/// order of first appearance.
pub fn scan_output(output: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    output
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            FAILURE_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(|line| line.trim().to_string())
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

fn display_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    for arg in args {
        if arg.starts_with(PASSWORD_PROPERTY) {
            parts.push(format!("{}{}", PASSWORD_PROPERTY, MASK));
        } else {
            parts.push(arg.clone());
        }
    }
    parts.join(" ")
}

/// Runs verifications and remediations with one configuration.
pub struct VerificationGate<'a, B: BuildTool> {
    config: &'a MigrationConfig,
    tool: &'a B,
    lookup: EnvLookup,
}

impl<'a, B: BuildTool> VerificationGate<'a, B> {
    pub fn new(config: &'a MigrationConfig, tool: &'a B) -> Self {
        Self {
            config,
            tool,
            lookup: process_env,
        }
    }

    /// Replaces the environment lookup used for credentials and Java homes.
    pub fn with_env_lookup(mut self, lookup: EnvLookup) -> Self {
        self.lookup = lookup;
        self
    }

    fn credential_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(user) = (self.lookup)("ARTIFACTORY_USER") {
            args.push(format!("-Dgradle.wrapperUser={}", user));
        }
        if let Some(password) = (self.lookup)("ARTIFACTORY_PASSWORD") {
            args.push(format!("{}{}", PASSWORD_PROPERTY, password));
        }
        args
    }

    fn environment(
        &self,
        work_dir: &Path,
        java_home: Option<&str>,
    ) -> Result<Vec<(String, String)>> {
        let mut env = Vec::new();
        if self.config.isolated_cache {
            let cache = work_dir.join(ISOLATED_CACHE_DIR);
            fs::create_dir_all(&cache)?;
            env.push((
                "GRADLE_USER_HOME".to_string(),
                cache.to_string_lossy().into_owned(),
            ));
        }
        if let Some(home) = java_home {
            env.push(("JAVA_HOME".to_string(), home.to_string()));
        }
        Ok(env)
    }

    /// Runs the dependency check once and writes the log artifact.
    pub fn verify(
        &self,
        work_dir: &Path,
        target: &RepositoryTarget,
        version: Option<&GradleVersion>,
    ) -> Verification {
        let jdk = required_jdk(version);
        let java_home = find_java_home(jdk, self.lookup);

        let mut args = vec![
            "--init-script".to_string(),
            INIT_SCRIPT_NAME.to_string(),
            RESOLVE_TASK.to_string(),
            "--refresh-dependencies".to_string(),
            "--no-daemon".to_string(),
        ];
        args.extend(self.credential_args());
        let command = display_command(&self.tool.program(work_dir), &args);
        log::info!("[{}] Verifying with JDK {}: {}", target.name, jdk, command);

        let run = fs::write(work_dir.join(INIT_SCRIPT_NAME), INIT_SCRIPT)
            .map_err(Error::from)
            .and_then(|()| self.environment(work_dir, java_home.as_deref()))
            .and_then(|env| self.tool.run(work_dir, &args, &env));

        let (success, exit_code, output, mut message) = match run {
            Ok(out) => {
                let message = if out.success() {
                    "dependency resolution succeeded".to_string()
                } else {
                    match out.exit_code {
                        Some(code) => format!("dependency resolution failed with exit code {}", code),
                        None => "dependency resolution was terminated".to_string(),
                    }
                };
                (out.success(), out.exit_code, out.output, message)
            }
            Err(e) => (false, None, String::new(), e.to_string()),
        };

        let unresolved = scan_output(&output);
        if !unresolved.is_empty() {
            message.push_str(&format!(" ({} unresolved dependency lines)", unresolved.len()));
            if success {
                log::warn!(
                    "[{}] Build succeeded but printed {} unresolved dependency lines",
                    target.name,
                    unresolved.len()
                );
            }
        }

        let report = LogReport {
            target,
            command: &command,
            jdk,
            java_home: java_home.as_deref(),
            version,
            exit_code,
            unresolved: &unresolved,
            output: &output,
        };
        let path = log_path(&self.config.logs_dir, target);
        let log_path = match report.write(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                log::warn!("[{}] Could not write {}: {}", target.name, path.display(), e);
                None
            }
        };

        Verification {
            success,
            message,
            log_path,
            unresolved,
        }
    }

    /// Regenerates the wrapper scripts and jar against `distribution_url`.
    pub fn remediate(
        &self,
        work_dir: &Path,
        distribution_url: &str,
        version: Option<&GradleVersion>,
    ) -> Result<BuildOutput> {
        let java_home = find_java_home(required_jdk(version), self.lookup);
        let mut args = vec![
            "wrapper".to_string(),
            "--gradle-distribution-url".to_string(),
            distribution_url.to_string(),
            "--no-daemon".to_string(),
        ];
        args.extend(self.credential_args());
        let env = self.environment(work_dir, java_home.as_deref())?;
        let out = self.tool.run(work_dir, &args, &env)?;
        if !out.success() {
            return Err(Error::Verification {
                message: format!(
                    "wrapper regeneration failed with exit code {}",
                    out.exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
                ),
            });
        }
        Ok(out)
    }

    /// Deletes the init script and isolated cache unless `keep_artifacts`.
    pub fn cleanup(&self, work_dir: &Path) {
        if self.config.keep_artifacts {
            return;
        }
        remove_artifacts(work_dir);
    }
}

/// Deletes the init script and isolated cache regardless of
/// `keep_artifacts`. Must run before anything is staged for commit.
pub fn remove_artifacts(work_dir: &Path) {
    let script = work_dir.join(INIT_SCRIPT_NAME);
    if script.exists() {
        if let Err(e) = fs::remove_file(&script) {
            log::warn!("Could not remove {}: {}", script.display(), e);
        }
    }
    let cache = work_dir.join(ISOLATED_CACHE_DIR);
    if cache.exists() {
        if let Err(e) = fs::remove_dir_all(&cache) {
            log::warn!("Could not remove {}: {}", cache.display(), e);
        }
    }
}

struct LogReport<'a> {
    target: &'a RepositoryTarget,
    command: &'a str,
    jdk: u32,
    java_home: Option<&'a str>,
    version: Option<&'a GradleVersion>,
    exit_code: Option<i32>,
    unresolved: &'a [String],
    output: &'a str,
}

impl LogReport<'_> {
    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&log_banner(&self.target.namespace, &self.target.name));
        out.push('\n');
        out.push_str(&format!(
            "Timestamp: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("Repository: {}\n", self.target.url));
        out.push_str(&format!("Command: {}\n", self.command));
        out.push_str(&format!(
            "JDK {}: {}\n",
            self.jdk,
            self.java_home.unwrap_or("inherited from environment")
        ));
        out.push_str(&format!(
            "Gradle: {}\n",
            self.version.map_or_else(|| "unknown".to_string(), |v| v.to_string())
        ));
        out.push_str(&format!(
            "Exit code: {}\n\n",
            self.exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
        ));

        out.push_str(&format!(
            "---- Unresolved dependencies ({}) ----\n",
            self.unresolved.len()
        ));
        for line in self.unresolved {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("\n---- Output ----\n");
        out.push_str(self.output);
        if !self.output.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(LOG_FOOTER);
        out.push('\n');
        out
    }

    fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        Ok(())
    }
}
