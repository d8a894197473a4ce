//! # Flow Orchestrator
//!
//! Drives one repository through the migration state machine:
//!
//! ```text
//! Pending -> Cloned -> Classified -> Rewritten -> Verified -> Committed
//!                                        |            |
//!                                 RewriteFailed  VerificationFailed
//! ```
//!
//! Clone, branch, classification and commit errors end the run with an
//! error but leave the state at the last one reached. Rewriters never return
//! `Err`; a failed outcome of a required step moves the run to
//! [`RunState::RewriteFailed`]. Verification failing twice (around one
//! wrapper regeneration) moves it to [`RunState::VerificationFailed`]. Both
//! are terminal, and nothing is committed from either. The working tree is
//! left as it is for inspection.

use crate::classify::{classify, Flow, ProjectStructure, BUILD_SRC, VERSION_CATALOG, WRAPPER_PROPERTIES};
use crate::config::MigrationConfig;
use crate::repository::{CommitOutcome, CommitRequest, VersionControl};
use crate::rewrite::catalog::{self, CatalogOptions};
use crate::rewrite::wrapper::{self, TimeoutAdjustment};
use crate::rewrite::{build_file, pipeline, settings, RewriteOutcome};
use crate::target::RepositoryTarget;
use crate::verify::{remove_artifacts, BuildTool, Verification, VerificationGate};
use crate::version::{detect_gradle_version, parse_distribution, GradleVersion};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a run currently is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Cloned,
    Classified,
    Rewritten,
    Verified,
    Committed,
    RewriteFailed,
    VerificationFailed,
}

impl RunState {
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, RunState::RewriteFailed | RunState::VerificationFailed)
    }
}

/// Everything that happened to one repository.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRun {
    pub target: RepositoryTarget,
    pub work_dir: PathBuf,
    pub flow: Option<Flow>,
    pub state: RunState,
    pub outcomes: Vec<RewriteOutcome>,
    /// One entry per verification attempt; the last one decides.
    pub verification: Vec<Verification>,
    pub commit: Option<CommitOutcome>,
    pub success: bool,
    pub error: Option<String>,
}

impl MigrationRun {
    fn new(target: RepositoryTarget, work_dir: PathBuf) -> Self {
        Self {
            target,
            work_dir,
            flow: None,
            state: RunState::Pending,
            outcomes: Vec::new(),
            verification: Vec::new(),
            commit: None,
            success: false,
            error: None,
        }
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("[{}] {}", self.target.name, message);
        self.success = false;
        self.error = Some(message);
        self
    }

    pub fn final_verification(&self) -> Option<&Verification> {
        self.verification.last()
    }

    pub fn changed_files(&self) -> usize {
        self.outcomes.iter().filter(|o| o.changed).count()
    }
}

/// Runs `attempt`; when it does not pass, runs `remediate` once and attempts
/// again. Returns every attempt made, the last one being authoritative.
pub fn with_remediation<T, A, P, R>(mut attempt: A, passed: P, remediate: R) -> Vec<T>
where
    A: FnMut() -> T,
    P: Fn(&T) -> bool,
    R: FnOnce(),
{
    let first = attempt();
    if passed(&first) {
        return vec![first];
    }
    remediate();
    let second = attempt();
    vec![first, second]
}

/// Outcomes of a flow so far, plus the first required step that failed.
#[derive(Default)]
struct StepLog {
    outcomes: Vec<RewriteOutcome>,
    failure: Option<String>,
}

impl StepLog {
    fn record(&mut self, name: &str, outcome: RewriteOutcome, required: bool) {
        log::debug!("[{}] {}", name, outcome.summary());
        if outcome.is_failure() {
            if required && self.failure.is_none() {
                self.failure = Some(outcome.summary());
            } else if !required {
                log::warn!("[{}] {}", name, outcome.summary());
            }
        }
        self.outcomes.push(outcome);
    }

    fn record_all(&mut self, name: &str, outcomes: Vec<RewriteOutcome>, required: bool) {
        for outcome in outcomes {
            self.record(name, outcome, required);
        }
    }

    fn halted(&self) -> bool {
        self.failure.is_some()
    }
}

/// Resolved paths of the files the rewriters touch. Absent files fall back
/// to their conventional location so they are reported as missing.
struct Targets {
    root: PathBuf,
    settings: PathBuf,
    root_build: PathBuf,
    wrapper: PathBuf,
    catalog: PathBuf,
    build_src_build: PathBuf,
}

impl Targets {
    fn new(structure: &ProjectStructure) -> Self {
        let root = structure.root.clone();
        let build_src = root.join(BUILD_SRC);
        let build_src_build = if build_src.join("build.gradle.kts").is_file() {
            build_src.join("build.gradle.kts")
        } else {
            build_src.join("build.gradle")
        };
        Self {
            settings: structure
                .settings_file
                .clone()
                .unwrap_or_else(|| root.join("settings.gradle")),
            root_build: structure
                .root_build_file
                .clone()
                .unwrap_or_else(|| root.join("build.gradle")),
            wrapper: structure
                .wrapper_properties
                .clone()
                .unwrap_or_else(|| root.join(WRAPPER_PROPERTIES)),
            catalog: structure
                .version_catalog
                .clone()
                .unwrap_or_else(|| root.join(VERSION_CATALOG)),
            build_src_build,
            root,
        }
    }
}

/// Version currently pinned by the wrapper properties, if the file exists
/// and names a parseable distribution.
fn wrapper_version(wrapper_file: &Path) -> Option<GradleVersion> {
    if !wrapper_file.is_file() {
        return None;
    }
    match wrapper::read_distribution_url(wrapper_file) {
        Ok(Some(url)) => parse_distribution(&url).map(|(version, _)| version),
        Ok(None) => None,
        Err(e) => {
            log::warn!("Could not read {}: {}", wrapper_file.display(), e);
            None
        }
    }
}

/// Migrates repositories one at a time with a shared configuration.
pub struct Orchestrator<'a, V: VersionControl, B: BuildTool> {
    config: &'a MigrationConfig,
    vcs: &'a V,
    gate: VerificationGate<'a, B>,
}

impl<'a, V: VersionControl, B: BuildTool> Orchestrator<'a, V, B> {
    pub fn new(config: &'a MigrationConfig, vcs: &'a V, tool: &'a B) -> Self {
        Self {
            config,
            vcs,
            gate: VerificationGate::new(config, tool),
        }
    }

    /// Uses a custom verification gate, e.g. one with a fixed environment.
    pub fn with_gate(mut self, gate: VerificationGate<'a, B>) -> Self {
        self.gate = gate;
        self
    }

    /// Runs the whole state machine for `target`. Never panics or returns
    /// `Err`; failures are recorded in the returned run.
    pub fn run(&self, target: &RepositoryTarget) -> MigrationRun {
        let name = target.name.as_str();
        let work_dir = target.work_dir(&self.config.work_root);
        let mut run = MigrationRun::new(target.clone(), work_dir.clone());

        if work_dir.join(".git").is_dir() {
            log::info!("[{}] Reusing existing checkout at {}", name, work_dir.display());
        } else {
            log::info!("[{}] Cloning {}", name, target.url);
            let timeout = Duration::from_secs(self.config.clone_timeout_secs);
            if let Err(e) = self.vcs.clone_repository(&target.url, &work_dir, timeout) {
                return run.fail(e.to_string());
            }
        }
        if let Err(e) = self
            .vcs
            .checkout_or_create_branch(&work_dir, &self.config.branch_name)
        {
            return run.fail(e.to_string());
        }
        run.state = RunState::Cloned;

        let (flow, structure) = match classify(&work_dir, &self.config.catalog_marker) {
            Ok(classified) => classified,
            Err(e) => return run.fail(e.to_string()),
        };
        log::info!("[{}] Classified as {} flow", name, flow);
        run.flow = Some(flow);
        run.state = RunState::Classified;

        // Rewrites may delete the declaration the version came from.
        let version = detect_gradle_version(&structure);
        let mut timeout_adjustment = None;
        if self.config.verify_only {
            log::info!("[{}] verify_only set, skipping rewrites", name);
        } else {
            let (steps, adjustment) = self.rewrite(name, flow, &structure, version.as_ref());
            run.outcomes = steps.outcomes;
            timeout_adjustment = adjustment;
            if let Some(failure) = steps.failure {
                run.state = RunState::RewriteFailed;
                return run.fail(format!("rewrite failed: {}", failure));
            }
            log::info!("[{}] Rewrote {} files", name, run.changed_files());
        }
        run.state = RunState::Rewritten;

        if self.config.skip_verification {
            log::warn!("[{}] Skipping verification", name);
        } else {
            run.verification = self.verify(target, &work_dir, &structure, version.as_ref());
            let passed = run.final_verification().is_some_and(|v| v.success);
            if !passed {
                let message = run
                    .final_verification()
                    .map(|v| match &v.log_path {
                        Some(path) => format!("{} (see {})", v.message, path.display()),
                        None => v.message.clone(),
                    })
                    .unwrap_or_default();
                run.state = RunState::VerificationFailed;
                return run.fail(format!("verification failed: {}", message));
            }
        }
        run.state = RunState::Verified;

        if self.config.verify_only {
            run.success = true;
            return run;
        }

        if let Some(adjustment) = &timeout_adjustment {
            run.outcomes.push(wrapper::revert_network_timeout(adjustment));
        }

        if self.config.dry_run {
            log::info!("[{}] Dry run, not committing", name);
            run.success = true;
            return run;
        }

        if self.config.keep_artifacts {
            log::info!("[{}] Removing verification artifacts before commit", name);
        }
        remove_artifacts(&work_dir);

        let request = CommitRequest {
            message: &self.config.commit_message,
            branch: &self.config.branch_name,
            user: &self.config.git_user,
            email: &self.config.git_email,
        };
        match self.vcs.commit_and_push(&work_dir, &request) {
            Ok(outcome) => {
                match &outcome {
                    CommitOutcome::Pushed { commit } => {
                        log::info!("[{}] Pushed {} to {}", name, commit, self.config.branch_name)
                    }
                    CommitOutcome::NothingToCommit => {
                        log::info!("[{}] Nothing to commit", name)
                    }
                }
                run.commit = Some(outcome);
                run.state = RunState::Committed;
                run.success = true;
                run
            }
            Err(e) => run.fail(e.to_string()),
        }
    }

    fn rewrite(
        &self,
        name: &str,
        flow: Flow,
        structure: &ProjectStructure,
        version: Option<&GradleVersion>,
    ) -> (StepLog, Option<TimeoutAdjustment>) {
        let targets = Targets::new(structure);
        let mut steps = StepLog::default();

        let adjustment = match flow {
            Flow::Standard | Flow::VersionCatalog => {
                let adjustment = self.standard_steps(name, &targets, version, &mut steps);
                if steps.halted() {
                    return (steps, adjustment);
                }
                if flow == Flow::VersionCatalog {
                    let options = CatalogOptions {
                        version_ref: &self.config.catalog_marker,
                        ensure_modern: false,
                    };
                    steps.record(
                        name,
                        catalog::substitute_catalog_plugins(&targets.catalog, &options),
                        false,
                    );
                    if let Some(plugin) = &self.config.publishing_plugin {
                        steps.record_all(
                            name,
                            build_file::apply_plugin(
                                structure.build_files(),
                                &plugin.marker,
                                &plugin.statement,
                            ),
                            false,
                        );
                    }
                }
                adjustment
            }
            Flow::Platform => {
                let options = CatalogOptions {
                    version_ref: &self.config.catalog_marker,
                    ensure_modern: true,
                };
                steps.record(
                    name,
                    catalog::substitute_catalog_plugins(&targets.catalog, &options),
                    true,
                );
                steps.record(
                    name,
                    catalog::substitute_build_src_dependencies(&targets.build_src_build),
                    true,
                );
                steps.record(name, settings::check_build_src_settings(&targets.root), false);
                steps.record(name, settings::validate_minimal_settings(&targets.settings), true);
                if steps.halted() {
                    return (steps, None);
                }
                let adjustment = self.wrapper_steps(name, &targets, &mut steps);
                if steps.halted() {
                    return (steps, adjustment);
                }
                adjustment
            }
        };

        steps.record_all(name, pipeline::patch_pipelines(&targets.root), false);
        (steps, adjustment)
    }

    fn standard_steps(
        &self,
        name: &str,
        targets: &Targets,
        version: Option<&GradleVersion>,
        steps: &mut StepLog,
    ) -> Option<TimeoutAdjustment> {
        steps.record(
            name,
            settings::remove_stale_blocks(&targets.settings, &self.config.stale_settings_blocks),
            false,
        );
        steps.record(
            name,
            settings::inject_repositories(
                &targets.settings,
                &self.config.artifactory_url,
                version,
                &self.config.settings_templates(),
            ),
            true,
        );
        if steps.halted() {
            return None;
        }
        let adjustment = self.wrapper_steps(name, targets, steps);
        if steps.halted() {
            return adjustment;
        }
        steps.record(name, build_file::remove_wrapper_block(&targets.root_build), false);
        steps.record(name, build_file::strip_legacy_publishing(&targets.root_build), false);
        adjustment
    }

    fn wrapper_steps(
        &self,
        name: &str,
        targets: &Targets,
        steps: &mut StepLog,
    ) -> Option<TimeoutAdjustment> {
        let substitution = wrapper::substitute_distribution_url(
            &targets.wrapper,
            &self.config.artifactory_url,
            &self.config.wrapper_repository_path,
            &self.config.wrapper_floor,
        );
        let missing = substitution.missing;
        steps.record(name, substitution, true);
        if missing || steps.halted() {
            return None;
        }
        let (outcome, adjustment) =
            wrapper::ensure_network_timeout(&targets.wrapper, self.config.network_timeout_ms);
        steps.record(name, outcome, false);
        adjustment
    }

    fn verify(
        &self,
        target: &RepositoryTarget,
        work_dir: &Path,
        structure: &ProjectStructure,
        detected: Option<&GradleVersion>,
    ) -> Vec<Verification> {
        let name = target.name.as_str();
        let wrapper_file = Targets::new(structure).wrapper;
        // The wrapper may have been raised to the floor.
        let version = wrapper_version(&wrapper_file).or_else(|| detected.cloned());

        let attempts = with_remediation(
            || self.gate.verify(work_dir, target, version.as_ref()),
            |v| v.success,
            || {
                log::warn!("[{}] Verification failed, regenerating the wrapper", name);
                match wrapper::read_distribution_url(&wrapper_file) {
                    Ok(Some(url)) => {
                        if let Err(e) = self.gate.remediate(work_dir, &url, version.as_ref()) {
                            log::warn!("[{}] {}", name, e);
                        }
                    }
                    Ok(None) => log::warn!("[{}] No distributionUrl to regenerate from", name),
                    Err(e) => log::warn!("[{}] {}", name, e),
                }
            },
        );
        self.gate.cleanup(work_dir);
        attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::verify::BuildOutput;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockVcs {
        calls: Arc<Mutex<Vec<String>>>,
        staged_artifacts: Arc<Mutex<Vec<String>>>,
        fail_clone: bool,
        nothing_to_commit: bool,
    }

    impl MockVcs {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl VersionControl for MockVcs {
        fn clone_repository(&self, url: &str, dest: &Path, _timeout: Duration) -> Result<()> {
            self.calls.lock().unwrap().push(format!("clone {}", url));
            if self.fail_clone {
                return Err(Error::GitClone {
                    url: url.to_string(),
                    message: "Permission denied (publickey)".to_string(),
                });
            }
            fs::create_dir_all(dest.join(".git"))?;
            Ok(())
        }

        fn checkout_or_create_branch(&self, _work_dir: &Path, branch: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("checkout {}", branch));
            Ok(())
        }

        fn commit_and_push(&self, work_dir: &Path, request: &CommitRequest<'_>) -> Result<CommitOutcome> {
            for artifact in [crate::verify::INIT_SCRIPT_NAME, crate::verify::ISOLATED_CACHE_DIR] {
                if work_dir.join(artifact).exists() {
                    self.staged_artifacts.lock().unwrap().push(artifact.to_string());
                }
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("commit {}", request.branch));
            if self.nothing_to_commit {
                Ok(CommitOutcome::NothingToCommit)
            } else {
                Ok(CommitOutcome::Pushed {
                    commit: "abc123".to_string(),
                })
            }
        }
    }

    struct MockTool {
        exit_codes: Mutex<Vec<i32>>,
        calls: Mutex<Vec<Vec<String>>>,
        envs: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl MockTool {
        /// Exit codes returned in order; the last one repeats.
        fn new(exit_codes: &[i32]) -> Self {
            Self {
                exit_codes: Mutex::new(exit_codes.to_vec()),
                calls: Mutex::new(Vec::new()),
                envs: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn envs(&self) -> Vec<Vec<(String, String)>> {
            self.envs.lock().unwrap().clone()
        }
    }

    impl BuildTool for MockTool {
        fn run(&self, _work_dir: &Path, args: &[String], env: &[(String, String)]) -> Result<BuildOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            self.envs.lock().unwrap().push(env.to_vec());
            // wrapper regeneration always succeeds
            if args.first().map(String::as_str) == Some("wrapper") {
                return Ok(BuildOutput {
                    exit_code: Some(0),
                    output: String::new(),
                });
            }
            let mut codes = self.exit_codes.lock().unwrap();
            let code = if codes.len() > 1 { codes.remove(0) } else { codes[0] };
            Ok(BuildOutput {
                exit_code: Some(code),
                output: if code == 0 {
                    "BUILD SUCCESSFUL\n".to_string()
                } else {
                    "UNRESOLVED_DEPENDENCY: com.acme:core:1.0\n".to_string()
                },
            })
        }

        fn program(&self, _work_dir: &Path) -> String {
            "gradle".to_string()
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    const LEGACY_WRAPPER: &str = "distributionBase=GRADLE_USER_HOME\ndistributionUrl=https\\://nexus.corp/gradle/gradle-6.8.2-all.zip\n";

    struct Fixture {
        dir: TempDir,
        config: MigrationConfig,
        target: RepositoryTarget,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = MigrationConfig {
                artifactory_url: "https://art.corp".to_string(),
                work_root: dir.path().join("work"),
                logs_dir: dir.path().join("logs"),
                ..Default::default()
            };
            config.validate().unwrap();
            let target = RepositoryTarget::parse("git@bitbucket:spk/demo.git").unwrap();
            Self { dir, config, target }
        }

        fn work_dir(&self) -> PathBuf {
            self.target.work_dir(&self.config.work_root)
        }

        /// Pre-populates the checkout so the clone step is skipped.
        fn checkout(&self, files: &[(&str, &str)]) -> PathBuf {
            let work = self.work_dir();
            fs::create_dir_all(work.join(".git")).unwrap();
            for (rel, content) in files {
                let path = work.join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            work
        }

        fn standard_repo(&self) -> PathBuf {
            self.checkout(&[
                ("settings.gradle", "rootProject.name='demo'\n"),
                (
                    "build.gradle",
                    "buildscript {\n    dependencies {\n        classpath 'com.bmuschko:gradle-nexus-plugin:2.3.1'\n    }\n}\napply plugin: 'java'\n",
                ),
                (WRAPPER_PROPERTIES, LEGACY_WRAPPER),
            ])
        }

        fn run(&self, vcs: &MockVcs, tool: &MockTool) -> MigrationRun {
            self.run_with_env(vcs, tool, no_env)
        }

        fn run_with_env(
            &self,
            vcs: &MockVcs,
            tool: &MockTool,
            lookup: crate::verify::EnvLookup,
        ) -> MigrationRun {
            let gate = VerificationGate::new(&self.config, tool).with_env_lookup(lookup);
            Orchestrator::new(&self.config, vcs, tool)
                .with_gate(gate)
                .run(&self.target)
        }
    }

    #[test]
    fn test_with_remediation_stops_after_first_pass() {
        let mut remediated = false;
        let attempts = with_remediation(|| true, |ok| *ok, || remediated = true);
        assert_eq!(attempts, vec![true]);
        assert!(!remediated);
    }

    #[test]
    fn test_with_remediation_retries_once() {
        let mut count = 0;
        let mut remediations = 0;
        let attempts = with_remediation(
            || {
                count += 1;
                count
            },
            |_| false,
            || remediations += 1,
        );
        assert_eq!(attempts, vec![1, 2]);
        assert_eq!(remediations, 1);
    }

    #[test]
    fn test_standard_flow_verification_failure_prevents_commit() {
        let fx = Fixture::new();
        let work = fx.standard_repo();
        let vcs = MockVcs::default();
        let tool = MockTool::new(&[1]);

        let run = fx.run(&vcs, &tool);

        assert_eq!(run.flow, Some(Flow::Standard));
        assert_eq!(run.state, RunState::VerificationFailed);
        assert!(!run.success);
        assert_eq!(run.verification.len(), 2);
        assert!(run.commit.is_none());
        assert!(vcs.calls().iter().all(|c| !c.starts_with("commit")));
        assert!(vcs.calls().iter().all(|c| !c.starts_with("clone")));

        // verify, remediate, verify
        let tool_calls = tool.calls();
        assert_eq!(tool_calls.len(), 3);
        assert_eq!(tool_calls[1][0], "wrapper");

        let settings_text = fs::read_to_string(work.join("settings.gradle")).unwrap();
        assert!(settings_text.starts_with("// Artifactory repositories"));
        assert!(settings_text.contains("https://art.corp/artifactory/libs-release"));
        assert!(settings_text.trim_end().ends_with("rootProject.name='demo'"));

        let wrapper_text = fs::read_to_string(work.join(WRAPPER_PROPERTIES)).unwrap();
        assert!(wrapper_text.contains(
            "distributionUrl=https\\://art.corp/artifactory/libs-release/gradle/wrapper/gradle-6.9.2-all.zip"
        ));

        let build_text = fs::read_to_string(work.join("build.gradle")).unwrap();
        assert!(!build_text.contains("bmuschko"));

        let changed: Vec<_> = run
            .outcomes
            .iter()
            .filter(|o| o.changed)
            .map(|o| o.step.as_str())
            .collect();
        assert!(changed.contains(&settings::STEP_INJECT));
        assert!(changed.contains(&wrapper::STEP_DISTRIBUTION));

        // verification artifacts removed
        assert!(!work.join(crate::verify::INIT_SCRIPT_NAME).exists());
    }

    #[test]
    fn test_success_reverts_timeout_and_commits() {
        let fx = Fixture::new();
        let work = fx.standard_repo();
        let vcs = MockVcs::default();
        let tool = MockTool::new(&[0]);

        let run = fx.run(&vcs, &tool);

        assert!(run.success, "{:?}", run.error);
        assert_eq!(run.state, RunState::Committed);
        assert_eq!(
            run.commit,
            Some(CommitOutcome::Pushed {
                commit: "abc123".to_string()
            })
        );
        assert_eq!(run.verification.len(), 1);
        let wrapper_text = fs::read_to_string(work.join(WRAPPER_PROPERTIES)).unwrap();
        assert!(!wrapper_text.contains("networkTimeout"));
        assert!(run
            .outcomes
            .iter()
            .any(|o| o.step == wrapper::STEP_TIMEOUT_REVERT && o.changed));
    }

    #[test]
    fn test_remediation_recovers() {
        let fx = Fixture::new();
        fx.standard_repo();
        let vcs = MockVcs::default();
        let tool = MockTool::new(&[1, 0]);

        let run = fx.run(&vcs, &tool);
        assert!(run.success);
        assert_eq!(run.verification.len(), 2);
        assert!(!run.verification[0].success);
        assert!(run.verification[1].success);
    }

    #[test]
    fn test_nothing_to_commit_is_success() {
        let fx = Fixture::new();
        fx.standard_repo();
        let vcs = MockVcs {
            nothing_to_commit: true,
            ..Default::default()
        };
        let run = fx.run(&vcs, &MockTool::new(&[0]));
        assert!(run.success);
        assert_eq!(run.commit, Some(CommitOutcome::NothingToCommit));
    }

    #[test]
    fn test_clone_failure_ends_run() {
        let fx = Fixture::new();
        let vcs = MockVcs {
            fail_clone: true,
            ..Default::default()
        };
        let tool = MockTool::new(&[0]);
        let run = fx.run(&vcs, &tool);
        assert!(!run.success);
        assert_eq!(run.state, RunState::Pending);
        assert!(run.error.unwrap().contains("Permission denied"));
        assert!(tool.calls().is_empty());
    }

    #[test]
    fn test_required_rewrite_failure_halts_flow() {
        let fx = Fixture::new();
        fx.checkout(&[
            ("settings.gradle", "rootProject.name='demo'\n"),
            (WRAPPER_PROPERTIES, "distributionUrl=https\\://nexus/custom-distribution.zip\n"),
        ]);
        let vcs = MockVcs::default();
        let tool = MockTool::new(&[0]);
        let run = fx.run(&vcs, &tool);

        assert_eq!(run.state, RunState::RewriteFailed);
        assert!(run.state.is_terminal_failure());
        assert!(run.error.unwrap().contains(wrapper::STEP_DISTRIBUTION));
        assert!(tool.calls().is_empty());
        assert!(vcs.calls().iter().all(|c| !c.starts_with("commit")));
    }

    #[test]
    fn test_platform_flow() {
        let fx = Fixture::new();
        let work = fx.checkout(&[
            ("settings.gradle", "rootProject.name = 'demo'\ninclude 'app'\n"),
            ("buildSrc/build.gradle", "dependencies {\n    implementation libs.plugin.publishing-nexus\n    implementation libs.plugin.repositories-nexus\n}\n"),
            (
                VERSION_CATALOG,
                "[versions]\nplasmaGradlePlugins = \"3.1.0\"\n\n[libraries]\nplugin-publishing-nexus = { module = \"ops.plasma.publishing-nexus:ops.plasma.publishing-nexus.gradle.plugin\", version.ref = \"plasmaGradlePlugins\" }\n",
            ),
            (WRAPPER_PROPERTIES, "distributionUrl=https\\://services.gradle.org/distributions/gradle-7.5.0-bin.zip\n"),
        ]);
        let vcs = MockVcs::default();
        let run = fx.run(&vcs, &MockTool::new(&[0]));

        assert_eq!(run.flow, Some(Flow::Platform));
        assert!(run.success, "{:?}", run.error);
        let catalog_text = fs::read_to_string(work.join(VERSION_CATALOG)).unwrap();
        assert!(catalog_text.contains("plugin-publishing-artifactory"));
        assert!(!catalog_text.contains("publishing-nexus"));
        let wrapper_text = fs::read_to_string(work.join(WRAPPER_PROPERTIES)).unwrap();
        assert!(wrapper_text.contains("gradle-7.5.0-bin.zip"));
        assert!(wrapper_text.contains("art.corp"));
    }

    #[test]
    fn test_verify_only_and_dry_run_never_commit() {
        let mut fx = Fixture::new();
        let work = fx.standard_repo();
        fx.config.verify_only = true;
        let vcs = MockVcs::default();
        let run = fx.run(&vcs, &MockTool::new(&[0]));
        assert!(run.success);
        assert_eq!(run.state, RunState::Verified);
        assert!(run.outcomes.is_empty());
        assert_eq!(
            fs::read_to_string(work.join(WRAPPER_PROPERTIES)).unwrap(),
            LEGACY_WRAPPER
        );

        fx.config.verify_only = false;
        fx.config.dry_run = true;
        let run = fx.run(&vcs, &MockTool::new(&[0]));
        assert!(run.success);
        assert!(run.commit.is_none());
        assert!(vcs.calls().iter().all(|c| !c.starts_with("commit")));
    }

    #[test]
    fn test_kept_artifacts_are_removed_before_commit() {
        let mut fx = Fixture::new();
        let work = fx.standard_repo();
        fx.config.keep_artifacts = true;
        let vcs = MockVcs::default();

        let run = fx.run(&vcs, &MockTool::new(&[0]));

        assert_eq!(run.state, RunState::Committed);
        assert!(vcs.staged_artifacts.lock().unwrap().is_empty());
        assert!(!work.join(crate::verify::INIT_SCRIPT_NAME).exists());
        assert!(!work.join(crate::verify::ISOLATED_CACHE_DIR).exists());
    }

    #[test]
    fn test_dry_run_keeps_artifacts_when_asked() {
        let mut fx = Fixture::new();
        let work = fx.standard_repo();
        fx.config.keep_artifacts = true;
        fx.config.dry_run = true;

        let run = fx.run(&MockVcs::default(), &MockTool::new(&[0]));

        assert!(run.success);
        assert!(work.join(crate::verify::INIT_SCRIPT_NAME).is_file());
        assert!(work.join(crate::verify::ISOLATED_CACHE_DIR).is_dir());
    }

    #[test]
    fn test_version_from_removed_wrapper_block_selects_jdk() {
        fn jdk_env(name: &str) -> Option<String> {
            match name {
                "JAVA_HOME_17" => Some("/jdk17".to_string()),
                "JAVA_HOME_8" | "JAVA_HOME" => Some("/jdk8".to_string()),
                _ => None,
            }
        }

        let fx = Fixture::new();
        let work = fx.checkout(&[
            ("settings.gradle", "rootProject.name='demo'\n"),
            (
                "build.gradle",
                "apply plugin: 'java'\nwrapper {\n    gradleVersion = '7.4'\n}\n",
            ),
        ]);
        let tool = MockTool::new(&[0]);

        let run = fx.run_with_env(&MockVcs::default(), &tool, jdk_env);

        assert_eq!(run.state, RunState::Committed);
        let build = fs::read_to_string(work.join("build.gradle")).unwrap();
        assert!(!build.contains("wrapper {"));
        let envs = tool.envs();
        assert_eq!(envs.len(), 1);
        assert!(envs[0].contains(&("JAVA_HOME".to_string(), "/jdk17".to_string())));
    }

    #[test]
    fn test_skip_verification_commits_without_build() {
        let mut fx = Fixture::new();
        fx.standard_repo();
        fx.config.skip_verification = true;
        let vcs = MockVcs::default();
        let tool = MockTool::new(&[1]);
        let run = fx.run(&vcs, &tool);
        assert!(run.success);
        assert!(run.verification.is_empty());
        assert!(tool.calls().is_empty());
        assert_eq!(run.state, RunState::Committed);
    }

    #[test]
    fn test_run_serializes() {
        let fx = Fixture::new();
        fx.standard_repo();
        let run = fx.run(&MockVcs::default(), &MockTool::new(&[0]));
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["state"], "committed");
        assert_eq!(json["flow"], "standard");
        assert_eq!(json["target"]["namespace"], "spk");
        let _ = &fx.dir;
    }
}
