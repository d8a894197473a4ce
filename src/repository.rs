//! # Version Control Collaborator
//!
//! The orchestrator only needs three things from version control: clone a
//! repository, switch to the migration branch, and commit-and-push whatever
//! the rewriters left behind. They are expressed by the [`VersionControl`]
//! trait so the state machine can be driven by mock implementations in
//! tests, while [`GitCli`] wraps the system `git` binary for real runs.
//!
//! Using the system binary means SSH keys, credential helpers and anything
//! configured in `~/.gitconfig` apply unchanged.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// What [`VersionControl::commit_and_push`] needs besides the directory.
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    pub message: &'a str,
    pub branch: &'a str,
    pub user: &'a str,
    pub email: &'a str,
}

/// Result of a commit attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    Pushed { commit: String },
    /// The working tree matched `HEAD`; nothing was pushed.
    NothingToCommit,
}

/// Trait for version-control operations - allows mocking in tests
pub trait VersionControl: Send + Sync {
    /// Clones `url` into `dest`, giving up after `timeout`.
    fn clone_repository(&self, url: &str, dest: &Path, timeout: Duration) -> Result<()>;

    /// Checks out `branch`, creating it from the current `HEAD` if needed.
    fn checkout_or_create_branch(&self, work_dir: &Path, branch: &str) -> Result<()>;

    /// Stages everything, commits and pushes to `origin`.
    fn commit_and_push(&self, work_dir: &Path, request: &CommitRequest<'_>) -> Result<CommitOutcome>;
}

/// [`VersionControl`] backed by the system `git` command.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn git(&self, work_dir: &Path, args: &[&str]) -> Result<Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(work_dir)
            .output()
            .map_err(|e| Error::GitCommand {
                command: args.join(" "),
                dir: work_dir.to_path_buf(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command: args.join(" "),
                dir: work_dir.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl VersionControl for GitCli {
    fn clone_repository(&self, url: &str, dest: &Path, timeout: Duration) -> Result<()> {
        let clone_error = |message: String| Error::GitClone {
            url: url.to_string(),
            message,
        };

        // git refuses to clone into a non-empty directory
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut child = Command::new("git")
            .args(["clone", "--quiet", url])
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| clone_error(e.to_string()))?;
        // Read stderr while polling so a chatty clone cannot fill the pipe.
        let stderr_reader = child.stderr.take().map(drain);

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(clone_error(format!(
                        "timed out after {} seconds",
                        timeout.as_secs()
                    )));
                }
                Ok(None) => thread::sleep(Duration::from_millis(200)),
                Err(e) => return Err(clone_error(e.to_string())),
            }
        };

        if !status.success() {
            let stderr = stderr_reader
                .and_then(|reader| reader.join().ok())
                .unwrap_or_default();
            let message = if stderr.contains("Permission denied")
                || stderr.contains("Authentication failed")
                || stderr.contains("Could not read from remote repository")
            {
                format!(
                    "Authentication failed. Make sure your SSH key is loaded or git credentials are configured.\nError: {}",
                    stderr.trim()
                )
            } else {
                stderr.trim().to_string()
            };
            return Err(clone_error(message));
        }

        Ok(())
    }

    fn checkout_or_create_branch(&self, work_dir: &Path, branch: &str) -> Result<()> {
        if self.git(work_dir, &["checkout", "--quiet", branch]).is_ok() {
            log::debug!("Checked out existing branch {}", branch);
            return Ok(());
        }
        self.git(work_dir, &["checkout", "--quiet", "-b", branch])?;
        log::debug!("Created branch {}", branch);
        Ok(())
    }

    fn commit_and_push(&self, work_dir: &Path, request: &CommitRequest<'_>) -> Result<CommitOutcome> {
        self.git(work_dir, &["config", "user.name", request.user])?;
        self.git(work_dir, &["config", "user.email", request.email])?;
        self.git(work_dir, &["add", "-A"])?;

        let status = self.git(work_dir, &["status", "--porcelain"])?;
        if String::from_utf8_lossy(&status.stdout).trim().is_empty() {
            return Ok(CommitOutcome::NothingToCommit);
        }

        self.git(work_dir, &["commit", "--quiet", "-m", request.message])?;
        let head = self.git(work_dir, &["rev-parse", "HEAD"])?;
        let commit = String::from_utf8_lossy(&head.stdout).trim().to_string();

        self.git(work_dir, &["push", "--quiet", "-u", "origin", request.branch])?;
        Ok(CommitOutcome::Pushed { commit })
    }
}

/// Reads `pipe` to the end on a background thread, lossily decoded.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn run(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// A bare origin with one commit, returned with its file URL.
    fn origin_with_commit(tmp: &TempDir) -> (PathBuf, String) {
        let seed = tmp.path().join("seed");
        let origin = tmp.path().join("origin.git");
        fs::create_dir_all(&seed).unwrap();
        run(&seed, &["init", "--quiet", "-b", "main"]);
        fs::write(seed.join("settings.gradle"), "rootProject.name = 'demo'\n").unwrap();
        run(&seed, &["add", "-A"]);
        run(
            &seed,
            &[
                "-c",
                "user.name=t",
                "-c",
                "user.email=t@t",
                "commit",
                "--quiet",
                "-m",
                "init",
            ],
        );
        run(
            tmp.path(),
            &["clone", "--quiet", "--bare", "seed", "origin.git"],
        );
        let url = format!("file://{}", origin.display());
        (origin, url)
    }

    fn request() -> CommitRequest<'static> {
        CommitRequest {
            message: "Migrate to Artifactory",
            branch: "feature/migration",
            user: "relocate",
            email: "relocate@localhost",
        }
    }

    #[test]
    fn test_commit_outcome_serializes_with_status_tag() {
        let json = serde_json::to_string(&CommitOutcome::NothingToCommit).unwrap();
        assert_eq!(json, "{\"status\":\"nothing_to_commit\"}");
        let json = serde_json::to_string(&CommitOutcome::Pushed {
            commit: "abc".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"commit\":\"abc\""));
    }

    #[test]
    fn test_drain_reads_output_larger_than_a_pipe_buffer() {
        let mut noisy = b"remote: Counting objects\n".repeat(20_000);
        noisy.extend_from_slice(&[0xff, b'\n']);
        let expected = noisy.len();

        let text = drain(std::io::Cursor::new(noisy)).join().unwrap();
        assert!(text.starts_with("remote: Counting objects"));
        assert!(text.contains('\u{fffd}'));
        assert!(text.len() >= expected);
    }

    #[test]
    fn test_git_command_error_in_missing_dir() {
        let err = GitCli::new()
            .checkout_or_create_branch(Path::new("/nonexistent/dir"), "x")
            .unwrap_err();
        assert!(matches!(err, Error::GitCommand { .. }));
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_clone_branch_commit_push_round() {
        let tmp = TempDir::new().unwrap();
        let (origin, url) = origin_with_commit(&tmp);
        let work = tmp.path().join("work");
        let git = GitCli::new();

        git.clone_repository(&url, &work, Duration::from_secs(60)).unwrap();
        git.checkout_or_create_branch(&work, "feature/migration").unwrap();

        let nothing = git.commit_and_push(&work, &request()).unwrap();
        assert_eq!(nothing, CommitOutcome::NothingToCommit);

        fs::write(work.join("settings.gradle"), "rootProject.name = 'migrated'\n").unwrap();
        let pushed = git.commit_and_push(&work, &request()).unwrap();
        assert!(matches!(pushed, CommitOutcome::Pushed { .. }));

        let branches = Command::new("git")
            .args(["branch", "--list", "feature/migration"])
            .current_dir(&origin)
            .output()
            .unwrap();
        assert!(String::from_utf8_lossy(&branches.stdout).contains("feature/migration"));

        // second checkout finds the existing branch
        git.checkout_or_create_branch(&work, "feature/migration").unwrap();
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_clone_failure_reports_url() {
        let tmp = TempDir::new().unwrap();
        let url = format!("file://{}", tmp.path().join("missing.git").display());
        let err = GitCli::new()
            .clone_repository(&url, &tmp.path().join("work"), Duration::from_secs(30))
            .unwrap_err();
        match err {
            Error::GitClone { url: reported, .. } => assert_eq!(reported, url),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
