//! End-to-end tests for the `migrate` command.
//!
//! Tests that need a real `git` binary push to a bare repository created in
//! a temp directory and are gated behind the `integration-tests` feature.

mod common;
use common::prelude::*;
use std::path::Path;
use std::process::Command;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Creates `origin/spk/ledger.git` seeded with the standard fixture project
/// and returns its path.
fn seed_origin(fixture: &GradleFixture) -> std::path::PathBuf {
    let seed = GradleFixture::new()
        .with_standard_project()
        .with_file("settings.gradle", projects::STALE_SETTINGS);
    git(seed.path(), &["init", "--quiet", "--initial-branch=main"]);
    git(seed.path(), &["config", "user.name", "Seeder"]);
    git(seed.path(), &["config", "user.email", "seeder@localhost"]);
    git(seed.path(), &["add", "-A"]);
    git(seed.path(), &["commit", "--quiet", "-m", "initial"]);

    let origin = fixture.path().join("origin/spk/ledger.git");
    std::fs::create_dir_all(&origin).unwrap();
    git(&origin, &["init", "--quiet", "--bare"]);
    git(
        seed.path(),
        &["push", "--quiet", origin.to_str().unwrap(), "main"],
    );
    git(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    origin
}

#[test]
fn test_migrate_without_repositories_fails() {
    let fixture = GradleFixture::new();

    fixture
        .command()
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No repositories to migrate"));
}

#[test]
fn test_migrate_rejects_invalid_artifactory_url() {
    let fixture = GradleFixture::new();

    fixture
        .command()
        .args(["migrate", "--repo", "git@h:spk/a.git"])
        .args(["--artifactory-url", "ftp://art.corp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http or https"));
}

#[test]
fn test_migrate_rejects_broken_config_file() {
    let fixture = GradleFixture::new().with_file("relocate.yaml", "max_workers: [1, 2\n");

    fixture
        .command()
        .args(["migrate", "--repo", "git@h:spk/a.git", "--config", "relocate.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("relocate.yaml"));
}

#[test]
fn test_migrate_conflicting_modes_is_usage_error() {
    let fixture = GradleFixture::new();

    fixture
        .command()
        .args(["migrate", "--repo", "git@h:spk/a.git"])
        .args(["--verify-only", "--skip-verification"])
        .assert()
        .code(2);
}

#[test]
fn test_migrate_reports_clone_failure() {
    let fixture = GradleFixture::new();
    let missing = fixture.path().join("nowhere/spk/ghost.git");

    fixture
        .command()
        .arg("migrate")
        .arg("--repo")
        .arg(&missing)
        .args(["--work-root", "work", "--logs-dir", "logs", "--report", "report.json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[FAILED] spk/ghost"))
        .stdout(predicate::str::contains("0/1 repositories migrated, 1 failed"))
        .stderr(predicate::str::contains("1 of 1 repositories failed"));

    let report: serde_json::Value =
        serde_json::from_str(&fixture.read("report.json")).unwrap();
    assert_eq!(report["total"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["runs"][0]["state"], "pending");
    assert_eq!(report["runs"][0]["success"], false);
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_migrate_pushes_rewritten_branch() {
    let fixture = GradleFixture::new();
    let origin = seed_origin(&fixture);

    fixture
        .command()
        .arg("migrate")
        .arg("--repo")
        .arg(&origin)
        .args(["--artifactory-url", "https://art.corp"])
        .args(["--work-root", "work", "--logs-dir", "logs"])
        .args(["--git-user", "Relocator", "--git-email", "relocator@localhost"])
        .arg("--skip-verification")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] spk/ledger (standard"))
        .stdout(predicate::str::contains("1/1 repositories migrated, 0 failed"));

    let settings = fixture.read("work/mig_spk_ledger/settings.gradle");
    assert!(settings.contains("https://art.corp/artifactory/libs-release"));
    assert!(!settings.contains("gradle.allprojects"));
    let build = fixture.read("work/mig_spk_ledger/build.gradle");
    assert!(!build.contains("wrapper {"));

    let branches = git(&origin, &["branch", "--list"]);
    assert!(branches.contains("feature/artifactory-migration"));
    let author = git(
        &origin,
        &["log", "-1", "--format=%an", "feature/artifactory-migration"],
    );
    assert_eq!(author.trim(), "Relocator");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_migrate_dry_run_pushes_nothing() {
    let fixture = GradleFixture::new();
    let origin = seed_origin(&fixture);

    fixture
        .command()
        .arg("migrate")
        .arg("--repo")
        .arg(&origin)
        .args(["--work-root", "work", "--logs-dir", "logs"])
        .args(["--skip-verification", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    let branches = git(&origin, &["branch", "--list"]);
    assert!(!branches.contains("feature/artifactory-migration"));
    assert!(fixture
        .read("work/mig_spk_ledger/settings.gradle")
        .contains("artifactory.example.com/artifactory"));
}
