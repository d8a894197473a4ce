//! End-to-end tests for the `inspect` command.
//!
//! These tests run the binary against small Gradle projects on disk and check
//! the reported flow and file layout. Nothing in the project may change.

mod common;
use common::prelude::*;

#[test]
fn test_inspect_standard_project() {
    let fixture = GradleFixture::new().with_standard_project();

    fixture
        .command()
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("[FLOW] standard flow"))
        .stdout(predicate::str::contains("root build file:    build.gradle"))
        .stdout(predicate::str::contains("version catalog:    (none)"))
        .stdout(predicate::str::contains("submodule builds:   1"))
        .stdout(predicate::str::contains("gradle version:     6.8"));
}

#[test]
fn test_inspect_catalog_project() {
    let fixture = GradleFixture::new().with_catalog_project();

    fixture
        .command()
        .arg("inspect")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("version-catalog flow"))
        .stdout(predicate::str::contains("settings file:      settings.gradle.kts"))
        .stdout(predicate::str::contains("gradle version:     8.5"));
}

#[test]
fn test_inspect_platform_project() {
    let fixture = GradleFixture::new().with_platform_project();

    fixture
        .command()
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("platform flow"));
}

#[test]
fn test_inspect_custom_catalog_marker() {
    let fixture = GradleFixture::new().with_catalog_project();

    fixture
        .command()
        .arg("inspect")
        .arg("--catalog-marker")
        .arg("kotlin")
        .assert()
        .success()
        .stdout(predicate::str::contains("platform flow"));
}

#[test]
fn test_inspect_json_output() {
    let fixture = GradleFixture::new().with_standard_project();

    let output = fixture
        .command()
        .arg("inspect")
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["flow"], "standard");
    assert_eq!(json["gradle_version"], "6.8");
    assert_eq!(json["structure"]["has_catalog_marker"], false);
    assert_eq!(
        json["structure"]["submodule_build_files"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_inspect_without_version_warns() {
    let fixture = GradleFixture::new()
        .with_file("settings.gradle", projects::GROOVY_SETTINGS)
        .with_file("build.gradle", "plugins { id 'java' }\n");

    fixture
        .command()
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gradle version not detected"));
}

#[test]
fn test_inspect_leaves_project_untouched() {
    let fixture = GradleFixture::new()
        .with_standard_project()
        .with_file("settings.gradle", projects::STALE_SETTINGS);

    fixture.command().arg("inspect").assert().success();

    assert_eq!(fixture.read("settings.gradle"), projects::STALE_SETTINGS);
    assert_eq!(fixture.read("build.gradle"), projects::ROOT_BUILD);
}

#[test]
fn test_inspect_missing_directory_fails() {
    let fixture = GradleFixture::new();

    fixture
        .command()
        .arg("inspect")
        .arg("does-not-exist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}
