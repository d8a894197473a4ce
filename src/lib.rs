//! # Gradle Relocate Library
//!
//! Migrates Gradle builds that resolve and publish through Nexus so that
//! they use Artifactory instead, across many repositories at once. The
//! `gradle-relocate` binary is a thin CLI over this library.
//!
//! ## Quick Example
//!
//! ```
//! use gradle_relocate::block::{find_block, remove_all_blocks};
//!
//! let settings = "gradle.allprojects {\n    repositories { mavenCentral() }\n}\nrootProject.name = 'demo'\n";
//! assert_eq!(find_block(settings, "gradle.allprojects"), Some((0, 58)));
//!
//! let removal = remove_all_blocks(settings, "gradle.allprojects");
//! assert_eq!(removal.text, "rootProject.name = 'demo'\n");
//! assert_eq!(removal.count, 1);
//! ```
//!
//! ## Core Concepts
//!
//! - **Block Editor (`block`)**: brace-counting search and removal of
//!   `name { ... }` constructs in Groovy/Kotlin build scripts. Braces in
//!   strings and comments are not understood.
//! - **Classifier (`classify`)**: picks one of three flows from the files in
//!   a working tree: `Standard`, `VersionCatalog` or `Platform`.
//! - **Rewriters (`rewrite`)**: independent, idempotent edits of one file
//!   each, reporting a [`rewrite::RewriteOutcome`] instead of failing.
//! - **Verification (`verify`)**: resolves every dependency with Gradle in an
//!   isolated cache and writes a log artifact per repository.
//! - **Orchestrator (`orchestrator`)**: the per-repository state machine that
//!   only commits once verification passes.
//! - **Collaborators (`repository`, `verify::BuildTool`)**: git and Gradle
//!   behind traits, so everything above can be tested with mocks.
//!
//! ## Execution Flow
//!
//! For each repository, on its own worker thread (`batch`):
//!
//! 1.  **Clone** the repository, or reuse an existing checkout, and switch to
//!     the migration branch.
//! 2.  **Classify** the tree.
//! 3.  **Rewrite** the settings, wrapper, catalog, build and pipeline files in
//!     the flow's fixed order.
//! 4.  **Verify** dependency resolution, regenerating the wrapper and trying
//!     once more on failure.
//! 5.  **Commit** and push, after undoing the verification-only
//!     `networkTimeout` bump.

pub mod aggregate;
pub mod batch;
pub mod block;
pub mod classify;
pub mod config;
pub mod defaults;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod repository;
pub mod rewrite;
pub mod target;
pub mod verify;
pub mod version;

mod block_proptest;
