//! # Error Handling
//!
//! Centralized error type for `gradle-relocate`. Every fallible library
//! function returns [`Result<T>`], and the variants carry enough context
//! (repository URL, file path, command) for an operator to act on a failure
//! without opening the per-repository log artifact.
//!
//! Note that most migration failures never surface as an `Err`: rewriters and
//! the verification gate fold their problems into
//! [`RewriteOutcome`](crate::rewrite::RewriteOutcome) and
//! [`Verification`](crate::verify::Verification) records. The variants below
//! are reserved for run-level failures (clone, branch, unreadable tree) and
//! for the plumbing underneath the rewriters.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gradle-relocate operations
#[derive(Error, Debug)]
pub enum Error {
    /// The migration configuration is invalid.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// Cloning a repository failed or timed out.
    #[error("Git clone error for {url}: {message}")]
    GitClone { url: String, message: String },

    /// A git command other than clone failed inside a working directory.
    #[error("Git command failed in {}: {command} - {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// The working tree could not be read while classifying it.
    #[error("Classification error for {}: {message}", root.display())]
    Classification { root: PathBuf, message: String },

    /// A rewriter hit an unrecoverable problem with one file.
    #[error("Rewrite error in {}: {message}", file.display())]
    Rewrite { file: PathBuf, message: String },

    /// The build tool could not be launched at all.
    #[error("Verification error: {message}")]
    Verification { message: String },

    /// A settings template could not be rendered.
    #[error("Template error: {message}")]
    Template { message: String },

    /// The worker pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
