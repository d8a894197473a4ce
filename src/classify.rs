//! # Project Classifier
//!
//! Inspects a checked-out working tree and decides which migration [`Flow`]
//! applies, recording the file paths the rewriters need in a
//! [`ProjectStructure`] snapshot.
//!
//! ## Flow selection
//!
//! Two predicates are evaluated in a fixed precedence:
//!
//! 1.  The version catalog (`gradle/libs.versions.toml`) declares the platform
//!     marker inside its `[versions]` section ⇒ [`Flow::Platform`].
//! 2.  The catalog exists but lacks the marker ⇒ [`Flow::VersionCatalog`].
//! 3.  No catalog ⇒ [`Flow::Standard`].
//!
//! An unreadable catalog is treated as absent.
//!
//! The snapshot is not refreshed automatically. Any step that creates or
//! deletes files must call [`classify`] again before relying on paths.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Relative path of the wrapper properties file.
pub const WRAPPER_PROPERTIES: &str = "gradle/wrapper/gradle-wrapper.properties";

/// Relative path of the version catalog.
pub const VERSION_CATALOG: &str = "gradle/libs.versions.toml";

/// Directory holding build logic private to the build tool.
pub const BUILD_SRC: &str = "buildSrc";

const ROOT_BUILD_FILES: [&str; 2] = ["build.gradle", "build.gradle.kts"];
const SETTINGS_FILES: [&str; 2] = ["settings.gradle", "settings.gradle.kts"];

/// Directories never descended into while scanning.
const SKIPPED_DIRS: [&str; 5] = [".git", ".gradle", "build", ".gradle-user-home", "node_modules"];

/// Which migration procedure a repository needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Standard,
    VersionCatalog,
    Platform,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Standard => "standard",
            Flow::VersionCatalog => "version-catalog",
            Flow::Platform => "platform",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the interesting files in a working tree.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStructure {
    pub root: PathBuf,
    pub root_build_file: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
    pub wrapper_properties: Option<PathBuf>,
    pub version_catalog: Option<PathBuf>,
    /// Raw catalog text, cached when the catalog was readable.
    #[serde(skip)]
    pub catalog_text: Option<String>,
    /// Build scripts below the root, excluding `buildSrc`.
    pub submodule_build_files: Vec<PathBuf>,
    pub has_catalog_marker: bool,
}

impl ProjectStructure {
    /// A structure with nothing discovered yet.
    pub fn empty(root: PathBuf) -> Self {
        Self {
            root,
            root_build_file: None,
            settings_file: None,
            wrapper_properties: None,
            version_catalog: None,
            catalog_text: None,
            submodule_build_files: Vec::new(),
            has_catalog_marker: false,
        }
    }

    /// Root and submodule build files, in that order.
    pub fn build_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.root_build_file
            .iter()
            .chain(self.submodule_build_files.iter())
    }

    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Classifies the working tree at `root`.
///
/// Fails only when the tree itself cannot be read.
pub fn classify(root: &Path, catalog_marker: &str) -> Result<(Flow, ProjectStructure)> {
    if !root.is_dir() {
        return Err(Error::Classification {
            root: root.to_path_buf(),
            message: "working tree does not exist or is not a directory".to_string(),
        });
    }

    let mut structure = ProjectStructure::empty(root.to_path_buf());
    structure.root_build_file = first_existing(root, &ROOT_BUILD_FILES);
    structure.settings_file = first_existing(root, &SETTINGS_FILES);

    let wrapper = root.join(WRAPPER_PROPERTIES);
    if wrapper.is_file() {
        structure.wrapper_properties = Some(wrapper);
    }

    structure.submodule_build_files = submodule_build_files(root)?;

    let catalog = root.join(VERSION_CATALOG);
    if catalog.is_file() {
        match fs::read_to_string(&catalog) {
            Ok(text) => {
                structure.has_catalog_marker = versions_section_contains(&text, catalog_marker);
                structure.catalog_text = Some(text);
                structure.version_catalog = Some(catalog);
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable version catalog {}: {}",
                    catalog.display(),
                    e
                );
            }
        }
    }

    let flow = if structure.has_catalog_marker {
        Flow::Platform
    } else if structure.version_catalog.is_some() {
        Flow::VersionCatalog
    } else {
        Flow::Standard
    };

    log::debug!(
        "Classified {} as {} ({} submodule build files)",
        root.display(),
        flow,
        structure.submodule_build_files.len()
    );

    Ok((flow, structure))
}

/// Returns the text of the `[versions]` section: everything after the header
/// up to the next `[` or end of text.
pub fn versions_section(catalog: &str) -> Option<&str> {
    let start = catalog.find("[versions]")? + "[versions]".len();
    let rest = &catalog[start..];
    let end = rest.find('[').unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Whether `marker` appears inside the `[versions]` section.
pub fn versions_section_contains(catalog: &str, marker: &str) -> bool {
    versions_section(catalog).is_some_and(|section| section.contains(marker))
}

fn first_existing(root: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn submodule_build_files(root: &Path) -> Result<Vec<PathBuf>> {
    let build_src = root.join(BUILD_SRC);
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e) && e.path() != build_src);

    for entry in walker {
        let entry = entry.map_err(|e| Error::Classification {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.depth() < 2 || !entry.file_type().is_file() {
            continue;
        }
        let is_build_script = entry
            .file_name()
            .to_str()
            .is_some_and(|name| ROOT_BUILD_FILES.contains(&name));
        if is_build_script {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}
