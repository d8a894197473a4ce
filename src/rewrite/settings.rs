//! Settings-file rewriters.
//!
//! - [`remove_stale_blocks`] strips deprecated global configuration such as
//!   `gradle.allprojects { ... }` without looking inside it.
//! - [`inject_repositories`] adds the Artifactory repository declarations.
//! - [`validate_minimal_settings`] and [`check_build_src_settings`] are the
//!   read-only checks of the platform flow.

use super::templates::render;
use super::{guarded, indent_continuation, line_indent, write_if_changed, RewriteOutcome};
use crate::block::{find_block_span, remove_all_blocks, BlockSpan};
use crate::classify::BUILD_SRC;
use crate::version::GradleVersion;
use std::fs;
use std::path::Path;
use url::Url;

pub const STEP_REMOVE_STALE: &str = "remove-stale-settings";
pub const STEP_INJECT: &str = "inject-repositories";
pub const STEP_VALIDATE: &str = "validate-root-settings";
pub const STEP_BUILD_SRC_SETTINGS: &str = "check-buildsrc-settings";

const DRM: &str = "dependencyResolutionManagement";

/// Settings snippets, borrowed from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct SettingsTemplates<'a> {
    pub legacy: &'a str,
    pub legacy_kotlin: &'a str,
    pub modern: &'a str,
    pub modern_repositories: &'a str,
}

/// Host and path of the base URL, which is what an already-migrated
/// settings file is recognised by.
pub fn base_url_marker(base_url: &str) -> String {
    match Url::parse(base_url) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default();
            let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
            format!("{}{}{}", host, port, url.path().trim_end_matches('/'))
        }
        Err(_) => base_url
            .split_once("://")
            .map_or(base_url, |(_, rest)| rest)
            .trim_end_matches('/')
            .to_string(),
    }
}

/// Removes every block introduced by one of `patterns`.
pub fn remove_stale_blocks(settings: &Path, patterns: &[String]) -> RewriteOutcome {
    if !settings.is_file() {
        return RewriteOutcome::missing(STEP_REMOVE_STALE, settings, "settings file");
    }
    guarded(STEP_REMOVE_STALE, settings, || {
        let original = fs::read_to_string(settings)?;
        let mut text = original.clone();
        let mut outcome = RewriteOutcome::new(STEP_REMOVE_STALE, settings);
        for pattern in patterns {
            let removal = remove_all_blocks(&text, pattern);
            outcome.removed_count += removal.count;
            outcome.removed_bytes += removal.bytes_removed;
            text = removal.text;
        }
        outcome.changed = write_if_changed(settings, &original, &text)?;
        Ok(outcome)
    })
}

/// Injects the Artifactory repository declarations.
///
/// The settings file is left alone when it already mentions the base URL.
/// With a `dependencyResolutionManagement` block present, a `repositories`
/// block is inserted directly before the existing nested one (or before the
/// closing brace when there is none). Otherwise the whole template is
/// prepended: the legacy one for Gradle older than 7 or unknown, the modern
/// one otherwise. The legacy template follows the DSL of the settings file,
/// Kotlin for `.kts` and Groovy for everything else.
pub fn inject_repositories(
    settings: &Path,
    base_url: &str,
    version: Option<&GradleVersion>,
    templates: &SettingsTemplates<'_>,
) -> RewriteOutcome {
    if !settings.is_file() {
        return RewriteOutcome::missing(STEP_INJECT, settings, "settings file");
    }
    guarded(STEP_INJECT, settings, || {
        let original = fs::read_to_string(settings)?;
        let mut outcome = RewriteOutcome::new(STEP_INJECT, settings);

        if original.contains(&base_url_marker(base_url)) {
            return Ok(outcome.with_note("repositories already point at the target base URL"));
        }

        let new_text = match find_block_span(&original, DRM, 0) {
            Some(drm) => {
                let snippet = render(templates.modern_repositories, base_url)?;
                outcome.notes.push(format!("inserted into existing {}", DRM));
                insert_into_drm(&original, drm, &snippet)
            }
            None => {
                let modern = version.is_some_and(|v| v.is_modern());
                let kotlin = is_kotlin_script(settings);
                let (template, kind) = match (modern, kotlin) {
                    (true, _) => (templates.modern, "modern"),
                    (false, true) => (templates.legacy_kotlin, "legacy Kotlin"),
                    (false, false) => (templates.legacy, "legacy"),
                };
                outcome.notes.push(format!("prepended {} template", kind));
                let mut snippet = render(template, base_url)?;
                if !snippet.ends_with('\n') {
                    snippet.push('\n');
                }
                snippet.push('\n');
                snippet.push_str(&original);
                snippet
            }
        };

        outcome.changed = write_if_changed(settings, &original, &new_text)?;
        Ok(outcome)
    })
}

fn is_kotlin_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "kts")
}

fn insert_into_drm(text: &str, drm: BlockSpan, snippet: &str) -> String {
    let nested = find_block_span(text, "repositories", drm.open + 1).filter(|r| r.end <= drm.end);
    let mut out = String::with_capacity(text.len() + snippet.len() + 16);

    match nested {
        Some(repos) => {
            let indent = line_indent(text, repos.start);
            out.push_str(&text[..repos.start]);
            out.push_str(&indent_continuation(snippet, indent));
            out.push('\n');
            out.push_str(indent);
            out.push_str(&text[repos.start..]);
        }
        None => {
            let close = drm.end - 1;
            let drm_indent = line_indent(text, drm.start);
            let inner_indent = format!("{}    ", drm_indent);
            let head = text[..close].trim_end_matches([' ', '\t']);
            out.push_str(head);
            if !head.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&inner_indent);
            out.push_str(&indent_continuation(snippet, &inner_indent));
            out.push('\n');
            out.push_str(drm_indent);
            out.push_str(&text[close..]);
        }
    }
    out
}

/// Checks that the root settings file only names the project and its
/// modules. Comments and blank lines are allowed.
pub fn validate_minimal_settings(settings: &Path) -> RewriteOutcome {
    if !settings.is_file() {
        return RewriteOutcome::failed(STEP_VALIDATE, settings, "root settings file not found");
    }
    guarded(STEP_VALIDATE, settings, || {
        let text = fs::read_to_string(settings)?;
        let mut outcome = RewriteOutcome::new(STEP_VALIDATE, settings);
        outcome.errors = minimal_settings_violations(&text);
        Ok(outcome)
    })
}

fn minimal_settings_violations(text: &str) -> Vec<String> {
    let significant: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//"))
        .collect();

    let mut errors: Vec<String> = significant
        .iter()
        .filter(|l| !(l.starts_with("rootProject.name") || l.starts_with("include")))
        .map(|l| format!("non-minimal content: {}", l))
        .collect();

    if !significant.iter().any(|l| l.starts_with("rootProject.name")) {
        errors.push("rootProject.name declaration not found".to_string());
    }
    errors
}

/// Reports whether `buildSrc` carries its own settings file.
pub fn check_build_src_settings(root: &Path) -> RewriteOutcome {
    let groovy = root.join(BUILD_SRC).join("settings.gradle");
    let kts = root.join(BUILD_SRC).join("settings.gradle.kts");
    match [groovy.clone(), kts].into_iter().find(|p| p.is_file()) {
        Some(found) => RewriteOutcome::new(STEP_BUILD_SRC_SETTINGS, &found)
            .with_note("buildSrc has its own settings file; review its repositories manually"),
        None => RewriteOutcome::missing(STEP_BUILD_SRC_SETTINGS, &groovy, "buildSrc settings file"),
    }
}
