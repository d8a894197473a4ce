//! Version-catalog plugin substitution.
//!
//! Legacy Nexus plugin modules declared in `gradle/libs.versions.toml` are
//! swapped for their Artifactory counterparts, and the matching accessors in
//! `buildSrc/build.gradle` follow. Only the `[libraries]` section of the
//! catalog and the `dependencies { }` block of the build file are touched.

use super::{guarded, write_if_changed, RewriteOutcome};
use crate::block::find_block_span;
use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

pub const STEP_CATALOG: &str = "substitute-catalog-plugins";
pub const STEP_BUILD_SRC: &str = "substitute-buildsrc-plugins";

/// A legacy plugin library and what replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginMapping {
    pub legacy_key: &'static str,
    pub legacy_module: &'static str,
    /// `None` drops the legacy entry without a replacement.
    pub modern: Option<(&'static str, &'static str)>,
}

impl PluginMapping {
    /// Catalog accessor used in build scripts, e.g. `libs.plugin.publishing-nexus`.
    pub fn legacy_accessor(&self) -> String {
        accessor(self.legacy_key)
    }

    pub fn modern_accessor(&self) -> Option<String> {
        self.modern.map(|(key, _)| accessor(key))
    }
}

fn accessor(key: &str) -> String {
    format!("libs.{}", key.replacen("plugin-", "plugin.", 1))
}

pub const PUBLISHING: PluginMapping = PluginMapping {
    legacy_key: "plugin-publishing-nexus",
    legacy_module: "ops.plasma.publishing-nexus:ops.plasma.publishing-nexus.gradle.plugin",
    modern: Some((
        "plugin-publishing-artifactory",
        "ops.plasma.publishing-artifactory:ops.plasma.publishing-artifactory.gradle.plugin",
    )),
};

pub const REPOSITORIES: PluginMapping = PluginMapping {
    legacy_key: "plugin-repositories-nexus",
    legacy_module: "ops.plasma.repositories-nexus:ops.plasma.repositories-nexus.gradle.plugin",
    modern: Some((
        "plugin-repositories-artifactory",
        "ops.plasma.repositories-artifactory:ops.plasma.repositories-artifactory.gradle.plugin",
    )),
};

pub const PLUGIN_MAPPINGS: [PluginMapping; 2] = [PUBLISHING, REPOSITORIES];

fn library_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(\s*)([\w.-]+)\s*=\s*\{\s*module\s*=\s*["']([^"']+)["']\s*,\s*(versions?\.ref)\s*=\s*["']([^"']+)["']\s*\}\s*$"#,
        )
        .expect("library entry regex is valid")
    })
}

/// Options for [`substitute_catalog_plugins`].
#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions<'a> {
    /// Version reference shared by the platform plugins.
    pub version_ref: &'a str,
    /// Append missing modern entries even when no legacy entry was found.
    pub ensure_modern: bool,
}

/// Replaces legacy plugin libraries in the catalog's `[libraries]` section.
///
/// An entry is replaced only when key, module and version reference all
/// match. With `ensure_modern`, modern entries still missing afterwards are
/// appended to the section.
pub fn substitute_catalog_plugins(catalog: &Path, options: &CatalogOptions<'_>) -> RewriteOutcome {
    if !catalog.is_file() {
        return RewriteOutcome::missing(STEP_CATALOG, catalog, "version catalog");
    }
    guarded(STEP_CATALOG, catalog, || {
        let original = fs::read_to_string(catalog)?;
        let mut outcome = RewriteOutcome::new(STEP_CATALOG, catalog);

        let Some((start, end)) = section_bounds(&original, "[libraries]") else {
            if options.ensure_modern {
                return Err(Error::Rewrite {
                    file: catalog.to_path_buf(),
                    message: "[libraries] section not found".to_string(),
                });
            }
            return Ok(outcome.with_note("no [libraries] section"));
        };

        let section = &original[start..end];
        let (mut new_section, replaced) = replace_entries(section, options.version_ref);
        for key in &replaced {
            outcome.notes.push(format!("replaced {}", key));
        }
        outcome.removed_count = replaced.len();

        if options.ensure_modern || !replaced.is_empty() {
            let spelling = ref_spelling(section).unwrap_or("version.ref");
            for (key, module) in PLUGIN_MAPPINGS.iter().filter_map(|m| m.modern) {
                if has_key(&new_section, key) {
                    continue;
                }
                if !new_section.is_empty() && !new_section.ends_with('\n') {
                    new_section.push('\n');
                }
                let trailing_blank = new_section.ends_with("\n\n");
                if trailing_blank {
                    new_section.pop();
                }
                new_section.push_str(&format!(
                    "{} = {{ module = \"{}\", {} = \"{}\" }}\n",
                    key, module, spelling, options.version_ref
                ));
                if trailing_blank {
                    new_section.push('\n');
                }
                outcome.notes.push(format!("added {}", key));
            }
        }

        let new_text = format!("{}{}{}", &original[..start], new_section, &original[end..]);
        outcome.changed = write_if_changed(catalog, &original, &new_text)?;
        Ok(outcome)
    })
}

/// Byte range of a section's body: after its header up to the next `[`
/// header line or end of text.
fn section_bounds(text: &str, header: &str) -> Option<(usize, usize)> {
    let header_at = text.find(header)?;
    let start = header_at + header.len();
    let end = text[start..]
        .match_indices('[')
        .find(|(i, _)| *i == 0 || text[start..].as_bytes()[i - 1] == b'\n')
        .map_or(text.len(), |(i, _)| start + i);
    Some((start, end))
}

fn replace_entries(section: &str, version_ref: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(section.len());
    let mut replaced = Vec::new();

    for line in section.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];
        let replacement = library_entry_regex().captures(body).and_then(|caps| {
            let mapping = PLUGIN_MAPPINGS.iter().find(|m| {
                m.legacy_key == &caps[2] && m.legacy_module == &caps[3] && &caps[5] == version_ref
            })?;
            replaced.push(mapping.legacy_key.to_string());
            Some(mapping.modern.map(|(key, module)| {
                format!(
                    "{}{} = {{ module = \"{}\", {} = \"{}\" }}",
                    &caps[1], key, module, &caps[4], version_ref
                )
            }))
        });

        match replacement {
            Some(Some(new_line)) => {
                out.push_str(&new_line);
                out.push_str(ending);
            }
            Some(None) => {}
            None => out.push_str(line),
        }
    }
    (out, replaced)
}

fn ref_spelling(section: &str) -> Option<&'static str> {
    section.lines().find_map(|line| {
        library_entry_regex().captures(line).map(|caps| {
            if &caps[4] == "versions.ref" {
                "versions.ref"
            } else {
                "version.ref"
            }
        })
    })
}

fn has_key(section: &str, key: &str) -> bool {
    section.lines().any(|line| {
        line.trim_start()
            .strip_prefix(key)
            .is_some_and(|rest| rest.trim_start().starts_with('='))
    })
}

/// Swaps legacy plugin accessors in `buildSrc/build.gradle`'s
/// `dependencies { }` block.
///
/// When the publishing plugin was used without the repositories plugin, a
/// repositories line is synthesized from the publishing one.
pub fn substitute_build_src_dependencies(build_file: &Path) -> RewriteOutcome {
    if !build_file.is_file() {
        return RewriteOutcome::failed(STEP_BUILD_SRC, build_file, "buildSrc build file not found");
    }
    guarded(STEP_BUILD_SRC, build_file, || {
        let original = fs::read_to_string(build_file)?;
        let mut outcome = RewriteOutcome::new(STEP_BUILD_SRC, build_file);
        let span = find_block_span(&original, "dependencies", 0).ok_or_else(|| Error::Rewrite {
            file: build_file.to_path_buf(),
            message: "dependencies block not found".to_string(),
        })?;

        let body = &original[span.body()];
        let new_body = rewrite_dependencies_body(body, &mut outcome)?;
        let new_text = format!(
            "{}{}{}",
            &original[..span.open + 1],
            new_body,
            &original[span.end - 1..]
        );
        outcome.changed = write_if_changed(build_file, &original, &new_text)?;
        Ok(outcome)
    })
}

fn rewrite_dependencies_body(body: &str, outcome: &mut RewriteOutcome) -> Result<String> {
    let publishing_legacy = PUBLISHING.legacy_accessor();
    let repositories_legacy = REPOSITORIES.legacy_accessor();
    let needs_repositories = body.contains(&publishing_legacy) && !body.contains(&repositories_legacy);

    let mut new_body = body.to_string();
    for mapping in PLUGIN_MAPPINGS {
        let (legacy, Some(modern)) = (mapping.legacy_accessor(), mapping.modern_accessor()) else {
            continue;
        };
        if new_body.contains(&legacy) {
            new_body = replace_accessor(&new_body, &legacy, &modern);
            outcome.notes.push(format!("{} -> {}", legacy, modern));
        }
    }

    let (Some(publishing_modern), Some(repositories_modern)) =
        (PUBLISHING.modern_accessor(), REPOSITORIES.modern_accessor())
    else {
        return Ok(new_body);
    };

    if needs_repositories && !new_body.contains(&repositories_modern) {
        let mut lines: Vec<String> = Vec::new();
        for line in new_body.split('\n') {
            lines.push(line.to_string());
            if line.contains(&publishing_modern) && line.contains("implementation") {
                lines.push(replace_accessor(line, &publishing_modern, &repositories_modern));
                outcome.notes.push(format!("added {}", repositories_modern));
            }
        }
        new_body = lines.join("\n");
    }
    Ok(new_body)
}

/// Replaces whole accessor tokens only, so `libs.plugin.publishing-nexus`
/// does not match inside a longer accessor.
fn replace_accessor(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find(from) {
        let after = &rest[i + from.len()..];
        let continues = after
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_');
        out.push_str(&rest[..i]);
        out.push_str(if continues { from } else { to });
        rest = after;
    }
    out.push_str(rest);
    out
}
