//! Root scanner: walks one directory tree and turns every bundle it finds into
//! [`SkillMetadata`] records.
//!
//! Failures never abort the walk. Unreadable directories and broken manifests
//! become warnings in [`ScanDiagnostics`] and the walk moves on.

use std::path::{Path, PathBuf};

use {
    serde::Serialize,
    tracing::{debug, warn},
    walkdir::WalkDir,
};

use crate::{
    parse,
    types::{
        DISABLED_SKILL_FILE, Provider, SKILL_FILE, SkillLocation, SkillMetadata,
        bundled_resources, modified_time,
    },
};

/// Directory names under the project/user roots that mark a skill location.
pub const CONVENTIONAL_DIRS: &[&str] = &[".claude", ".codex", ".agent"];

/// How a single root should be scanned.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub provider: Provider,
    /// Force a location instead of deriving it from the path.
    pub location: Option<SkillLocation>,
    pub recursive: bool,
    pub include_disabled: bool,
    /// Project base for location derivation.
    pub cwd: PathBuf,
}

/// Advisory notes collected during a scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanDiagnostics {
    pub scanned_directories: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub conflicts: Vec<String>,
}

impl ScanDiagnostics {
    pub fn extend(&mut self, other: Self) {
        self.scanned_directories.extend(other.scanned_directories);
        self.warnings.extend(other.warnings);
        self.conflicts.extend(other.conflicts);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub skills: Vec<SkillMetadata>,
    pub diagnostics: ScanDiagnostics,
}

/// Scan `root` for bundles.
///
/// A missing root is recorded as scanned and yields nothing. Every visited
/// directory, the root included, may itself be a bundle, and the walk keeps
/// descending into bundles.
pub fn scan_root(root: &Path, opts: &ScanOptions) -> ScanOutcome {
    let mut out = ScanOutcome::default();

    if !root.exists() {
        debug!(root = %root.display(), "skill root does not exist");
        out.diagnostics.scanned_directories.push(root.to_path_buf());
        return out;
    }

    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if !opts.recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                warn!(path = %path.display(), error = %e, "failed to scan directory");
                out.diagnostics
                    .warnings
                    .push(format!("Failed to scan directory {}: {e}", path.display()));
                continue;
            },
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.path();
        out.diagnostics.scanned_directories.push(dir.to_path_buf());
        scan_bundle(dir, opts, &mut out);
    }

    out
}

/// Emit one record per manifest variant present in `dir`.
fn scan_bundle(dir: &Path, opts: &ScanOptions, out: &mut ScanOutcome) {
    let enabled = dir.join(SKILL_FILE);
    let disabled = dir.join(DISABLED_SKILL_FILE);
    let has_enabled = enabled.is_file();
    let has_disabled = opts.include_disabled && disabled.is_file();

    if has_enabled && has_disabled {
        out.diagnostics.conflicts.push(format!(
            "Both {SKILL_FILE} and {DISABLED_SKILL_FILE} found in {}.",
            dir.display()
        ));
    }

    let candidates = [(has_enabled, enabled, false), (has_disabled, disabled, true)];
    for (present, manifest, is_disabled) in candidates {
        if !present {
            continue;
        }
        match parse::parse_skill_file(&manifest) {
            Ok(parsed) => {
                let (has_references, has_scripts, has_assets) = bundled_resources(dir);
                let location = opts
                    .location
                    .unwrap_or_else(|| determine_location(dir, &opts.cwd));
                out.skills.push(SkillMetadata {
                    name: parsed.frontmatter.name,
                    description: parsed.frontmatter.description,
                    provider: opts.provider,
                    location,
                    path: dir.to_path_buf(),
                    disabled: is_disabled,
                    has_references,
                    has_scripts,
                    has_assets,
                    plugin_info: None,
                    modified: modified_time(&manifest),
                });
            },
            Err(e) => {
                warn!(path = %manifest.display(), error = %e, "failed to parse skill manifest");
                out.diagnostics
                    .warnings
                    .push(format!("Failed to parse {}: {e}", manifest.display()));
            },
        }
    }
}

/// Location class of a bundle directory.
///
/// Anything under `<cwd>/{.claude,.codex,.agent}` is project, checked before
/// the user root so a home directory used as a working directory still reads
/// as project. Everything else, user roots and ad-hoc dirs alike, is user.
pub fn determine_location(dir: &Path, cwd: &Path) -> SkillLocation {
    let in_project = CONVENTIONAL_DIRS
        .iter()
        .any(|conventional| dir.starts_with(cwd.join(conventional)));

    if in_project {
        SkillLocation::Project
    } else {
        SkillLocation::User
    }
}
