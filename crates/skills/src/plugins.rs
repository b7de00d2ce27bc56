//! Plugin expander: turns the Claude `installed_plugins.json` manifest into
//! skill records, with an optional directory fallback when no manifest-driven
//! records come out.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
    walkdir::WalkDir,
};

use crate::{
    parse,
    types::{
        PluginInfo, Provider, SKILL_FILE, SkillLocation, SkillMetadata, bundled_resources,
        modified_time,
    },
};

/// Marketplace and version recorded for fallback-discovered plugins.
pub const LOCAL_MARKETPLACE: &str = "local";

/// Top-level shape of `installed_plugins.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledPlugins {
    pub version: u32,
    /// Keyed by `plugin@marketplace`.
    pub plugins: BTreeMap<String, PluginEntry>,
}

/// One installed plugin. Every field is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    pub version: String,
    pub installed_at: String,
    pub last_updated: String,
    pub install_path: String,
    pub git_commit_sha: String,
    pub is_local: bool,
}

#[derive(Debug, Clone)]
pub struct PluginOptions {
    pub manifest_path: PathBuf,
    /// Base for relative install paths, and parent of the fallback `skills/` dir.
    pub install_root: PathBuf,
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginDiagnostics {
    /// Manifest path plus every install path visited.
    pub scanned_plugins: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PluginOutcome {
    pub skills: Vec<SkillMetadata>,
    pub diagnostics: PluginDiagnostics,
}

impl PluginDiagnostics {
    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Expand installed plugins into skill records.
pub fn expand_plugins(opts: &PluginOptions) -> PluginOutcome {
    let mut out = PluginOutcome::default();
    out.diagnostics
        .scanned_plugins
        .push(opts.manifest_path.clone());

    if let Some(installed) = load_installed_plugins(&opts.manifest_path, &mut out.diagnostics) {
        for (key, entry) in &installed.plugins {
            expand_entry(key, entry, &opts.install_root, &mut out);
        }
    }

    if out.skills.is_empty() && opts.fallback {
        scan_fallback(&opts.install_root.join("skills"), &mut out);
    }

    info!(
        count = out.skills.len(),
        warnings = out.diagnostics.warnings.len(),
        "expanded plugin skills"
    );
    out
}

/// Read and validate the manifest. Any failure is a warning and `None`.
pub fn load_installed_plugins(
    path: &Path,
    diagnostics: &mut PluginDiagnostics,
) -> Option<InstalledPlugins> {
    if !path.exists() {
        diagnostics.warn(format!("Plugins file not found at {}", path.display()));
        return None;
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            diagnostics.warn(format!(
                "Failed to load {}: {e}",
                path.display()
            ));
            return None;
        },
    };

    match serde_json::from_str(&raw) {
        Ok(installed) => Some(installed),
        Err(e) => {
            diagnostics.warn(format!(
                "Invalid installed_plugins.json format at {}: {e}",
                path.display()
            ));
            None
        },
    }
}

fn expand_entry(key: &str, entry: &PluginEntry, install_root: &Path, out: &mut PluginOutcome) {
    let Some((plugin_name, marketplace)) = split_plugin_key(key) else {
        out.diagnostics
            .warn(format!("Skipping plugin with malformed key '{key}'"));
        return;
    };

    let install_path = resolve_install_path(&entry.install_path, install_root);
    out.diagnostics.scanned_plugins.push(install_path.clone());

    if !install_path.exists() {
        out.diagnostics.warn(format!(
            "Install path for plugin {key} does not exist: {}",
            install_path.display()
        ));
        return;
    }

    let info = PluginInfo {
        plugin_name: plugin_name.to_string(),
        marketplace: marketplace.to_string(),
        version: entry.version.clone(),
    };
    let before = out.skills.len();
    for manifest in find_manifests(&install_path, &mut out.diagnostics) {
        push_plugin_skill(&manifest, &info, out);
    }

    if out.skills.len() == before {
        out.diagnostics.warn(format!(
            "Plugin {key} has no skills under {}",
            install_path.display()
        ));
    }
}

/// Each subdirectory of `root` is treated as a plugin named after it.
fn scan_fallback(root: &Path, out: &mut PluginOutcome) {
    if !root.is_dir() {
        debug!(root = %root.display(), "no fallback plugin directory");
        return;
    }
    out.diagnostics.scanned_plugins.push(root.to_path_buf());

    for manifest in find_manifests(root, &mut out.diagnostics) {
        let plugin_name = manifest
            .strip_prefix(root)
            .ok()
            .and_then(|rel| rel.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .filter(|_| manifest.parent() != Some(root));

        let Some(plugin_name) = plugin_name else {
            out.diagnostics.warn(format!(
                "Skipping {} outside a plugin directory",
                manifest.display()
            ));
            continue;
        };

        let info = PluginInfo {
            plugin_name,
            marketplace: LOCAL_MARKETPLACE.to_string(),
            version: LOCAL_MARKETPLACE.to_string(),
        };
        push_plugin_skill(&manifest, &info, out);
    }
}

fn push_plugin_skill(manifest: &Path, info: &PluginInfo, out: &mut PluginOutcome) {
    let Some(dir) = manifest.parent() else {
        return;
    };

    match parse::parse_skill_file(manifest) {
        Ok(parsed) => {
            let (has_references, has_scripts, has_assets) = bundled_resources(dir);
            out.skills.push(SkillMetadata {
                name: plugin_skill_name(&info.plugin_name, &parsed.frontmatter.name),
                description: parsed.frontmatter.description,
                provider: Provider::Claude,
                location: SkillLocation::Plugin,
                path: dir.to_path_buf(),
                disabled: false,
                has_references,
                has_scripts,
                has_assets,
                plugin_info: Some(info.clone()),
                modified: modified_time(manifest),
            });
        },
        Err(e) => out.diagnostics.warn(format!(
            "Failed to parse plugin skill {}: {e}",
            manifest.display()
        )),
    }
}

/// Every `SKILL.md` below `root`, in file-name order.
fn find_manifests(root: &Path, diagnostics: &mut PluginDiagnostics) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() && entry.file_name() == SKILL_FILE => {
                found.push(entry.into_path());
            },
            Ok(_) => {},
            Err(e) => diagnostics.warn(format!(
                "Failed to scan plugin directory {}: {e}",
                e.path().unwrap_or(root).display()
            )),
        }
    }
    found
}

/// Split `plugin@marketplace`; both halves must be non-empty.
pub fn split_plugin_key(key: &str) -> Option<(&str, &str)> {
    let (plugin, marketplace) = key.split_once('@')?;
    (!plugin.is_empty() && !marketplace.is_empty()).then_some((plugin, marketplace))
}

/// Absolute install paths pass through, relative ones hang off `install_root`.
pub fn resolve_install_path(raw: &str, install_root: &Path) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        install_root.join(path)
    }
}

/// `plugin:skill`, unless the skill is already namespaced or named after its plugin.
pub fn plugin_skill_name(plugin: &str, skill: &str) -> String {
    if skill.contains(':') || skill.eq_ignore_ascii_case(plugin) {
        skill.to_string()
    } else {
        format!("{plugin}:{skill}")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join(SKILL_FILE),
            format!("---\nname: {name}\ndescription: {name} skill\n---\nbody\n"),
        )
        .unwrap();
    }

    fn write_manifest(path: &Path, entries: &[(&str, &Path)]) {
        let plugins: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(key, install)| {
                (
                    (*key).to_string(),
                    serde_json::json!({
                        "version": "1.2.0",
                        "installedAt": "2025-01-01T00:00:00Z",
                        "lastUpdated": "2025-01-02T00:00:00Z",
                        "installPath": install.to_string_lossy(),
                        "gitCommitSha": "abc123",
                        "isLocal": false,
                    }),
                )
            })
            .collect();
        let doc = serde_json::json!({ "version": 1, "plugins": plugins });
        std::fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    }

    fn opts(root: &Path, fallback: bool) -> PluginOptions {
        PluginOptions {
            manifest_path: root.join("installed_plugins.json"),
            install_root: root.to_path_buf(),
            fallback,
        }
    }

    #[test]
    fn test_manifest_skills_are_namespaced() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path().join("cache/example-skills");
        write_skill(&install.join("pdf"), "pdf");
        write_skill(&install.join("nested/xlsx"), "xlsx");
        write_manifest(&tmp.path().join("installed_plugins.json"), &[(
            "example-skills@anthropic",
            &install,
        )]);

        let out = expand_plugins(&opts(tmp.path(), false));
        let names: Vec<_> = out.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["example-skills:xlsx", "example-skills:pdf"]);
        let first = &out.skills[0];
        assert_eq!(first.provider, Provider::Claude);
        assert_eq!(first.location, SkillLocation::Plugin);
        let info = first.plugin_info.as_ref().unwrap();
        assert_eq!(info.marketplace, "anthropic");
        assert_eq!(info.version, "1.2.0");
        assert!(out.diagnostics.warnings.is_empty());
    }

    #[test]
    fn test_relative_install_path_joins_root() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("repos/tools/lint"), "lint");
        write_manifest(&tmp.path().join("installed_plugins.json"), &[(
            "tools@market",
            Path::new("repos/tools"),
        )]);

        let out = expand_plugins(&opts(tmp.path(), false));
        assert_eq!(out.skills.len(), 1);
        assert_eq!(out.skills[0].path, tmp.path().join("repos/tools/lint"));
    }

    #[test]
    fn test_missing_and_empty_install_paths_warn() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        write_manifest(&tmp.path().join("installed_plugins.json"), &[
            ("empty@m", &empty),
            ("gone@m", &tmp.path().join("gone")),
        ]);

        let out = expand_plugins(&opts(tmp.path(), false));
        assert!(out.skills.is_empty());
        assert_eq!(out.diagnostics.warnings.len(), 2);
        assert!(out.diagnostics.warnings[0].starts_with("Plugin empty@m has no skills under"));
        assert!(
            out.diagnostics.warnings[1].starts_with("Install path for plugin gone@m does not exist")
        );
    }

    #[test]
    fn test_malformed_key_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path().join("p");
        write_skill(&install.join("s"), "s");
        write_manifest(&tmp.path().join("installed_plugins.json"), &[
            ("nomarket@", &install),
            ("ok@m", &install),
        ]);

        let out = expand_plugins(&opts(tmp.path(), false));
        assert_eq!(out.skills.len(), 1);
        assert_eq!(out.diagnostics.warnings.len(), 1);
    }

    #[test]
    fn test_missing_manifest_warns() {
        let tmp = tempfile::tempdir().unwrap();
        let out = expand_plugins(&opts(tmp.path(), false));
        assert!(out.skills.is_empty());
        assert!(out.diagnostics.warnings[0].starts_with("Plugins file not found at"));
    }

    #[test]
    fn test_schema_mismatch_treated_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("installed_plugins.json"),
            r#"{"version": 1, "plugins": {"a@b": {"version": "1"}}}"#,
        )
        .unwrap();
        let out = expand_plugins(&opts(tmp.path(), false));
        assert!(out.skills.is_empty());
        assert!(out.diagnostics.warnings[0].starts_with("Invalid installed_plugins.json"));
    }

    #[test]
    fn test_fallback_scans_skills_dir() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("skills/docs/pdf"), "pdf");
        write_skill(&tmp.path().join("skills"), "stray");

        assert!(expand_plugins(&opts(tmp.path(), false)).skills.is_empty());

        let out = expand_plugins(&opts(tmp.path(), true));
        assert_eq!(out.skills.len(), 1);
        let skill = &out.skills[0];
        assert_eq!(skill.name, "docs:pdf");
        let info = skill.plugin_info.as_ref().unwrap();
        assert_eq!(info.plugin_name, "docs");
        assert_eq!(info.marketplace, LOCAL_MARKETPLACE);
        assert!(
            out.diagnostics
                .warnings
                .iter()
                .any(|w| w.contains("outside a plugin directory"))
        );
    }

    #[test]
    fn test_plugin_skill_name() {
        assert_eq!(plugin_skill_name("docs", "pdf"), "docs:pdf");
        assert_eq!(plugin_skill_name("docs", "other:pdf"), "other:pdf");
        assert_eq!(plugin_skill_name("Docs", "docs"), "docs");
    }
}
