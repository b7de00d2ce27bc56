use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use {serde::Serialize, tracing::info};

use crate::{
    plugins::{self, PluginDiagnostics, PluginOptions},
    scan::{self, ScanDiagnostics, ScanOptions},
    types::{Provider, SkillMetadata},
};

/// Scope given to ad-hoc `file` directories that don't name one.
pub const DEFAULT_SCOPE: &str = "other";

/// A caller-supplied directory to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomDir {
    pub path: PathBuf,
    pub scope: Option<String>,
}

impl CustomDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scope: None,
        }
    }

    /// Parse `path` or `path?scope=name`. Unknown query keys are ignored.
    pub fn parse(raw: &str) -> Self {
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        let scope = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "scope")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            path: PathBuf::from(path),
            scope,
        }
    }
}

/// Inputs for one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub custom_dirs: Vec<CustomDir>,
    pub custom_provider: Provider,
    pub skip_plugins: bool,
    pub scan_default_dirs: bool,
    pub include_disabled: bool,
    pub user_dir: PathBuf,
    pub cwd: PathBuf,
    /// Defaults to `<user_dir>/.claude/plugins/installed_plugins.json`.
    pub plugins_file: Option<PathBuf>,
    /// Defaults to `<user_dir>/.claude/plugins`.
    pub plugins_root: Option<PathBuf>,
    pub plugin_fallback: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            custom_dirs: Vec::new(),
            custom_provider: Provider::File,
            skip_plugins: false,
            scan_default_dirs: true,
            include_disabled: false,
            user_dir: home_dir(),
            cwd: std::env::current_dir().unwrap_or_default(),
            plugins_file: None,
            plugins_root: None,
            plugin_fallback: false,
        }
    }
}

impl DiscoveryOptions {
    pub fn plugins_root(&self) -> PathBuf {
        self.plugins_root
            .clone()
            .unwrap_or_else(|| self.user_dir.join(".claude/plugins"))
    }

    pub fn plugins_file(&self) -> PathBuf {
        self.plugins_file.clone().unwrap_or_else(|| {
            self.user_dir
                .join(".claude/plugins/installed_plugins.json")
        })
    }

    pub fn plugin_options(&self) -> PluginOptions {
        PluginOptions {
            manifest_path: self.plugins_file(),
            install_root: self.plugins_root(),
            fallback: self.plugin_fallback,
        }
    }
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_default()
}

/// Built-in roots, highest priority first.
pub fn default_roots(user_dir: &Path, cwd: &Path) -> Vec<(PathBuf, Provider)> {
    vec![
        (cwd.join(".claude/skills"), Provider::Claude),
        (cwd.join(".codex/skills"), Provider::Codex),
        (user_dir.join(".claude/skills"), Provider::Claude),
        (user_dir.join(".codex/skills"), Provider::Codex),
    ]
}

/// Directory-scan diagnostics plus a per-provider record count.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryDiagnostics {
    #[serde(flatten)]
    pub scan: ScanDiagnostics,
    pub by_provider: BTreeMap<Provider, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    pub skills: Vec<SkillMetadata>,
    pub diagnostics: DiscoveryDiagnostics,
}

/// Scan custom roots, then the default roots, in priority order.
///
/// Nothing is deduplicated. A name reappearing at a different path is noted
/// as a conflict once, the first time it happens.
pub fn discover(opts: &DiscoveryOptions) -> DiscoveryOutcome {
    let mut out = DiscoveryOutcome::default();

    let mut roots: Vec<(PathBuf, Provider, Option<String>)> = opts
        .custom_dirs
        .iter()
        .map(|dir| {
            let path = if dir.path.is_absolute() {
                dir.path.clone()
            } else {
                opts.cwd.join(&dir.path)
            };
            let scope = (opts.custom_provider == Provider::File).then(|| {
                dir.scope
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SCOPE.to_string())
            });
            (path, opts.custom_provider, scope)
        })
        .collect();

    if opts.scan_default_dirs {
        roots.extend(
            default_roots(&opts.user_dir, &opts.cwd)
                .into_iter()
                .map(|(path, provider)| (path, provider, None)),
        );
    }

    let mut first_seen: HashMap<String, (PathBuf, bool)> = HashMap::new();
    for (root, provider, scope) in roots {
        let scanned = scan::scan_root(&root, &ScanOptions {
            provider,
            location: None,
            recursive: true,
            include_disabled: opts.include_disabled,
            cwd: opts.cwd.clone(),
        });
        out.diagnostics.scan.extend(scanned.diagnostics);

        for mut skill in scanned.skills {
            if let Some(scope) = &scope {
                skill.name = format!("{scope}:{}", skill.name);
            }
            note_duplicate(&mut first_seen, &skill, &mut out.diagnostics.scan.conflicts);
            *out.diagnostics.by_provider.entry(skill.provider).or_default() += 1;
            out.skills.push(skill);
        }
    }

    info!(
        count = out.skills.len(),
        conflicts = out.diagnostics.scan.conflicts.len(),
        "discovered skills"
    );
    out
}

fn note_duplicate(
    first_seen: &mut HashMap<String, (PathBuf, bool)>,
    skill: &SkillMetadata,
    conflicts: &mut Vec<String>,
) {
    match first_seen.get_mut(&skill.name) {
        None => {
            first_seen.insert(skill.name.clone(), (skill.path.clone(), false));
        },
        Some((first, reported)) if !*reported && *first != skill.path => {
            conflicts.push(format!(
                "Duplicate skill name '{}': {} and {}",
                skill.name,
                first.display(),
                skill.path.display()
            ));
            *reported = true;
        },
        Some(_) => {},
    }
}

/// Everything a registry refresh needs from one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Directory records first, plugin records appended last.
    pub skills: Vec<SkillMetadata>,
    pub diagnostics: DiscoveryDiagnostics,
    /// `None` when plugins were skipped.
    pub plugins: Option<PluginDiagnostics>,
}

/// Source of skill records for a registry.
pub trait SkillDiscoverer {
    fn discover(&self) -> Discovery;
}

/// Filesystem discoverer: directory roots followed by plugin installations.
pub struct FsSkillDiscoverer {
    options: DiscoveryOptions,
}

impl FsSkillDiscoverer {
    pub fn new(options: DiscoveryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }
}

impl SkillDiscoverer for FsSkillDiscoverer {
    fn discover(&self) -> Discovery {
        let DiscoveryOutcome {
            mut skills,
            mut diagnostics,
        } = discover(&self.options);

        if self.options.skip_plugins {
            return Discovery {
                skills,
                diagnostics,
                plugins: None,
            };
        }

        let expanded = plugins::expand_plugins(&self.options.plugin_options());
        for skill in expanded.skills {
            if let Some(existing) = skills.iter().find(|s| s.name == skill.name) {
                diagnostics.scan.conflicts.push(format!(
                    "Plugin skill '{}' at {} shares its name with {}",
                    skill.name,
                    skill.path.display(),
                    existing.path.display()
                ));
            }
            *diagnostics.by_provider.entry(skill.provider).or_default() += 1;
            skills.push(skill);
        }

        Discovery {
            skills,
            diagnostics,
            plugins: Some(expanded.diagnostics),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::SkillLocation};

    fn write_skill(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {name} skill\n---\nbody\n"),
        )
        .unwrap();
    }

    fn options(tmp: &Path) -> DiscoveryOptions {
        DiscoveryOptions {
            user_dir: tmp.join("home"),
            cwd: tmp.join("work"),
            skip_plugins: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_custom_dir_parse() {
        assert_eq!(CustomDir::parse("./vendor"), CustomDir::new("./vendor"));
        let parsed = CustomDir::parse("/opt/skills?scope=team");
        assert_eq!(parsed.path, PathBuf::from("/opt/skills"));
        assert_eq!(parsed.scope.as_deref(), Some("team"));
        assert_eq!(CustomDir::parse("x?scope=").scope, None);
    }

    #[test]
    fn test_default_roots_order() {
        let roots = default_roots(Path::new("/home/u"), Path::new("/w"));
        let providers: Vec<_> = roots.iter().map(|(_, p)| *p).collect();
        assert_eq!(providers, vec![
            Provider::Claude,
            Provider::Codex,
            Provider::Claude,
            Provider::Codex
        ]);
        assert_eq!(roots[0].0, PathBuf::from("/w/.claude/skills"));
        assert_eq!(roots[3].0, PathBuf::from("/home/u/.codex/skills"));
    }

    #[test]
    fn test_default_plugin_paths_follow_user_dir() {
        let opts = DiscoveryOptions {
            user_dir: PathBuf::from("/home/u"),
            ..Default::default()
        };
        assert_eq!(
            opts.plugins_file(),
            PathBuf::from("/home/u/.claude/plugins/installed_plugins.json")
        );
        assert_eq!(opts.plugins_root(), PathBuf::from("/home/u/.claude/plugins"));
    }

    #[test]
    fn test_project_and_user_roots_keep_both_records() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("work/.claude/skills/pdf"), "pdf");
        write_skill(&tmp.path().join("home/.codex/skills/pdf"), "pdf");

        let out = discover(&options(tmp.path()));
        assert_eq!(out.skills.len(), 2);
        assert_eq!(out.skills[0].location, SkillLocation::Project);
        assert_eq!(out.skills[0].provider, Provider::Claude);
        assert_eq!(out.skills[1].location, SkillLocation::User);
        assert_eq!(out.skills[1].provider, Provider::Codex);
        assert_eq!(out.diagnostics.scan.conflicts.len(), 1);
        assert!(out.diagnostics.scan.conflicts[0].starts_with("Duplicate skill name 'pdf'"));
        assert_eq!(out.diagnostics.by_provider[&Provider::Claude], 1);
        assert_eq!(out.diagnostics.by_provider[&Provider::Codex], 1);
    }

    #[test]
    fn test_duplicate_conflict_reported_once() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("work/.claude/skills/a/pdf"), "pdf");
        write_skill(&tmp.path().join("work/.claude/skills/b/pdf"), "pdf");
        write_skill(&tmp.path().join("work/.claude/skills/c/pdf"), "pdf");

        let out = discover(&options(tmp.path()));
        assert_eq!(out.skills.len(), 3);
        assert_eq!(out.diagnostics.scan.conflicts.len(), 1);
    }

    #[test]
    fn test_custom_dirs_are_scoped() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("work/vendor/lint"), "lint");
        write_skill(&tmp.path().join("extra/fmt"), "fmt");

        let mut opts = options(tmp.path());
        opts.scan_default_dirs = false;
        opts.custom_dirs = vec![
            CustomDir::parse("vendor?scope=team"),
            CustomDir::new(tmp.path().join("extra")),
        ];
        let out = discover(&opts);
        let names: Vec<_> = out.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["team:lint", "other:fmt"]);
        assert!(out.skills.iter().all(|s| s.provider == Provider::File));
        assert!(out.skills.iter().all(|s| s.location == SkillLocation::User));

        opts.custom_provider = Provider::Codex;
        let out = discover(&opts);
        let names: Vec<_> = out.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["lint", "fmt"]);
    }

    #[test]
    fn test_fs_discoverer_appends_plugins_last() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("work/.claude/skills/pdf"), "pdf");
        write_skill(&tmp.path().join("home/.claude/plugins/skills/docs/pdf"), "pdf");

        let mut opts = options(tmp.path());
        opts.skip_plugins = false;
        opts.plugin_fallback = true;
        let discovery = FsSkillDiscoverer::new(opts).discover();

        assert_eq!(discovery.skills.len(), 2);
        assert!(!discovery.skills[0].is_plugin());
        assert!(discovery.skills[1].is_plugin());
        assert_eq!(discovery.skills[1].name, "docs:pdf");
        assert_eq!(discovery.diagnostics.by_provider[&Provider::Claude], 2);
        assert!(discovery.plugins.is_some());
    }
}
