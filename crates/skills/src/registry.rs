use std::{collections::BTreeMap, path::PathBuf};

use {serde::Serialize, tracing::debug};

use crate::{
    discover::{DiscoveryOptions, FsSkillDiscoverer, SkillDiscoverer},
    error::{Error, Result},
    parse,
    resolve::{distinct_bundles, split_provider, suggest},
    types::{Provider, Skill, SkillLocation, SkillMetadata},
};

/// Snapshot of the last refresh, for `info`-style reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryDiagnostics {
    pub total_skills: usize,
    pub by_location: BTreeMap<SkillLocation, usize>,
    pub by_provider: BTreeMap<Provider, usize>,
    pub directories_scanned: Vec<PathBuf>,
    pub plugin_sources: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub conflicts: Vec<String>,
}

/// Flat list of every discovered record, rebuilt wholesale on refresh.
pub struct SkillRegistry {
    discoverer: Box<dyn SkillDiscoverer>,
    skills: Vec<SkillMetadata>,
    diagnostics: RegistryDiagnostics,
}

impl SkillRegistry {
    /// Registry over the filesystem, scanned immediately.
    pub fn new(options: DiscoveryOptions) -> Self {
        Self::from_discoverer(Box::new(FsSkillDiscoverer::new(options)))
    }

    pub fn from_discoverer(discoverer: Box<dyn SkillDiscoverer>) -> Self {
        let mut registry = Self {
            discoverer,
            skills: Vec::new(),
            diagnostics: RegistryDiagnostics::default(),
        };
        registry.refresh();
        registry
    }

    /// Discard every record and rescan.
    pub fn refresh(&mut self) {
        let discovery = self.discoverer.discover();

        let mut by_location = BTreeMap::new();
        for skill in &discovery.skills {
            *by_location.entry(skill.location).or_default() += 1;
        }

        let mut warnings = discovery.diagnostics.scan.warnings;
        let plugin_sources = match discovery.plugins {
            Some(plugins) => {
                warnings.extend(plugins.warnings);
                plugins.scanned_plugins
            },
            None => Vec::new(),
        };

        self.diagnostics = RegistryDiagnostics {
            total_skills: discovery.skills.len(),
            by_location,
            by_provider: discovery.diagnostics.by_provider,
            directories_scanned: discovery.diagnostics.scan.scanned_directories,
            plugin_sources,
            warnings,
            conflicts: discovery.diagnostics.scan.conflicts,
        };
        self.skills = discovery.skills;
        debug!(total = self.skills.len(), "skill registry refreshed");
    }

    pub fn all(&self) -> &[SkillMetadata] {
        &self.skills
    }

    pub fn diagnostics(&self) -> &RegistryDiagnostics {
        &self.diagnostics
    }

    /// Look up one record by user-supplied name.
    ///
    /// Exact full names are tried first, then short names and plugin aliases.
    /// Within each step the first location tier (project, user, plugin) with
    /// a hit wins, and both manifest variants of one bundle count once.
    pub fn find(&self, name: &str) -> Result<&SkillMetadata> {
        let (provider, target) = split_provider(name);
        let pool: Vec<&SkillMetadata> = self
            .skills
            .iter()
            .filter(|s| provider.is_none_or(|p| s.provider == p))
            .collect();

        let exact = distinct_bundles(
            pool.iter()
                .copied()
                .filter(|s| s.name.to_lowercase() == target),
        );
        if let Some(found) = pick_by_tier(name, &exact)? {
            return Ok(found);
        }

        let aliased = distinct_bundles(
            pool.iter()
                .copied()
                .filter(|s| s.aliases().contains(&target)),
        );
        if let Some(found) = pick_by_tier(name, &aliased)? {
            return Ok(found);
        }

        Err(Error::not_found(name, suggest(pool, name)))
    }

    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_ok()
    }

    /// Read the full manifest of the record `name` resolves to.
    pub fn load(&self, name: &str) -> Result<Skill> {
        load_skill(self.find(name)?)
    }
}

/// The only match in the highest tier that has any, or `None` when `matches` is empty.
fn pick_by_tier<'a>(
    name: &str,
    matches: &[&'a SkillMetadata],
) -> Result<Option<&'a SkillMetadata>> {
    for tier in [
        SkillLocation::Project,
        SkillLocation::User,
        SkillLocation::Plugin,
    ] {
        let in_tier: Vec<&SkillMetadata> = matches
            .iter()
            .copied()
            .filter(|s| s.location == tier)
            .collect();
        match in_tier.as_slice() {
            [one] => return Ok(Some(*one)),
            [] => {},
            many => return Err(ambiguous(name, many)),
        }
    }
    Ok(None)
}

fn ambiguous(name: &str, matches: &[&SkillMetadata]) -> Error {
    Error::ambiguous(name, matches.iter().map(|s| s.display_id()).collect())
}

/// Read the manifest variant `meta` was scanned from.
pub fn load_skill(meta: &SkillMetadata) -> Result<Skill> {
    let parsed = parse::parse_skill_file(&meta.manifest_path())?;
    Ok(Skill {
        metadata: meta.clone(),
        content: parsed.full_content,
        body: parsed.body,
        full_name: meta.name.clone(),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{discover::Discovery, types::PluginInfo},
        std::{cell::Cell, path::Path, rc::Rc},
    };

    struct Fixed {
        skills: Vec<SkillMetadata>,
        calls: Rc<Cell<usize>>,
    }

    impl SkillDiscoverer for Fixed {
        fn discover(&self) -> Discovery {
            self.calls.set(self.calls.get() + 1);
            Discovery {
                skills: self.skills.clone(),
                ..Default::default()
            }
        }
    }

    fn meta(name: &str, location: SkillLocation, path: &str) -> SkillMetadata {
        SkillMetadata {
            name: name.into(),
            description: "d".into(),
            provider: Provider::Claude,
            location,
            path: PathBuf::from(path),
            disabled: false,
            has_references: false,
            has_scripts: false,
            has_assets: false,
            plugin_info: (location == SkillLocation::Plugin).then(|| PluginInfo {
                plugin_name: "docs".into(),
                marketplace: "m".into(),
                version: "1".into(),
            }),
            modified: None,
        }
    }

    fn registry(skills: Vec<SkillMetadata>) -> SkillRegistry {
        SkillRegistry::from_discoverer(Box::new(Fixed {
            skills,
            calls: Rc::default(),
        }))
    }

    #[test]
    fn test_short_name_takes_first_tier_with_a_hit() {
        let reg = registry(vec![
            meta("docs:pdf", SkillLocation::Plugin, "/p/pdf"),
            meta("team:pdf", SkillLocation::User, "/u/pdf"),
            meta("pdf-extra", SkillLocation::Project, "/w/x"),
        ]);
        assert_eq!(reg.find("pdf").unwrap().path, PathBuf::from("/u/pdf"));
        assert_eq!(reg.find("docs:pdf").unwrap().path, PathBuf::from("/p/pdf"));
    }

    #[test]
    fn test_exact_name_prefers_local_over_plugin_of_same_name() {
        let mut plugin = meta("pdf", SkillLocation::Plugin, "/p/pdf");
        plugin.plugin_info = Some(PluginInfo {
            plugin_name: "pdf".into(),
            marketplace: "m".into(),
            version: "1".into(),
        });
        let reg = registry(vec![plugin, meta("pdf", SkillLocation::Project, "/w/pdf")]);

        assert_eq!(reg.find("pdf").unwrap().path, PathBuf::from("/w/pdf"));
        assert_eq!(reg.find("@pdf:pdf").unwrap().path, PathBuf::from("/p/pdf"));
    }

    #[test]
    fn test_both_variants_of_one_bundle_are_one_match() {
        let mut off = meta("twin", SkillLocation::User, "/u/twin");
        off.disabled = true;
        let reg = registry(vec![meta("twin", SkillLocation::User, "/u/twin"), off]);

        assert!(!reg.find("twin").unwrap().disabled);
        assert_eq!(reg.find("claude:twin").unwrap().path, PathBuf::from("/u/twin"));
    }

    #[test]
    fn test_exact_name_beats_tiers() {
        let reg = registry(vec![
            meta("pdf", SkillLocation::User, "/u/pdf"),
            meta("x:pdf", SkillLocation::Project, "/w/pdf"),
        ]);
        assert_eq!(reg.find("PDF").unwrap().path, PathBuf::from("/u/pdf"));
    }

    #[test]
    fn test_same_tier_is_ambiguous() {
        let reg = registry(vec![
            meta("a:pdf", SkillLocation::User, "/u/a"),
            meta("b:pdf", SkillLocation::User, "/u/b"),
        ]);
        let err = reg.find("pdf").unwrap_err();
        assert_eq!(err.suggestions(), ["claude:a:pdf", "claude:b:pdf"]);
    }

    #[test]
    fn test_not_found_offers_suggestions() {
        let reg = registry(vec![meta("pdf-tools", SkillLocation::User, "/u/pdf")]);
        assert!(!reg.has("docx"));
        match reg.find("pdf").unwrap_err() {
            Error::NotFound { suggestions, .. } => {
                assert_eq!(suggestions, vec!["claude:pdf-tools"]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_provider_prefix_restricts_pool() {
        let mut codex = meta("pdf", SkillLocation::User, "/c/pdf");
        codex.provider = Provider::Codex;
        let reg = registry(vec![meta("pdf", SkillLocation::User, "/u/pdf"), codex]);
        assert!(matches!(reg.find("pdf"), Err(Error::Ambiguous { .. })));
        assert_eq!(reg.find("codex:pdf").unwrap().path, PathBuf::from("/c/pdf"));
    }

    #[test]
    fn test_refresh_rediscovers_and_counts() {
        let calls = Rc::new(Cell::new(0));
        let mut reg = SkillRegistry::from_discoverer(Box::new(Fixed {
            skills: vec![
                meta("a", SkillLocation::Project, "/a"),
                meta("docs:b", SkillLocation::Plugin, "/b"),
            ],
            calls: Rc::clone(&calls),
        }));
        assert_eq!(calls.get(), 1);
        reg.refresh();
        assert_eq!(calls.get(), 2);

        let diag = reg.diagnostics();
        assert_eq!(diag.total_skills, 2);
        assert_eq!(diag.by_location[&SkillLocation::Project], 1);
        assert_eq!(diag.by_location[&SkillLocation::Plugin], 1);
    }

    #[test]
    fn test_load_reads_variant_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("pdf");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(".SKILL.md"),
            "---\nname: pdf\ndescription: off\n---\nDisabled body\n",
        )
        .unwrap();

        let mut record = meta("pdf", SkillLocation::User, "/");
        record.path = dir;
        record.disabled = true;
        let reg = registry(vec![record]);

        let skill = reg.load("pdf").unwrap();
        assert_eq!(skill.body, "Disabled body\n");
        assert_eq!(skill.full_name, "pdf");
        assert!(skill.content.starts_with("---"));
        assert!(Path::new(&skill.metadata.path).ends_with("pdf"));
    }
}
