//! Flags deciding where skills are scanned from and which records a command sees.
//!
//! Every flag falls back to the matching `[skills]` config key.

use std::path::PathBuf;

use {
    clap::Args,
    skilldeck_config::SkillsConfig,
    skilldeck_skills::{
        CustomDir, DiscoveryOptions, FilterSet, Provider, StateFilter, parse_filters,
    },
};

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Extra directory to scan, `path` or `path?scope=name`. Repeatable.
    #[arg(long = "skill-dir", global = true, value_name = "DIR")]
    pub skill_dirs: Vec<String>,

    /// Provider to tag `--skill-dir` records with (claude, codex, file).
    #[arg(long, global = true, value_name = "PROVIDER")]
    pub provider: Option<Provider>,

    /// Skip the built-in project and user roots.
    #[arg(long, global = true)]
    pub no_default_dirs: bool,

    /// Use this directory in place of the home directory.
    #[arg(long, global = true)]
    pub user_dir: Option<PathBuf>,

    /// Path to Claude's `installed_plugins.json`.
    #[arg(long, global = true)]
    pub plugins_file: Option<PathBuf>,

    /// Directory relative plugin install paths are resolved against.
    #[arg(long, global = true)]
    pub plugins_root: Option<PathBuf>,

    /// Do not expand Claude plugin installations.
    #[arg(long, global = true)]
    pub no_plugins: bool,

    /// Scan `<plugins-root>/skills` when the plugin manifest yields nothing.
    #[arg(long, global = true)]
    pub plugin_fallback: bool,

    /// Include selectors, comma-separated (e.g. `claude,codex:pdf,@plugins`).
    #[arg(long, global = true, value_name = "SELECTORS")]
    pub include: Vec<String>,

    /// Exclude selectors, same grammar as `--include`.
    #[arg(long, global = true, value_name = "SELECTORS")]
    pub exclude: Vec<String>,

    /// Show enabled and disabled skills.
    #[arg(long, global = true)]
    pub all: bool,

    /// Show only disabled skills. Wins over `--all`.
    #[arg(long, global = true)]
    pub disabled: bool,
}

impl SourceArgs {
    pub fn state(&self) -> StateFilter {
        StateFilter::from_flags(self.all, self.disabled)
    }

    /// Merge flags over `config`. Config roots are scanned before flag roots.
    pub fn discovery_options(
        &self,
        config: &SkillsConfig,
        cwd: PathBuf,
        include_disabled: bool,
    ) -> DiscoveryOptions {
        let defaults = DiscoveryOptions::default();
        let custom_dirs = config
            .skill_dirs
            .iter()
            .chain(&self.skill_dirs)
            .map(|raw| CustomDir::parse(raw))
            .collect();

        DiscoveryOptions {
            custom_dirs,
            custom_provider: self.provider.unwrap_or(defaults.custom_provider),
            skip_plugins: self.no_plugins || config.skip_plugins,
            scan_default_dirs: !self.no_default_dirs && config.scan_default_dirs,
            include_disabled: include_disabled
                || self.state().includes_disabled()
                || config.include_disabled,
            user_dir: self
                .user_dir
                .clone()
                .or_else(|| config.user_dir.clone())
                .unwrap_or(defaults.user_dir),
            cwd,
            plugins_file: self
                .plugins_file
                .clone()
                .or_else(|| config.plugins_file.clone()),
            plugins_root: self
                .plugins_root
                .clone()
                .or_else(|| config.plugins_root.clone()),
            plugin_fallback: self.plugin_fallback || config.plugin_fallback,
        }
    }

    /// Flag selectors replace config selectors wholesale, per list.
    pub fn filters(&self, config: &SkillsConfig) -> skilldeck_skills::Result<FilterSet> {
        let includes = if self.include.is_empty() {
            &config.include
        } else {
            &self.include
        };
        let excludes = if self.exclude.is_empty() {
            &config.exclude
        } else {
            &self.exclude
        };
        parse_filters(includes, excludes)
    }
}
