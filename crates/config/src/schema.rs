use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root of `skilldeck.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkilldeckConfig {
    pub skills: SkillsConfig,
    pub logging: LoggingConfig,
}

/// Discovery and filtering defaults. CLI flags override every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// Extra roots, each `path` or `path?scope=name`.
    pub skill_dirs: Vec<String>,
    pub scan_default_dirs: bool,
    pub skip_plugins: bool,
    pub include_disabled: bool,
    /// Stands in for the home directory when locating user roots.
    pub user_dir: Option<PathBuf>,
    pub plugins_file: Option<PathBuf>,
    pub plugins_root: Option<PathBuf>,
    /// Scan `<plugins_root>/skills` when the plugin manifest yields nothing.
    pub plugin_fallback: bool,
    /// Include selectors; empty means `auto`.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            skill_dirs: Vec::new(),
            scan_default_dirs: true,
            skip_plugins: false,
            include_disabled: false,
            user_dir: None,
            plugins_file: None,
            plugins_root: None,
            plugin_fallback: false,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset, e.g. `warn` or `skilldeck_skills=debug`.
    pub level: Option<String>,
    /// Emit logs as JSON lines.
    pub json: bool,
}
