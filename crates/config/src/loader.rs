use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::SkilldeckConfig,
};

/// Config file names, checked in order within each directory.
pub const CONFIG_FILENAMES: &[&str] = &[
    "skilldeck.toml",
    "skilldeck.yaml",
    "skilldeck.yml",
    "skilldeck.json",
];

/// Overrides `skills.user_dir`.
pub const ENV_USER_DIR: &str = "SKILLDECK_USER_DIR";
/// Overrides `skills.plugin_fallback`; accepts `1`/`true`/`yes`/`on` and their negations.
pub const ENV_PLUGINS_FALLBACK: &str = "SKILLDECK_PLUGINS_FALLBACK";

/// Read, env-substitute and decode one config file. Format follows the extension.
pub fn load_config(path: &Path) -> Result<SkilldeckConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let raw = substitute_env(&raw);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(&raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(&raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(&raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

/// Outcome of [`discover_and_load`].
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub config: SkilldeckConfig,
    /// File the config came from, if one was found.
    pub path: Option<PathBuf>,
    /// Set when a file was found but could not be loaded; `config` is then the defaults.
    pub error: Option<Error>,
}

/// Load the first config file found, then apply env overrides.
///
/// Search order:
/// 1. `./skilldeck.{toml,yaml,yml,json}`
/// 2. `<user config dir>/skilldeck.{toml,yaml,yml,json}`
///
/// Never fails: a missing or broken file yields the defaults, and the load
/// error is handed back so it can be reported once logging is up.
pub fn discover_and_load() -> LoadedConfig {
    let mut loaded = match find_config_file() {
        Some(path) => match load_config(&path) {
            Ok(config) => LoadedConfig {
                config,
                path: Some(path),
                error: None,
            },
            Err(e) => LoadedConfig {
                path: Some(path),
                error: Some(e),
                ..Default::default()
            },
        },
        None => LoadedConfig::default(),
    };
    apply_env_overrides(&mut loaded.config);
    loaded
}

/// First existing config file in `./`, then the user config dir.
pub fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// User-global config directory, e.g. `~/.config/skilldeck/`.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "skilldeck").map(|d| d.config_dir().to_path_buf())
}

/// Apply `SKILLDECK_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut SkilldeckConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(
    config: &mut SkilldeckConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(dir) = lookup(ENV_USER_DIR).filter(|v| !v.trim().is_empty()) {
        config.skills.user_dir = Some(PathBuf::from(dir.trim()));
    }

    if let Some(raw) = lookup(ENV_PLUGINS_FALLBACK) {
        match parse_flag(&raw) {
            Some(enabled) => config.skills.plugin_fallback = enabled,
            None => warn!(
                var = ENV_PLUGINS_FALLBACK,
                value = %raw,
                "ignoring unrecognised boolean"
            ),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_with_defaults_for_missing_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skilldeck.toml");
        std::fs::write(
            &path,
            r#"
[skills]
skill_dirs = ["./vendor/skills?scope=vendor"]
include = ["claude", "codex:pdf"]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.skills.skill_dirs, vec!["./vendor/skills?scope=vendor"]);
        assert_eq!(config.skills.include, vec!["claude", "codex:pdf"]);
        assert!(config.skills.scan_default_dirs);
        assert!(!config.skills.plugin_fallback);
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn loads_yaml_and_json() {
        let tmp = tempfile::tempdir().unwrap();
        let yaml = tmp.path().join("skilldeck.yaml");
        std::fs::write(&yaml, "skills:\n  skip_plugins: true\nlogging:\n  json: true\n").unwrap();
        let config = load_config(&yaml).unwrap();
        assert!(config.skills.skip_plugins);
        assert!(config.logging.json);

        let json = tmp.path().join("skilldeck.json");
        std::fs::write(&json, r#"{"skills": {"exclude": ["pdf"]}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().skills.exclude, vec!["pdf"]);
    }

    #[test]
    fn rejects_unknown_extension_and_bad_syntax() {
        let tmp = tempfile::tempdir().unwrap();
        let ini = tmp.path().join("skilldeck.ini");
        std::fs::write(&ini, "").unwrap();
        assert!(matches!(
            load_config(&ini),
            Err(Error::UnsupportedFormat { .. })
        ));

        let toml = tmp.path().join("skilldeck.toml");
        std::fs::write(&toml, "[skills\n").unwrap();
        assert!(matches!(load_config(&toml), Err(Error::Parse { .. })));

        assert!(matches!(
            load_config(&tmp.path().join("absent.toml")),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn finds_first_file_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_in(tmp.path()).is_none());
        std::fs::write(tmp.path().join("skilldeck.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("skilldeck.yaml"), "").unwrap();
        assert_eq!(
            find_in(tmp.path()).unwrap(),
            tmp.path().join("skilldeck.yaml")
        );
    }

    #[test]
    fn env_overrides() {
        let mut config = SkilldeckConfig::default();
        apply_env_overrides_with(&mut config, |name| match name {
            ENV_USER_DIR => Some(" /alt/home ".into()),
            ENV_PLUGINS_FALLBACK => Some("Yes".into()),
            _ => None,
        });
        assert_eq!(config.skills.user_dir, Some(PathBuf::from("/alt/home")));
        assert!(config.skills.plugin_fallback);

        apply_env_overrides_with(&mut config, |name| {
            (name == ENV_PLUGINS_FALLBACK).then(|| "maybe".to_string())
        });
        assert!(config.skills.plugin_fallback);

        apply_env_overrides_with(&mut config, |name| {
            (name == ENV_PLUGINS_FALLBACK).then(|| "off".to_string())
        });
        assert!(!config.skills.plugin_fallback);
    }
}
