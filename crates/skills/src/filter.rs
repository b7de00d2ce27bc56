//! Include/exclude selectors over a scanned skill list.
//!
//! Grammar, tried in order:
//!
//! | Token                         | Meaning                                    |
//! |-------------------------------|--------------------------------------------|
//! | `file:<path>`                 | exactly the bundle at `<path>`             |
//! | `@plugin:skill`, `claude@p:s` | one skill of one plugin                    |
//! | `@plugins[:plugin[:skill]]`   | plugin records, optionally narrowed        |
//! | `claude`/`codex`/`file`/`all` | every record of that provider (or all)     |
//! | `<provider>:<pattern>`        | provider plus name pattern                 |
//! | `claude:@plugins[:p[:s]]`     | same as `@plugins...`                      |
//! | `auto[:<pattern>]`, `<name>`  | one record per base name, freshest wins    |
//!
//! Patterns containing `*` or `?` are case-insensitive globs; anything else is
//! a case-insensitive exact match against the full or base name.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::SystemTime,
};

use regex::{Regex, RegexBuilder};

use crate::{
    error::{Error, Result},
    types::{Provider, SkillLocation, SkillMetadata},
};

/// Case-insensitive name matcher.
#[derive(Debug, Clone)]
pub enum NamePattern {
    Exact(String),
    Glob(Regex),
}

impl NamePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.contains(['*', '?']) {
            return Ok(Self::Exact(pattern.to_lowercase()));
        }
        let source = format!(
            "^{}$",
            regex::escape(pattern)
                .replace(r"\*", ".*")
                .replace(r"\?", ".")
        );
        RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map(Self::Glob)
            .map_err(|e| Error::invalid_selector(pattern, e.to_string()))
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(expected) => value.to_lowercase() == *expected,
            Self::Glob(re) => re.is_match(value),
        }
    }

    /// Either the full name or the part after the last `:`.
    fn matches_skill(&self, skill: &SkillMetadata) -> bool {
        self.matches(&skill.name) || self.matches(skill.base_name())
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Glob(a), Self::Glob(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// One parsed selector.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterToken {
    /// Deduplicate by base name, keeping the freshest copy.
    Auto { name: Option<NamePattern> },
    /// Provider scope; `None` means every provider.
    Select {
        provider: Option<Provider>,
        name: Option<NamePattern>,
    },
    /// Claude plugin records.
    Plugins {
        plugin: Option<NamePattern>,
        name: Option<NamePattern>,
    },
    /// A single bundle directory.
    Path(PathBuf),
}

impl FilterToken {
    pub fn parse(raw: &str) -> Result<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(Error::invalid_selector(raw, "empty selector"));
        }

        if let Some(path) = token.strip_prefix("file:") {
            return Ok(Self::Path(PathBuf::from(path.trim())));
        }

        if let Some(at) = token.find('@')
            && token[at + 1..].contains(':')
            && !token.contains("@plugins")
        {
            return parse_plugin_qualified(token, at);
        }

        if token.starts_with('@') {
            let parts: Vec<&str> = token.split(':').filter(|p| !p.is_empty()).collect();
            return parse_plugins_group(token, &parts);
        }

        let (head, rest) = match token.split_once(':') {
            Some((head, rest)) => (head, Some(rest)),
            None => (token, None),
        };
        let scope = head.to_ascii_lowercase();
        if !matches!(scope.as_str(), "claude" | "codex" | "file" | "all" | "auto") {
            return Ok(Self::Auto {
                name: Some(NamePattern::parse(token)?),
            });
        }

        if let Some(rest) = rest
            && rest.starts_with('@')
        {
            if scope != "claude" {
                return Err(Error::invalid_selector(
                    token,
                    format!("{scope} does not support @plugins"),
                ));
            }
            let parts: Vec<&str> = rest.split(':').filter(|p| !p.is_empty()).collect();
            return parse_plugins_group(token, &parts);
        }

        let name = optional_pattern(rest.unwrap_or(""))?;
        Ok(match scope.as_str() {
            "auto" => Self::Auto { name },
            "all" => Self::Select {
                provider: None,
                name,
            },
            other => Self::Select {
                provider: other.parse().ok(),
                name,
            },
        })
    }

    /// Records this token selects from `skills`, in input order.
    ///
    /// With `dedup` unset an `Auto` token keeps every name match.
    fn select(&self, skills: &[SkillMetadata], dedup: bool) -> Vec<SkillMetadata> {
        match self {
            Self::Auto { name } => {
                let matched: Vec<&SkillMetadata> = skills
                    .iter()
                    .filter(|s| name.as_ref().is_none_or(|p| p.matches_skill(s)))
                    .collect();
                if dedup {
                    freshest_by_base_name(&matched)
                } else {
                    matched.into_iter().cloned().collect()
                }
            },
            _ => skills.iter().filter(|s| self.matches(s)).cloned().collect(),
        }
    }

    fn matches(&self, skill: &SkillMetadata) -> bool {
        let name_ok = |name: &Option<NamePattern>| name.as_ref().is_none_or(|p| p.matches_skill(skill));
        match self {
            Self::Auto { name } => name_ok(name),
            Self::Select { provider, name } => {
                provider.is_none_or(|p| skill.provider == p) && name_ok(name)
            },
            Self::Plugins { plugin, name } => {
                skill.location == SkillLocation::Plugin
                    && skill.provider == Provider::Claude
                    && plugin.as_ref().is_none_or(|p| {
                        skill
                            .plugin_info
                            .as_ref()
                            .is_some_and(|info| p.matches(&info.plugin_name))
                    })
                    && name_ok(name)
            },
            Self::Path(path) => same_path(&skill.path, path),
        }
    }
}

impl FromStr for FilterToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn optional_pattern(raw: &str) -> Result<Option<NamePattern>> {
    let raw = raw.trim();
    if raw.is_empty() {
        Ok(None)
    } else {
        NamePattern::parse(raw).map(Some)
    }
}

/// `@plugin:skill`, `claude@plugin:skill` or `claude:@plugin:skill`.
fn parse_plugin_qualified(token: &str, at: usize) -> Result<FilterToken> {
    let prefix = token[..at].trim_end_matches(':');
    if !prefix.is_empty() && !prefix.eq_ignore_ascii_case("claude") {
        return Err(Error::invalid_selector(
            token,
            "only the claude provider supports plugin-qualified skill ids",
        ));
    }

    let mut parts = token[at + 1..].split(':').filter(|p| !p.is_empty());
    let Some(plugin) = parts.next() else {
        return Err(Error::invalid_selector(
            token,
            "plugin name is required when using @plugin:skill syntax",
        ));
    };
    let skill = parts.collect::<Vec<_>>().join(":");

    Ok(FilterToken::Plugins {
        plugin: Some(NamePattern::parse(plugin)?),
        name: optional_pattern(&skill)?,
    })
}

/// `parts[0]` must be `@plugins`; the rest narrow by plugin then skill.
fn parse_plugins_group(token: &str, parts: &[&str]) -> Result<FilterToken> {
    match parts.first() {
        Some(&"@plugins") => {},
        Some(group) => {
            return Err(Error::invalid_selector(
                token,
                format!("unsupported group '{group}'"),
            ));
        },
        None => return Err(Error::invalid_selector(token, "missing group")),
    }
    Ok(FilterToken::Plugins {
        plugin: optional_pattern(parts.get(1).copied().unwrap_or(""))?,
        name: optional_pattern(&parts.get(2..).unwrap_or_default().join(":"))?,
    })
}

/// Which manifest variants pass before any selector runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateFilter {
    #[default]
    Enabled,
    Disabled,
    All,
}

impl StateFilter {
    /// `--disabled` wins over `--all`.
    pub fn from_flags(all: bool, disabled: bool) -> Self {
        match (all, disabled) {
            (_, true) => Self::Disabled,
            (true, false) => Self::All,
            (false, false) => Self::Enabled,
        }
    }

    pub fn includes_disabled(self) -> bool {
        self != Self::Enabled
    }

    fn admits(self, skill: &SkillMetadata) -> bool {
        match self {
            Self::Enabled => !skill.disabled,
            Self::Disabled => skill.disabled,
            Self::All => true,
        }
    }
}

impl fmt::Display for StateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::All => "all",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSet {
    pub includes: Vec<FilterToken>,
    pub excludes: Vec<FilterToken>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            includes: vec![FilterToken::Auto { name: None }],
            excludes: Vec::new(),
        }
    }
}

/// Parse include/exclude arguments; each may hold comma-separated tokens.
/// No includes means `auto`.
pub fn parse_filters<I, E>(includes: &[I], excludes: &[E]) -> Result<FilterSet>
where
    I: AsRef<str>,
    E: AsRef<str>,
{
    let mut set = FilterSet {
        includes: parse_list(includes)?,
        excludes: parse_list(excludes)?,
    };
    if set.includes.is_empty() {
        set.includes.push(FilterToken::Auto { name: None });
    }
    Ok(set)
}

fn parse_list<S: AsRef<str>>(args: &[S]) -> Result<Vec<FilterToken>> {
    args.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(FilterToken::parse)
        .collect()
}

/// Run state filter, includes (unioned by path) and excludes over `skills`.
pub fn apply_filters(
    skills: &[SkillMetadata],
    filters: &FilterSet,
    state: StateFilter,
) -> Vec<SkillMetadata> {
    let admitted: Vec<SkillMetadata> = skills.iter().filter(|s| state.admits(s)).cloned().collect();

    let mut seen = HashSet::new();
    let mut included = Vec::new();
    for token in &filters.includes {
        for skill in token.select(&admitted, true) {
            if seen.insert(skill.path.clone()) {
                included.push(skill);
            }
        }
    }

    let excluded: HashSet<PathBuf> = filters
        .excludes
        .iter()
        .flat_map(|token| token.select(&included, false))
        .map(|s| s.path)
        .collect();

    included.retain(|s| !excluded.contains(&s.path));
    included
}

/// Keep one record per lower-cased base name, in first-seen slot order.
fn freshest_by_base_name(skills: &[&SkillMetadata]) -> Vec<SkillMetadata> {
    let mut slots: Vec<&SkillMetadata> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for &skill in skills {
        let key = skill.base_name().to_lowercase();
        match index.get(&key) {
            Some(&slot) => {
                if fresher(skill, slots[slot]) == Ordering::Greater {
                    slots[slot] = skill;
                }
            },
            None => {
                index.insert(key, slots.len());
                slots.push(skill);
            },
        }
    }

    slots.into_iter().cloned().collect()
}

/// `Greater` when `a` should replace `b`.
///
/// Non-plugin beats plugin, then the later mtime, then location priority.
/// Full ties keep `b`.
fn fresher(a: &SkillMetadata, b: &SkillMetadata) -> Ordering {
    let rank = |s: &SkillMetadata| {
        (
            !s.is_plugin(),
            s.modified.unwrap_or(SystemTime::UNIX_EPOCH),
            std::cmp::Reverse(s.location),
        )
    };
    rank(a).cmp(&rank(b))
}

fn same_path(a: &Path, b: &Path) -> bool {
    a == b || matches!((a.canonicalize(), b.canonicalize()), (Ok(x), Ok(y)) if x == y)
}
