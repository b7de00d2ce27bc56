use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::SystemTime,
};

use serde::{Deserialize, Serialize};

/// Manifest file name of an enabled bundle.
pub const SKILL_FILE: &str = "SKILL.md";
/// Manifest file name of a disabled bundle.
pub const DISABLED_SKILL_FILE: &str = ".SKILL.md";

// ── Provider / location ─────────────────────────────────────────────────────

/// Scanning pipeline a skill record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Claude roots (`.claude/skills`) and Claude plugin installations.
    Claude,
    /// Codex roots (`.codex/skills`).
    Codex,
    /// Ad-hoc directories handed in by the caller.
    File,
}

impl Provider {
    pub const ALL: [Self; 3] = [Self::Claude, Self::Codex, Self::File];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::File => "file",
        }
    }

    /// Only Claude knows about plugin installations.
    pub fn supports_plugins(self) -> bool {
        self == Self::Claude
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "codex" => Ok(Self::Codex),
            "file" => Ok(Self::File),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Priority class used for tie-breaking; declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLocation {
    /// Under `<cwd>/.claude`, `<cwd>/.codex` or `<cwd>/.agent`.
    Project,
    /// Under the user root, or any other caller-supplied directory.
    User,
    /// Inside a plugin installation.
    Plugin,
}

impl SkillLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for SkillLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Skill metadata ───────────────────────────────────────────────────────────

/// Plugin a skill was installed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub plugin_name: String,
    pub marketplace: String,
    pub version: String,
}

/// Immutable snapshot of one bundle on disk, produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Name from the frontmatter, possibly namespaced (`plugin:skill`, `scope:skill`).
    pub name: String,
    /// Description with internal whitespace collapsed.
    pub description: String,
    pub provider: Provider,
    pub location: SkillLocation,
    /// Bundle directory. Two records with the same path are the same bundle.
    pub path: PathBuf,
    /// Found through `.SKILL.md` rather than `SKILL.md`.
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub has_references: bool,
    #[serde(default)]
    pub has_scripts: bool,
    #[serde(default)]
    pub has_assets: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_info: Option<PluginInfo>,
    /// Manifest modification time captured at scan time.
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

impl SkillMetadata {
    /// Name with any namespace prefix stripped.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// Manifest file this record was read from.
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(if self.disabled {
            DISABLED_SKILL_FILE
        } else {
            SKILL_FILE
        })
    }

    pub fn is_plugin(&self) -> bool {
        self.location == SkillLocation::Plugin
    }

    /// Copy/paste friendly id: `provider:@plugin:name` or `provider:name`.
    pub fn display_id(&self) -> String {
        match &self.plugin_info {
            Some(info) => format!(
                "{}:@{}:{}",
                self.provider,
                info.plugin_name,
                strip_plugin_prefix(&self.name, &info.plugin_name)
            ),
            None => format!("{}:{}", self.provider, self.name),
        }
    }

    /// Lower-cased names user input may use to refer to this record.
    pub fn aliases(&self) -> Vec<String> {
        let name = self.name.to_lowercase();
        let mut aliases = vec![name.clone()];
        push_unique(&mut aliases, base_name(&name).to_string());

        if let Some(info) = &self.plugin_info {
            let plugin = info.plugin_name.to_lowercase();
            let base = strip_plugin_prefix(&name, &plugin);
            let provider = self.provider.as_str();
            push_unique(&mut aliases, format!("{plugin}:{base}"));
            push_unique(&mut aliases, format!("@{plugin}:{base}"));
            push_unique(&mut aliases, format!("{provider}:{plugin}:{base}"));
            push_unique(&mut aliases, format!("{provider}:@{plugin}:{base}"));
        }

        aliases
    }
}

/// Substring after the last `:` namespace separator.
pub fn base_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn strip_plugin_prefix<'a>(name: &'a str, plugin: &str) -> &'a str {
    name.strip_prefix(plugin)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(name)
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Resource subdirectories present in a bundle.
pub(crate) fn bundled_resources(skill_dir: &Path) -> (bool, bool, bool) {
    (
        skill_dir.join("references").exists(),
        skill_dir.join("scripts").exists(),
        skill_dir.join("assets").exists(),
    )
}

/// Manifest mtime, falling back to the bundle directory's.
pub(crate) fn modified_time(manifest: &Path) -> Option<SystemTime> {
    std::fs::metadata(manifest)
        .and_then(|m| m.modified())
        .ok()
        .or_else(|| {
            manifest
                .parent()
                .and_then(|dir| std::fs::metadata(dir).and_then(|m| m.modified()).ok())
        })
}

/// Full skill content: metadata + manifest text.
/// Loaded on demand, never during scanning.
#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub metadata: SkillMetadata,
    /// Whole manifest, frontmatter included.
    pub content: String,
    /// Markdown after the frontmatter.
    pub body: String,
    pub full_name: String,
}
