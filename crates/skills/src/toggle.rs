//! Enable and disable bundles by renaming `SKILL.md` <-> `.SKILL.md`.

use std::{fmt, path::PathBuf};

use {
    serde::Serialize,
    tracing::{info, warn},
};

use crate::types::{DISABLED_SKILL_FILE, SKILL_FILE, SkillMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleMode {
    Enable,
    Disable,
}

impl fmt::Display for ToggleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleStatus {
    Enabled,
    Disabled,
    Skipped,
    Failed,
}

impl fmt::Display for ToggleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

/// Outcome for one bundle.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleResult {
    pub skill: String,
    pub path: PathBuf,
    pub status: ToggleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToggleResult {
    fn new(meta: &SkillMetadata, status: ToggleStatus, error: Option<String>) -> Self {
        Self {
            skill: meta.name.clone(),
            path: meta.path.clone(),
            status,
            error,
        }
    }
}

/// Counts over a batch of toggles.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleSummary {
    pub mode: ToggleMode,
    pub results: Vec<ToggleResult>,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ToggleSummary {
    pub fn new(mode: ToggleMode, results: Vec<ToggleResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        let succeeded = count(match mode {
            ToggleMode::Enable => ToggleStatus::Enabled,
            ToggleMode::Disable => ToggleStatus::Disabled,
        });
        let skipped = count(ToggleStatus::Skipped);
        let failed = count(ToggleStatus::Failed);
        Self {
            mode,
            results,
            succeeded,
            skipped,
            failed,
        }
    }
}

/// Apply `mode` to every record in order.
pub fn toggle_all(mode: ToggleMode, skills: &[SkillMetadata], force: bool) -> ToggleSummary {
    let results = skills
        .iter()
        .map(|meta| match mode {
            ToggleMode::Enable => enable(meta, force),
            ToggleMode::Disable => disable(meta, force),
        })
        .collect();
    ToggleSummary::new(mode, results)
}

/// Rename `SKILL.md` to `.SKILL.md`. With `force` a stale `.SKILL.md` is replaced.
pub fn disable(meta: &SkillMetadata, force: bool) -> ToggleResult {
    let enabled = meta.path.join(SKILL_FILE);
    let disabled = meta.path.join(DISABLED_SKILL_FILE);
    let (has_enabled, has_disabled) = (enabled.is_file(), disabled.is_file());

    if !has_enabled {
        let (status, reason) = if has_disabled {
            (ToggleStatus::Skipped, "Already disabled")
        } else {
            (ToggleStatus::Failed, "No SKILL.md found")
        };
        return ToggleResult::new(meta, status, Some(reason.into()));
    }
    if has_disabled && !force {
        return ToggleResult::new(
            meta,
            ToggleStatus::Skipped,
            Some("Both files exist, use --force".into()),
        );
    }

    let outcome = (|| {
        if has_disabled {
            std::fs::remove_file(&disabled)?;
        }
        std::fs::rename(&enabled, &disabled)
    })();
    finish(meta, outcome, ToggleStatus::Disabled)
}

/// Rename `.SKILL.md` to `SKILL.md`. With `force` a stale `SKILL.md` is replaced.
pub fn enable(meta: &SkillMetadata, force: bool) -> ToggleResult {
    let enabled = meta.path.join(SKILL_FILE);
    let disabled = meta.path.join(DISABLED_SKILL_FILE);
    let (has_enabled, has_disabled) = (enabled.is_file(), disabled.is_file());

    if has_enabled && !has_disabled {
        return ToggleResult::new(meta, ToggleStatus::Skipped, Some("Already enabled".into()));
    }
    if has_enabled && !force {
        return ToggleResult::new(
            meta,
            ToggleStatus::Skipped,
            Some("Both files exist, use --force".into()),
        );
    }
    if !has_disabled {
        return ToggleResult::new(
            meta,
            ToggleStatus::Failed,
            Some("No .SKILL.md found".into()),
        );
    }

    let outcome = (|| {
        if has_enabled {
            std::fs::remove_file(&enabled)?;
        }
        std::fs::rename(&disabled, &enabled)
    })();
    finish(meta, outcome, ToggleStatus::Enabled)
}

fn finish(meta: &SkillMetadata, outcome: std::io::Result<()>, done: ToggleStatus) -> ToggleResult {
    match outcome {
        Ok(()) => {
            info!(skill = %meta.name, path = %meta.path.display(), status = %done, "toggled skill");
            ToggleResult::new(meta, done, None)
        },
        Err(e) => {
            warn!(skill = %meta.name, error = %e, "failed to toggle skill");
            ToggleResult::new(meta, ToggleStatus::Failed, Some(e.to_string()))
        },
    }
}
