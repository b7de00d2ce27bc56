//! Skills system: discovery, plugin expansion, filtering, and name resolution.
//!
//! Skills are directories containing a `SKILL.md` file with YAML frontmatter
//! and markdown instructions. They are collected from project roots, user
//! roots, caller-supplied directories, and Claude plugin installations, kept
//! as one flat list, and reconciled only when a caller filters or resolves.

pub mod discover;
pub mod error;
pub mod filter;
pub mod parse;
pub mod plugins;
pub mod registry;
pub mod resolve;
pub mod scan;
pub mod search;
pub mod toggle;
pub mod types;

pub use {
    discover::{CustomDir, Discovery, DiscoveryOptions, FsSkillDiscoverer, SkillDiscoverer},
    error::{Error, Result},
    filter::{FilterSet, FilterToken, NamePattern, StateFilter, apply_filters, parse_filters},
    registry::{RegistryDiagnostics, SkillRegistry},
    resolve::{resolve_many, resolve_one},
    toggle::{ToggleMode, ToggleResult, ToggleStatus, ToggleSummary},
    types::{PluginInfo, Provider, Skill, SkillLocation, SkillMetadata},
};
