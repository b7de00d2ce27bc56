//! Fuzzy ranking and text search over skill records.

use {
    nucleo::{
        Config, Matcher, Utf32Str,
        pattern::{AtomKind, CaseMatching, Normalization, Pattern},
    },
    tracing::warn,
};

use crate::{registry, types::SkillMetadata};

/// Indices of `haystack` entries matching `needle`, best match first.
///
/// Non-matching entries are dropped; a blank needle matches nothing.
pub fn rank_strings<S: AsRef<str>>(haystack: &[S], needle: &str) -> Vec<usize> {
    if needle.trim().is_empty() {
        return Vec::new();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::new(
        needle,
        CaseMatching::Ignore,
        Normalization::Smart,
        AtomKind::Fuzzy,
    );

    let mut buf = Vec::new();
    let mut scored: Vec<(usize, u32)> = haystack
        .iter()
        .enumerate()
        .filter_map(|(idx, text)| {
            pattern
                .score(Utf32Str::new(text.as_ref(), &mut buf), &mut matcher)
                .map(|score| (idx, score))
        })
        .collect();

    // Stable sort keeps input order among equal scores.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(idx, _)| idx).collect()
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Skills whose name or description contains `query`, fuzzy-ranked first.
pub fn search_skills(skills: &[SkillMetadata], query: &str) -> Vec<SkillMetadata> {
    let haystack: Vec<String> = skills
        .iter()
        .map(|s| format!("{} {}", s.name, s.description))
        .collect();

    let mut order = rank_strings(&haystack, query);
    for idx in 0..skills.len() {
        if !order.contains(&idx) {
            order.push(idx);
        }
    }

    order
        .into_iter()
        .filter(|&idx| contains_ignore_case(&haystack[idx], query))
        .map(|idx| skills[idx].clone())
        .collect()
}

/// A skill whose manifest text contains the query.
#[derive(Debug, Clone)]
pub struct ContentHit {
    pub skill: SkillMetadata,
    pub content: String,
}

/// Skills whose manifest text contains `query`. Unreadable manifests are skipped.
pub fn search_content(skills: &[SkillMetadata], query: &str) -> Vec<ContentHit> {
    skills
        .iter()
        .filter_map(|meta| match registry::load_skill(meta) {
            Ok(skill) => Some(ContentHit {
                skill: meta.clone(),
                content: skill.content,
            }),
            Err(e) => {
                warn!(path = %meta.path.display(), error = %e, "failed to load skill");
                None
            },
        })
        .filter(|hit| contains_ignore_case(&hit.content, query))
        .collect()
}

/// A window of roughly `width` characters around the first match of `query`.
pub fn snippet(content: &str, query: &str, width: usize) -> Option<String> {
    if query.is_empty() {
        return None;
    }
    // ASCII folding keeps byte offsets aligned with `content`.
    let at = content
        .to_ascii_lowercase()
        .find(&query.to_ascii_lowercase())?;

    let chars: Vec<char> = content.chars().collect();
    let hit = content[..at].chars().count();
    let start = hit.saturating_sub(width / 2);
    let end = (start + width).min(chars.len());

    let mut out = String::new();
    if start > 0 {
        out.push('…');
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push('…');
    }
    Some(out.replace('\n', " "))
}
