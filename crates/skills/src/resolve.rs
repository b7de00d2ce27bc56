//! Turn user-typed names into concrete records.

use crate::{
    error::{Error, Result},
    search::rank_strings,
    types::{Provider, SkillMetadata},
};

/// Suggestions offered on a miss.
pub const SUGGESTION_LIMIT: usize = 3;

/// Split an optional `claude:`/`codex:`/`file:` prefix off a lower-cased query.
pub(crate) fn split_provider(query: &str) -> (Option<Provider>, String) {
    let lower = query.trim().to_lowercase();
    if let Some((head, rest)) = lower.split_once(':')
        && let Ok(provider) = head.parse::<Provider>()
    {
        return (Some(provider), rest.to_string());
    }
    (None, lower)
}

/// Display ids from `pool` closest to `query`.
pub(crate) fn suggest<'a>(
    pool: impl IntoIterator<Item = &'a SkillMetadata>,
    query: &str,
) -> Vec<String> {
    let ids: Vec<String> = pool.into_iter().map(SkillMetadata::display_id).collect();
    rank_strings(&ids, query)
        .into_iter()
        .take(SUGGESTION_LIMIT)
        .map(|idx| ids[idx].clone())
        .collect()
}

/// One record per bundle path, first occurrence kept.
///
/// The enabled and disabled manifests of one bundle are the same skill, so
/// they never make a query ambiguous. Callers that care which variant wins
/// narrow the list by state first.
pub(crate) fn distinct_bundles<'a>(
    matches: impl IntoIterator<Item = &'a SkillMetadata>,
) -> Vec<&'a SkillMetadata> {
    let mut out: Vec<&SkillMetadata> = Vec::new();
    for skill in matches {
        if !out.iter().any(|s| s.path == skill.path) {
            out.push(skill);
        }
    }
    out
}

/// Resolve one query against `skills` by alias.
pub fn resolve_one<'a>(skills: &'a [SkillMetadata], query: &str) -> Result<&'a SkillMetadata> {
    let (provider, target) = split_provider(query);
    let in_pool = |s: &&SkillMetadata| provider.is_none_or(|p| s.provider == p);

    let matches = distinct_bundles(
        skills
            .iter()
            .filter(in_pool)
            .filter(|s| s.aliases().contains(&target)),
    );

    match matches.as_slice() {
        [one] => Ok(*one),
        [] => Err(Error::not_found(
            query,
            suggest(skills.iter().filter(in_pool), query),
        )),
        many => Err(Error::ambiguous(
            query,
            many.iter().map(|s| s.display_id()).collect(),
        )),
    }
}

/// Resolve each query in order, dropping repeats of the same bundle.
pub fn resolve_many<'a, S: AsRef<str>>(
    skills: &'a [SkillMetadata],
    queries: &[S],
) -> Result<Vec<&'a SkillMetadata>> {
    let mut selected: Vec<&SkillMetadata> = Vec::new();
    for query in queries {
        let skill = resolve_one(skills, query.as_ref())?;
        if !selected.iter().any(|s| s.path == skill.path) {
            selected.push(skill);
        }
    }
    Ok(selected)
}
