//! Handlers for the skill subcommands.

use std::path::{Path, PathBuf};

use {
    anyhow::{Result, bail},
    serde_json::json,
    skilldeck_skills::{
        FilterSet, RegistryDiagnostics, SkillMetadata, SkillRegistry, StateFilter, ToggleMode,
        ToggleSummary, apply_filters,
        parse::validate_skill_file,
        registry::load_skill,
        resolve_many, resolve_one,
        search::{search_content, search_skills, snippet},
        toggle::toggle_all,
        types::{DISABLED_SKILL_FILE, SKILL_FILE},
    },
};

/// Characters of context shown around a content match.
const SNIPPET_WIDTH: usize = 80;

/// Everything a handler needs, built once from flags and config.
pub struct Context {
    pub registry: SkillRegistry,
    pub filters: FilterSet,
    pub state: StateFilter,
    pub json: bool,
}

impl Context {
    fn visible(&self, state: StateFilter) -> Vec<SkillMetadata> {
        apply_filters(self.registry.all(), &self.filters, state)
    }

    /// Resolve `name` among the records the selectors and state flags show.
    fn resolve(&self, name: &str) -> Result<SkillMetadata> {
        Ok(resolve_one(&self.visible(self.state), name)?.clone())
    }

    /// Records a toggle acts on. Names resolve among the visible skills not
    /// yet in the target state; no names means all of them.
    fn toggle_targets(&self, mode: ToggleMode, names: &[String]) -> Result<Vec<SkillMetadata>> {
        let candidates = self.visible(match mode {
            ToggleMode::Enable => StateFilter::Disabled,
            ToggleMode::Disable => StateFilter::Enabled,
        });
        if names.is_empty() {
            return Ok(candidates);
        }
        Ok(resolve_many(&candidates, names)?
            .into_iter()
            .cloned()
            .collect())
    }
}

pub fn list(ctx: &Context, diagnostics: bool) -> Result<()> {
    let skills = ctx.visible(ctx.state);

    if ctx.json {
        let value = if diagnostics {
            json!({ "skills": skills, "diagnostics": ctx.registry.diagnostics() })
        } else {
            serde_json::to_value(&skills)?
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if skills.is_empty() {
        println!("No skills found.");
    }
    for skill in &skills {
        println!("{}", format_row(skill));
    }
    if diagnostics {
        print_diagnostics(ctx.registry.diagnostics());
    }
    Ok(())
}

pub fn info(ctx: &Context, name: &str) -> Result<()> {
    let skill = load_skill(&ctx.resolve(name)?)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&skill)?);
        return Ok(());
    }

    let meta = &skill.metadata;
    println!("Name:        {}", meta.name);
    println!("Id:          {}", meta.display_id());
    println!("Description: {}", meta.description);
    println!("Provider:    {}", meta.provider);
    println!("Location:    {}", meta.location);
    println!("State:       {}", if meta.disabled {
        "disabled"
    } else {
        "enabled"
    });
    if let Some(ref plugin) = meta.plugin_info {
        println!(
            "Plugin:      {}@{} ({})",
            plugin.plugin_name, plugin.marketplace, plugin.version
        );
    }
    let extras: Vec<&str> = [
        (meta.has_references, "references"),
        (meta.has_scripts, "scripts"),
        (meta.has_assets, "assets"),
    ]
    .into_iter()
    .filter_map(|(present, dir)| present.then_some(dir))
    .collect();
    if !extras.is_empty() {
        println!("Resources:   {}", extras.join(", "));
    }
    println!("Path:        {}", meta.path.display());
    println!("\n{}", skill.body);
    Ok(())
}

pub fn search(ctx: &Context, query: &str, content: bool, limit: Option<usize>) -> Result<()> {
    let pool = ctx.visible(ctx.state);
    let limit = limit.unwrap_or(usize::MAX);

    if content {
        let hits: Vec<_> = search_content(&pool, query)
            .into_iter()
            .take(limit)
            .collect();
        if ctx.json {
            let entries: Vec<_> = hits
                .iter()
                .map(|hit| {
                    json!({
                        "skill": hit.skill,
                        "snippet": snippet(&hit.content, query, SNIPPET_WIDTH),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }
        if hits.is_empty() {
            println!("No skills mention '{query}'.");
        }
        for hit in &hits {
            println!("{}", format_row(&hit.skill));
            if let Some(text) = snippet(&hit.content, query, SNIPPET_WIDTH) {
                println!("    {text}");
            }
        }
        return Ok(());
    }

    let matches: Vec<_> = search_skills(&pool, query).into_iter().take(limit).collect();
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }
    if matches.is_empty() {
        println!("No skills match '{query}'.");
    }
    for skill in &matches {
        println!("{}", format_row(skill));
    }
    Ok(())
}

pub fn validate(ctx: &Context, target: &str) -> Result<()> {
    let path = manifest_for(ctx, target)?;
    let report = validate_skill_file(&path);

    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "path": path, "report": report }))?
        );
    } else if report.success {
        println!("✓ {} is valid", path.display());
    } else {
        println!("✗ {}", path.display());
        for error in &report.errors {
            println!("  error: {error}");
        }
        for hint in &report.suggestions {
            println!("  hint:  {hint}");
        }
    }

    if !report.success {
        bail!("{} failed validation", path.display());
    }
    Ok(())
}

/// Toggle the named skills, or every visible skill not yet in the target state.
pub fn toggle(ctx: &Context, mode: ToggleMode, names: &[String], force: bool) -> Result<()> {
    let targets = ctx.toggle_targets(mode, names)?;
    let summary = toggle_all(mode, &targets, force);
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.failed > 0 {
        bail!("{} skill(s) failed to {mode}", summary.failed);
    }
    Ok(())
}

/// A path argument wins; anything else is looked up as a skill name.
fn manifest_for(ctx: &Context, target: &str) -> Result<PathBuf> {
    let path = Path::new(target);
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.is_dir() {
        let disabled = path.join(DISABLED_SKILL_FILE);
        let enabled = path.join(SKILL_FILE);
        return Ok(if !enabled.exists() && disabled.exists() {
            disabled
        } else {
            enabled
        });
    }
    Ok(ctx.resolve(target)?.manifest_path())
}

fn format_row(skill: &SkillMetadata) -> String {
    let mut row = format!(
        "  {} — {} [{}]",
        skill.display_id(),
        skill.description,
        skill.location
    );
    if skill.disabled {
        row.push_str(" (disabled)");
    }
    row
}

fn print_summary(summary: &ToggleSummary) {
    for result in &summary.results {
        match &result.error {
            Some(error) => println!("  {:<8} {}: {error}", result.status, result.skill),
            None => println!("  {:<8} {}", result.status, result.skill),
        }
    }
    println!(
        "{} {}d, {} skipped, {} failed",
        summary.succeeded, summary.mode, summary.skipped, summary.failed
    );
}

fn print_diagnostics(diag: &RegistryDiagnostics) {
    eprintln!("\n{} skill(s) total", diag.total_skills);
    for (location, count) in &diag.by_location {
        eprintln!("  {location}: {count}");
    }
    for (provider, count) in &diag.by_provider {
        eprintln!("  {provider}: {count}");
    }
    eprintln!("{} director(ies) scanned", diag.directories_scanned.len());
    for source in &diag.plugin_sources {
        eprintln!("plugin manifest: {}", source.display());
    }
    for warning in &diag.warnings {
        eprintln!("warning: {warning}");
    }
    for conflict in &diag.conflicts {
        eprintln!("conflict: {conflict}");
    }
}
