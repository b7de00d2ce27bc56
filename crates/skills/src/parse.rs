use std::path::Path;

use {
    serde::Serialize,
    serde_yaml::{Mapping, Value},
};

use crate::error::{Error, Result};

/// Frontmatter with the two required fields pulled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillFrontmatter {
    pub name: String,
    /// Single paragraph, whitespace collapsed.
    pub description: String,
    /// Every other key, passed through unvalidated.
    pub extra: Mapping,
}

/// A decoded manifest.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub frontmatter: SkillFrontmatter,
    /// Markdown after the closing `---`.
    pub body: String,
    /// The file as read, frontmatter included.
    pub full_content: String,
}

/// Outcome of [`validate_skill_file`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    pub errors: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Read and parse a `SKILL.md` (or `.SKILL.md`) file.
///
/// Unreadable files, non-UTF-8 content and undecodable frontmatter are
/// [`Error::Parse`]; a decodable header missing `name`/`description` is
/// [`Error::Validation`].
pub fn parse_skill_file(path: &Path) -> Result<ParsedManifest> {
    let bytes = std::fs::read(path).map_err(|e| Error::parse(path, e.to_string(), Vec::new()))?;
    let content = String::from_utf8(bytes).map_err(|_| {
        Error::parse(path, "Invalid UTF-8 encoding", vec![
            "Ensure SKILL.md is saved with UTF-8 encoding (no BOM).".into(),
            "If the file was copied from another editor, re-save it as UTF-8.".into(),
        ])
    })?;
    parse_skill_content(content, path)
}

/// Parse manifest text already in memory. `path` is only used for messages.
pub fn parse_skill_content(content: String, path: &Path) -> Result<ParsedManifest> {
    let (header, body) = split_frontmatter(&content, path)?;
    let mapping = decode_header(header, path)?;
    let frontmatter = validate_frontmatter(mapping, path)?;
    let body = body.to_string();
    Ok(ParsedManifest {
        frontmatter,
        body,
        full_content: content,
    })
}

/// Check a manifest without failing; the report carries issues and hints.
pub fn validate_skill_file(path: &Path) -> ValidationReport {
    match parse_skill_file(path) {
        Ok(_) => ValidationReport {
            success: true,
            ..Default::default()
        },
        Err(Error::Validation {
            issues,
            suggestions,
            ..
        }) => ValidationReport {
            success: false,
            errors: issues,
            suggestions,
        },
        Err(Error::Parse {
            reason,
            suggestions,
            ..
        }) => ValidationReport {
            success: false,
            errors: vec![reason],
            suggestions,
        },
        Err(other) => ValidationReport {
            success: false,
            errors: vec![other.to_string()],
            suggestions: Vec::new(),
        },
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_description(description: &str) -> String {
    description.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split content at `---` delimiters into (frontmatter, body).
fn split_frontmatter<'a>(content: &'a str, path: &Path) -> Result<(&'a str, &'a str)> {
    let trimmed = content.trim_start();
    let Some(after_open) = trimmed.strip_prefix("---") else {
        return Err(Error::parse(path, "Missing YAML frontmatter", vec![
            "Add a YAML frontmatter block at the top of SKILL.md:".into(),
            "---".into(),
            "name: <skill-name>".into(),
            "description: <what the skill does>".into(),
            "---".into(),
        ]));
    };

    let close_pos = after_open.find("\n---").ok_or_else(|| {
        Error::parse(path, "Missing closing --- for frontmatter", vec![
            "Ensure the frontmatter is wrapped between leading and trailing '---' lines.".into(),
        ])
    })?;

    let header = &after_open[..close_pos];
    // Skip the rest of the closing delimiter line.
    let rest = &after_open[close_pos + 4..];
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => "",
    };
    Ok((header, body.trim_start_matches(['\r', '\n'])))
}

fn decode_header(header: &str, path: &Path) -> Result<Mapping> {
    if header.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let value: Value = serde_yaml::from_str(header).map_err(|e| {
        Error::parse(path, e.to_string(), vec![
            "Check the YAML frontmatter for syntax issues (colons, indentation).".into(),
            "Ensure the frontmatter is wrapped between leading and trailing '---' lines.".into(),
        ])
    })?;
    match value {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::validation(
            path,
            vec!["frontmatter: Expected a mapping of fields".into()],
            vec![
                "Ensure SKILL.md frontmatter includes non-empty 'name' and 'description' fields."
                    .into(),
            ],
        )),
    }
}

fn validate_frontmatter(mut mapping: Mapping, path: &Path) -> Result<SkillFrontmatter> {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    let name = take_required(&mut mapping, "name", path, &mut issues, &mut suggestions);
    let description = take_required(
        &mut mapping,
        "description",
        path,
        &mut issues,
        &mut suggestions,
    );

    match (name, description) {
        (Some(name), Some(description)) if issues.is_empty() => Ok(SkillFrontmatter {
            name,
            description: normalize_description(&description),
            extra: mapping,
        }),
        _ => {
            if suggestions.is_empty() {
                suggestions.push(
                    "Ensure SKILL.md frontmatter includes non-empty 'name' and 'description' fields."
                        .into(),
                );
            }
            Err(Error::validation(path, issues, suggestions))
        },
    }
}

fn take_required(
    mapping: &mut Mapping,
    field: &str,
    path: &Path,
    issues: &mut Vec<String>,
    suggestions: &mut Vec<String>,
) -> Option<String> {
    match mapping.remove(field) {
        None | Some(Value::Null) => {
            issues.push(format!(
                "Missing required field '{field}' in {}",
                path.display()
            ));
            suggestions.push(format!("Add '{field}: <value>' to the YAML frontmatter."));
            None
        },
        Some(Value::String(s)) if s.trim().is_empty() => {
            issues.push(format!("{field}: Skill {field} cannot be empty"));
            suggestions.push(format!("Provide a non-empty value for '{field}'."));
            None
        },
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            issues.push(format!("{field}: Expected string"));
            None
        },
    }
}
