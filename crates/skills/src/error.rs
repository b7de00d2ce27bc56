use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("skill '{name}' not found")]
    NotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("skill name '{name}' is ambiguous; multiple skills found: {}", matches.join(", "))]
    Ambiguous { name: String, matches: Vec<String> },

    #[error("validation failed for {}: {}", path.display(), issues.join(", "))]
    Validation {
        path: PathBuf,
        issues: Vec<String>,
        suggestions: Vec<String>,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        reason: String,
        suggestions: Vec<String>,
    },

    #[error("invalid selector '{token}': {reason}")]
    InvalidSelector { token: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn not_found(name: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            suggestions,
        }
    }

    #[must_use]
    pub fn ambiguous(name: impl Into<String>, matches: Vec<String>) -> Self {
        Self::Ambiguous {
            name: name.into(),
            matches,
        }
    }

    #[must_use]
    pub fn parse(path: &Path, reason: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.into(),
            suggestions,
        }
    }

    #[must_use]
    pub fn validation(path: &Path, issues: Vec<String>, suggestions: Vec<String>) -> Self {
        Self::Validation {
            path: path.to_path_buf(),
            issues,
            suggestions,
        }
    }

    #[must_use]
    pub fn invalid_selector(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Remediation hints attached to the error, if any.
    ///
    /// For `Ambiguous` these are the fully-qualified ids of every match, which
    /// is what a caller should offer as a copy/paste-able next step.
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::NotFound { suggestions, .. }
            | Self::Validation { suggestions, .. }
            | Self::Parse { suggestions, .. } => suggestions,
            Self::Ambiguous { matches, .. } => matches,
            Self::InvalidSelector { .. } | Self::Io(_) => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_message_lists_matches() {
        let err = Error::ambiguous("pdf", vec!["claude:pdf".into(), "codex:pdf".into()]);
        assert_eq!(
            err.to_string(),
            "skill name 'pdf' is ambiguous; multiple skills found: claude:pdf, codex:pdf"
        );
        assert_eq!(err.suggestions().len(), 2);
    }

    #[test]
    fn selector_errors_carry_no_suggestions() {
        let err = Error::invalid_selector("codex:@plugins", "nope");
        assert!(err.suggestions().is_empty());
    }
}
