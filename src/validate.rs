//! Shared validation pattern table and the validation collaborator contract.
//!
//! The deep structural linter lives outside this crate. What is shared is
//! the pattern table: text-matching rules keyed by category, each with a
//! fixed severity and message. [`PatternValidator`] applies that table on
//! its own and is what the engine uses when no linter is plugged in.

use crate::artifact::ArtifactKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    ImportRestriction,
    InlineEventHandler,
    DangerousTag,
    BrowserStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One rule of the shared table.
#[derive(Debug)]
pub struct ValidationPattern {
    pub category: PatternCategory,
    pub severity: Severity,
    pub regex: Regex,
    pub message: &'static str,
    /// Kinds the rule applies to.
    pub kinds: &'static [ArtifactKind],
    /// If the regex has a capture group, matches whose first group is in
    /// this list are allowed.
    pub allow: &'static [&'static str],
}

const SCRIPTED: &[ArtifactKind] = &[
    ArtifactKind::Code,
    ArtifactKind::Markup,
    ArtifactKind::Component,
];
const MARKUP_LIKE: &[ArtifactKind] = &[
    ArtifactKind::Code,
    ArtifactKind::Markup,
    ArtifactKind::VectorImage,
];

fn pattern(
    category: PatternCategory,
    severity: Severity,
    regex: &str,
    message: &'static str,
    kinds: &'static [ArtifactKind],
    allow: &'static [&'static str],
) -> ValidationPattern {
    ValidationPattern {
        category,
        severity,
        regex: Regex::new(regex).unwrap(),
        message,
        kinds,
        allow,
    }
}

/// The shared pattern table.
pub static VALIDATION_PATTERNS: Lazy<Vec<ValidationPattern>> = Lazy::new(|| {
    vec![
        pattern(
            PatternCategory::ImportRestriction,
            Severity::Error,
            r#"(?m)^[ \t]*import\s+(?:[^'";]*?\s+from\s+)?['"]([^'"]+)['"]"#,
            "Only 'react' and 'react-dom' can be imported in a component preview",
            &[ArtifactKind::Component],
            &["react", "react-dom", "react-dom/client"],
        ),
        pattern(
            PatternCategory::ImportRestriction,
            Severity::Error,
            r#"\bfrom\s+['"](?:\.{1,2}/|/)[^'"]*['"]|\brequire\s*\(\s*['"](?:\.{1,2}/|/)"#,
            "Local file imports are not available in the preview",
            &[ArtifactKind::Code, ArtifactKind::Markup],
            &[],
        ),
        pattern(
            PatternCategory::InlineEventHandler,
            Severity::Warning,
            r"(?i)<[a-z][^>]*\son[a-z]+\s*=",
            "Inline event handlers are discouraged; attach listeners from a script",
            MARKUP_LIKE,
            &[],
        ),
        pattern(
            PatternCategory::DangerousTag,
            Severity::Warning,
            r"(?i)<\s*(?:iframe|object|embed|base)\b",
            "Embedded frames, objects and base tags may not work inside the sandbox",
            &[
                ArtifactKind::Code,
                ArtifactKind::Markup,
                ArtifactKind::Markdown,
                ArtifactKind::VectorImage,
            ],
            &[],
        ),
        pattern(
            PatternCategory::DangerousTag,
            Severity::Error,
            r"(?i)<\s*script\b",
            "Vector images cannot contain scripts",
            &[ArtifactKind::VectorImage],
            &[],
        ),
        pattern(
            PatternCategory::DangerousTag,
            Severity::Warning,
            r"(?i)\bjavascript\s*:",
            "javascript: URLs are blocked in previews",
            &[
                ArtifactKind::Code,
                ArtifactKind::Markup,
                ArtifactKind::Markdown,
                ArtifactKind::VectorImage,
            ],
            &[],
        ),
        pattern(
            PatternCategory::BrowserStorage,
            Severity::Warning,
            r"\b(?:localStorage|sessionStorage|indexedDB)\b",
            "Browser storage is not available in the sandboxed preview",
            SCRIPTED,
            &[],
        ),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub category: PatternCategory,
    pub severity: Severity,
    pub message: String,
    /// 1-based line of the match.
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Contract of the validation collaborator.
pub trait ContentValidator: Send + Sync {
    fn validate(&self, content: &str, kind: ArtifactKind) -> ValidationReport;
}

/// Applies [`VALIDATION_PATTERNS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternValidator;

impl ContentValidator for PatternValidator {
    fn validate(&self, content: &str, kind: ArtifactKind) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for rule in VALIDATION_PATTERNS.iter().filter(|r| r.kinds.contains(&kind)) {
            for caps in rule.regex.captures_iter(content) {
                let Some(whole) = caps.get(0) else { continue };
                if let Some(group) = caps.get(1) {
                    if rule.allow.contains(&group.as_str()) {
                        continue;
                    }
                }

                let issue = ValidationIssue {
                    category: rule.category,
                    severity: rule.severity,
                    message: rule.message.to_string(),
                    line: content[..whole.start()].matches('\n').count() + 1,
                };
                match rule.severity {
                    Severity::Error => errors.push(issue),
                    Severity::Warning => warnings.push(issue),
                }
            }
        }

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
