//! Upward message protocol (isolated context -> host) and error
//! categorization.
//!
//! Wire shape, JSON:
//!   { "type": "artifact-error", "message": "..." }
//!   { "type": "artifact-ready" }
//!
//! There is no downward protocol; a document is fully parameterized when
//! it is synthesized.

use crate::error::ProtocolError;
use crate::sanitize::check_depth;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default cap on a single upward message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpwardMessage {
    #[serde(rename = "artifact-error")]
    Error { message: String },
    #[serde(rename = "artifact-ready")]
    Ready,
}

impl UpwardMessage {
    /// Parse a raw message posted by an isolated context.
    pub fn parse(raw: &str, max_bytes: usize) -> Result<Self, ProtocolError> {
        if raw.len() > max_bytes {
            return Err(ProtocolError::TooLarge {
                size: raw.len(),
                max: max_bytes,
            });
        }
        let value: serde_json::Value = serde_json::from_str(raw)?;
        check_depth(&value)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Runtime,
    Import,
    Unknown,
}

const SYNTAX_MARKERS: &[&str] = &[
    "SyntaxError",
    "Unexpected token",
    "Unexpected end of input",
    "Invalid or unexpected token",
    "Unterminated",
    "Parse error",
    "missing ) after",
];

const IMPORT_MARKERS: &[&str] = &[
    "Cannot find module",
    "Failed to resolve module",
    "Failed to fetch dynamically imported module",
    "does not provide an export named",
    "Module not found",
    "Failed to load resource",
];

static UNDEFINED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:([A-Za-z_$][\w$]*) is not defined",
        r"|Can't find variable: ([A-Za-z_$][\w$]*))",
    ))
    .unwrap()
});
static RUNTIME_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\b[A-Z]\w*Error\b|^\s+at\s|\w@\S+:\d+").unwrap());

/// Classifies error messages with ordered keyword heuristics.
///
/// An undefined identifier counts as an import failure only when it names a
/// global of a known external library.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    external_globals: HashSet<String>,
}

impl ErrorClassifier {
    pub fn new(external_globals: impl IntoIterator<Item = String>) -> Self {
        Self {
            external_globals: external_globals.into_iter().collect(),
        }
    }

    pub fn categorize(&self, message: &str) -> ErrorCategory {
        if SYNTAX_MARKERS.iter().any(|m| message.contains(m)) {
            return ErrorCategory::Syntax;
        }
        if IMPORT_MARKERS.iter().any(|m| message.contains(m)) {
            return ErrorCategory::Import;
        }
        if let Some(caps) = UNDEFINED_NAME.captures(message) {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            if name.is_some_and(|n| self.external_globals.contains(n)) {
                return ErrorCategory::Import;
            }
            return ErrorCategory::Runtime;
        }
        if RUNTIME_SHAPE.is_match(message) {
            return ErrorCategory::Runtime;
        }
        ErrorCategory::Unknown
    }
}
