//! Resource registry - the static table of optional third-party libraries.
//!
//! Every row carries a detection pattern, the exact inclusion markup that
//! would be injected, and a human-readable purpose/provider shown in the
//! consent prompt. The table is loaded once and never mutated.
//!
//! Loading is all-or-nothing: a malformed pattern, a tag without a
//! resolvable `src`/`href`, or a non-`https` resource fails the whole load.

use crate::error::RegistryError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Built-in registry table, compiled into the binary.
const BUILTIN_TABLE: &str = include_str!("registry.toml");

static RESOURCE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:src|href)\s*=\s*["']([^"']+)["']"#).unwrap());

/// One row of the registry table as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRow {
    pub name: String,
    pub pattern: String,
    pub tags: Vec<String>,
    pub purpose: String,
    pub provider: String,
    #[serde(default)]
    pub globals: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryTable {
    #[serde(rename = "library", default)]
    libraries: Vec<RegistryRow>,
}

/// A single inclusion fragment and the network resource it loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionTag {
    pub markup: String,
    pub resource_url: Url,
}

/// A compiled registry entry.
#[derive(Debug, Clone)]
pub struct LibrarySignature {
    pub name: String,
    pub detection: Regex,
    pub inclusion_tags: Vec<InclusionTag>,
    pub purpose: String,
    pub provider: String,
    pub globals: Vec<String>,
}

impl LibrarySignature {
    fn compile(row: RegistryRow) -> Result<Self, RegistryError> {
        let detection = Regex::new(&row.pattern).map_err(|source| RegistryError::InvalidPattern {
            library: row.name.clone(),
            source,
        })?;

        if row.tags.is_empty() {
            return Err(RegistryError::MissingTags(row.name));
        }

        let inclusion_tags = row
            .tags
            .iter()
            .map(|tag| resolve_tag(&row.name, tag))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: row.name,
            detection,
            inclusion_tags,
            purpose: row.purpose,
            provider: row.provider,
            globals: row.globals,
        })
    }

    /// True if any of this library's inclusion tags is already in `content`.
    pub fn is_included_in(&self, content: &str) -> bool {
        self.inclusion_tags
            .iter()
            .any(|tag| content.contains(tag.markup.as_str()))
    }
}

fn resolve_tag(library: &str, tag: &str) -> Result<InclusionTag, RegistryError> {
    let raw = RESOURCE_ATTR
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| RegistryError::UnresolvableTag {
            library: library.to_string(),
            tag: tag.to_string(),
        })?;

    let url = Url::parse(raw).map_err(|e| RegistryError::InvalidResource {
        library: library.to_string(),
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "https" || url.host_str().is_none() {
        return Err(RegistryError::InvalidResource {
            library: library.to_string(),
            url: raw.to_string(),
            reason: "only https resources with a host are allowed".to_string(),
        });
    }

    Ok(InclusionTag {
        markup: tag.to_string(),
        resource_url: url,
    })
}

/// The compiled, immutable registry.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    libraries: Vec<LibrarySignature>,
}

impl ResourceRegistry {
    /// Load the table compiled into the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml(BUILTIN_TABLE)
    }

    /// Load a replacement table from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, RegistryError> {
        let table: RegistryTable = toml::from_str(text)?;
        Self::from_rows(table.libraries)
    }

    pub fn from_rows(rows: Vec<RegistryRow>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut libraries = Vec::with_capacity(rows.len());

        for row in rows {
            if !seen.insert(row.name.clone()) {
                return Err(RegistryError::Duplicate(row.name));
            }
            libraries.push(LibrarySignature::compile(row)?);
        }

        tracing::debug!(libraries = libraries.len(), "resource registry loaded");
        Ok(Self { libraries })
    }

    pub fn libraries(&self) -> &[LibrarySignature] {
        &self.libraries
    }

    pub fn get(&self, name: &str) -> Option<&LibrarySignature> {
        self.libraries.iter().find(|lib| lib.name == name)
    }

    /// The library that defines the global `ident`, if any.
    pub fn library_for_global(&self, ident: &str) -> Option<&LibrarySignature> {
        self.libraries
            .iter()
            .find(|lib| lib.globals.iter().any(|g| g == ident))
    }
}
