//! Artifact data model.

use crate::error::SynthesisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque artifact identifier, stable across edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ArtifactId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of renderable content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Code,
    Markup,
    Markdown,
    Diagram,
    VectorImage,
    Component,
    RasterImage,
}

impl ArtifactKind {
    /// Kinds that run inside an isolated execution context.
    pub fn is_sandboxed(self) -> bool {
        matches!(self, Self::Code | Self::Markup | Self::Component)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Markup => "markup",
            Self::Markdown => "markdown",
            Self::Diagram => "diagram",
            Self::VectorImage => "vector_image",
            Self::Component => "component",
            Self::RasterImage => "raster_image",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = SynthesisError;

    /// Accepts short names as well as the content-type identifiers hosts
    /// attach to generated artifacts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "code" | "application/vnd.ant.code" => Self::Code,
            "markup" | "html" | "text/html" => Self::Markup,
            "markdown" | "md" | "text/markdown" => Self::Markdown,
            "diagram" | "mermaid" | "application/vnd.ant.mermaid" => Self::Diagram,
            "vector_image" | "svg" | "image/svg+xml" => Self::VectorImage,
            "component" | "react" | "application/vnd.ant.react" => Self::Component,
            "raster_image" | "image" | "image/png" | "image/jpeg" | "image/gif" | "image/webp" => {
                Self::RasterImage
            }
            other => return Err(SynthesisError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

/// A unit of untrusted, renderable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: ArtifactId::new(),
            kind,
            title: title.into(),
            content: content.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Commit an in-place edit. Identity is kept, only the content changes.
    pub fn commit_edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        let kind = "application/vnd.ant.react".parse::<ArtifactKind>().unwrap();
        assert_eq!(kind, ArtifactKind::Component);
        assert_eq!("text/html".parse::<ArtifactKind>().unwrap(), ArtifactKind::Markup);
        assert_eq!("SVG".parse::<ArtifactKind>().unwrap(), ArtifactKind::VectorImage);
        assert_eq!("image/png".parse::<ArtifactKind>().unwrap(), ArtifactKind::RasterImage);

        let err = "application/x-unknown".parse::<ArtifactKind>().unwrap_err();
        assert!(err.to_string().contains("unknown artifact kind"));
    }

    #[test]
    fn test_edit_keeps_identity() {
        let mut artifact = Artifact::new(ArtifactKind::Markup, "Demo", "<p>one</p>");
        let id = artifact.id.clone();
        artifact.commit_edit("<p>two</p>");
        assert_eq!(artifact.id, id);
        assert_eq!(artifact.content, "<p>two</p>");
    }

    #[test]
    fn test_sandboxed_kinds() {
        assert!(ArtifactKind::Component.is_sandboxed());
        assert!(ArtifactKind::Code.is_sandboxed());
        assert!(!ArtifactKind::Diagram.is_sandboxed());
        assert!(!ArtifactKind::RasterImage.is_sandboxed());
    }
}
