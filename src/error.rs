//! Error taxonomy for the preview engine.
//!
//! - [`RegistryError`]: the resource registry could not be loaded. Fatal at
//!   startup; a malformed row is never skipped.
//! - [`ApprovalStoreError`]: the persisted approval record could not be read
//!   or written. Callers treat it as "not approved".
//! - [`SynthesisError`]: a document could not be produced for an artifact.
//! - [`ProtocolError`]: an upward message from an isolated context was
//!   rejected before it reached any session.
//! - [`BoundaryError`]: the execution host could not mount a document.

use std::path::PathBuf;

/// Registry load failure (a detection fault).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry table is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("io error reading registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("library '{library}' has an invalid detection pattern: {source}")]
    InvalidPattern {
        library: String,
        #[source]
        source: regex::Error,
    },

    #[error("library '{0}' declares no inclusion tags")]
    MissingTags(String),

    #[error("library '{library}' has a tag without a src/href attribute: {tag}")]
    UnresolvableTag { library: String, tag: String },

    #[error("library '{library}' points at an invalid resource url '{url}': {reason}")]
    InvalidResource {
        library: String,
        url: String,
        reason: String,
    },

    #[error("library '{0}' is declared more than once")]
    Duplicate(String),
}

/// Failure against the persisted approval record.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalStoreError {
    #[error("io error on approval store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("approval store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("approval store unavailable: {0}")]
    Unavailable(String),
}

/// Failure producing a previewable document.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The diagram collaborator rejected the source. The message is shown
    /// to the user as-is.
    #[error("{0}")]
    Diagram(String),

    #[error("unknown artifact kind: '{0}'")]
    UnknownKind(String),
}

/// An upward message that never reaches session state.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("message too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("message nesting too deep (max {0} levels)")]
    TooDeep(usize),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The execution host refused or failed to mount a document.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("failed to mount document for version {version}: {reason}")]
    Mount { version: u64, reason: String },
}
