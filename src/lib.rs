//! # Artifact Preview
//!
//! A preview engine for untrusted, generated artifacts: code, markup,
//! markdown, diagrams, vector and raster images, and interactive
//! components.
//!
//! ## Security Guarantees
//!
//! - **No unapproved network resources**: a third-party tag is only injected
//!   if the content already carried it, the user approved it, or a standing
//!   per-user approval record covers it
//! - **Fail closed on store faults**: an unreadable approval record means
//!   "ask", never "inject"
//! - **No host-side execution**: diagrams and markdown are parsed and
//!   reduced to an allow-list of inert HTML and SVG before reaching the
//!   host tree
//! - **No cross-version leakage**: each mounted document has its own
//!   listener; it is torn down before the next version is mounted
//! - **Bounded handshake**: a context that never reports is assumed ready
//!   after a fixed timeout instead of spinning forever
//!
//! ## Usage
//!
//! ```rust,ignore
//! use artifact_preview::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PreviewConfig::default();
//!     let registry = Arc::new(ResourceRegistry::builtin()?);
//!     let store = Arc::new(MemoryApprovalStore::new());
//!     let gatekeeper = Arc::new(Gatekeeper::new(store, "user-1"));
//!     let theme = ThemeSynchronizer::default();
//!
//!     let engine = PreviewEngine::new(
//!         config,
//!         registry,
//!         gatekeeper,
//!         my_diagram_renderer,
//!         my_frame_host,
//!         Arc::new(PatternValidator),
//!     );
//!     let artifact = Artifact::new(ArtifactKind::Markup, "Demo", "<h1>Hi</h1>");
//!     let mut handle = engine.mount(artifact, theme.subscribe());
//!
//!     while let Some(event) = handle.next_event().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

mod approval;
mod artifact;
mod boundary;
mod config;
mod controller;
mod detect;
mod error;
mod protocol;
mod registry;
mod sanitize;
mod session;
mod synth;
mod theme;
mod validate;

pub use approval::{
    resolve, ApprovalDecision, ApprovalRecord, ApprovalRequest, ApprovalStore, FileApprovalStore,
    Gatekeeper, Injection, MemoryApprovalStore, RequestState, Resolution,
};
pub use artifact::{Artifact, ArtifactId, ArtifactKind};
pub use boundary::{ContextMessage, ContextPort, ExecutionHost, ListenerGuard, Mount};
pub use config::{PreviewConfig, COMPONENT_RUNTIME_GLOBALS};
pub use controller::{PreviewCommand, PreviewEngine, PreviewEvent, PreviewHandle};
pub use detect::{detect, DetectedLibrary};
pub use error::{ApprovalStoreError, BoundaryError, ProtocolError, RegistryError, SynthesisError};
pub use protocol::{ErrorCategory, ErrorClassifier, UpwardMessage, DEFAULT_MAX_MESSAGE_BYTES};
pub use registry::{InclusionTag, LibrarySignature, RegistryRow, ResourceRegistry};
pub use sanitize::sanitize_markup;
pub use session::{FixRequest, LoadingState, PreviewSession, SessionError, Transition};
pub use synth::{DiagramRenderer, DocumentSynthesizer, Synthesized, COMPONENT_ANCHOR};
pub use theme::{ThemeMode, ThemeSnapshot, ThemeSynchronizer};
pub use validate::{
    ContentValidator, PatternCategory, PatternValidator, Severity, ValidationIssue,
    ValidationPattern, ValidationReport, VALIDATION_PATTERNS,
};
