//! Per-artifact preview session state machine.
//!
//! ```text
//!   mount / resynthesis
//!          |
//!          v
//!      Loading --ready / timeout--> Ready
//!          |                          |
//!          +------error------> Errored <---error--+
//! ```
//!
//! `Errored -> Ready` only happens through a new document version. Every
//! update carries the version it belongs to; updates for any other version
//! are stale and ignored.

use crate::approval::Injection;
use crate::artifact::{Artifact, ArtifactId, ArtifactKind};
use crate::protocol::{ErrorCategory, ErrorClassifier, UpwardMessage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    Loading,
    Ready,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    pub message: String,
    pub category: ErrorCategory,
}

/// What an update did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Accepted but no visible change (e.g. a second ready).
    Unchanged,
    Ready,
    Errored,
    /// Belonged to a superseded document version.
    Stale,
}

/// Live state of one mounted artifact. In memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSession {
    artifact_id: ArtifactId,
    loading_state: LoadingState,
    error: Option<SessionError>,
    injected_resources: BTreeSet<String>,
    document_version: u64,
    #[serde(skip)]
    handshake_settled: bool,
}

impl PreviewSession {
    pub fn new(artifact_id: ArtifactId) -> Self {
        Self {
            artifact_id,
            loading_state: LoadingState::Loading,
            error: None,
            injected_resources: BTreeSet::new(),
            document_version: 0,
            handshake_settled: false,
        }
    }

    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact_id
    }

    pub fn loading_state(&self) -> LoadingState {
        self.loading_state
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    pub fn error_category(&self) -> Option<ErrorCategory> {
        self.error.as_ref().map(|e| e.category)
    }

    pub fn injected_resources(&self) -> &BTreeSet<String> {
        &self.injected_resources
    }

    pub fn document_version(&self) -> u64 {
        self.document_version
    }

    /// Start a new document version. Resets to `Loading` and clears the
    /// previous error.
    pub fn begin_version(&mut self, injection: &Injection) -> u64 {
        self.document_version += 1;
        self.loading_state = LoadingState::Loading;
        self.error = None;
        self.injected_resources = injection.resource_urls().clone();
        self.handshake_settled = false;
        tracing::debug!(
            artifact = %self.artifact_id,
            version = self.document_version,
            injected = self.injected_resources.len(),
            "preview session loading"
        );
        self.document_version
    }

    /// Apply an upward message from the context mounted for `version`.
    pub fn apply(
        &mut self,
        version: u64,
        message: &UpwardMessage,
        classifier: &ErrorClassifier,
    ) -> Transition {
        if version != self.document_version {
            tracing::debug!(
                artifact = %self.artifact_id,
                message_version = version,
                current = self.document_version,
                "dropping stale context message"
            );
            return Transition::Stale;
        }

        match message {
            UpwardMessage::Ready => self.mark_ready(version),
            UpwardMessage::Error { message } => {
                let category = classifier.categorize(message);
                self.fail(version, message.clone(), category)
            }
        }
    }

    /// First ready for the current version wins; ignored once errored.
    pub fn mark_ready(&mut self, version: u64) -> Transition {
        if version != self.document_version {
            return Transition::Stale;
        }
        self.handshake_settled = true;
        if self.loading_state != LoadingState::Loading {
            return Transition::Unchanged;
        }
        self.loading_state = LoadingState::Ready;
        tracing::debug!(artifact = %self.artifact_id, version, "preview ready");
        Transition::Ready
    }

    /// Record an error. The most recent error replaces any earlier one.
    pub fn fail(&mut self, version: u64, message: String, category: ErrorCategory) -> Transition {
        if version != self.document_version {
            return Transition::Stale;
        }
        tracing::debug!(artifact = %self.artifact_id, version, ?category, "preview errored");
        self.handshake_settled = true;
        self.loading_state = LoadingState::Errored;
        self.error = Some(SessionError { message, category });
        Transition::Errored
    }

    /// The handshake timeout for `version` expired. Content that never
    /// signalled is optimistically treated as ready, without an error.
    pub fn expire_timeout(&mut self, version: u64) -> Transition {
        if version != self.document_version {
            return Transition::Stale;
        }
        if self.handshake_settled || self.loading_state != LoadingState::Loading {
            return Transition::Unchanged;
        }
        tracing::info!(
            artifact = %self.artifact_id,
            version,
            "no handshake before timeout, assuming ready"
        );
        self.handshake_settled = true;
        self.loading_state = LoadingState::Ready;
        Transition::Ready
    }

    /// Build a repair request for the current error, if there is one.
    pub fn fix_request(&self, artifact: &Artifact) -> Option<FixRequest> {
        if self.loading_state != LoadingState::Errored {
            return None;
        }
        let error = self.error.as_ref()?;
        Some(FixRequest {
            artifact_id: artifact.id.clone(),
            kind: artifact.kind,
            category: error.category,
            message: error.message.clone(),
            content: artifact.content.clone(),
        })
    }
}

/// Payload for the external repair collaborator ("ask for a fix").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRequest {
    pub artifact_id: ArtifactId,
    pub kind: ArtifactKind,
    pub category: ErrorCategory,
    pub message: String,
    pub content: String,
}

impl FixRequest {
    pub fn prompt(&self) -> String {
        let category = match self.category {
            ErrorCategory::Syntax => "a syntax error",
            ErrorCategory::Runtime => "a runtime error",
            ErrorCategory::Import => "a missing dependency",
            ErrorCategory::Unknown => "an error",
        };
        format!(
            "The {} artifact failed to render with {}:\n\n{}\n\nPlease fix it.",
            self.kind, category, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (PreviewSession, u64) {
        let mut session = PreviewSession::new(ArtifactId::from("art-1"));
        let version = session.begin_version(&Injection::default());
        (session, version)
    }

    fn error(message: &str) -> UpwardMessage {
        UpwardMessage::Error {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_ready_handshake() {
        let (mut session, v) = session();
        let classifier = ErrorClassifier::default();
        assert_eq!(session.loading_state(), LoadingState::Loading);
        assert_eq!(session.apply(v, &UpwardMessage::Ready, &classifier), Transition::Ready);
        assert_eq!(session.apply(v, &UpwardMessage::Ready, &classifier), Transition::Unchanged);
        assert_eq!(session.loading_state(), LoadingState::Ready);
    }

    #[test]
    fn test_syntax_error_message() {
        let (mut session, v) = session();
        let classifier = ErrorClassifier::default();
        let t = session.apply(v, &error("SyntaxError: Unexpected token"), &classifier);
        assert_eq!(t, Transition::Errored);
        assert_eq!(session.error_category(), Some(ErrorCategory::Syntax));
        assert_eq!(session.error_message(), Some("SyntaxError: Unexpected token"));
    }

    #[test]
    fn test_latest_error_wins_and_ready_cannot_clear_it() {
        let (mut session, v) = session();
        let classifier = ErrorClassifier::default();
        session.apply(v, &error("SyntaxError: first"), &classifier);
        session.apply(v, &error("TypeError: second"), &classifier);
        assert_eq!(session.error_message(), Some("TypeError: second"));
        assert_eq!(session.error_category(), Some(ErrorCategory::Runtime));

        assert_eq!(session.apply(v, &UpwardMessage::Ready, &classifier), Transition::Unchanged);
        assert_eq!(session.loading_state(), LoadingState::Errored);

        // Only a new version recovers.
        let v2 = session.begin_version(&Injection::default());
        assert_eq!(session.loading_state(), LoadingState::Loading);
        assert!(session.error().is_none());
        assert_eq!(session.apply(v2, &UpwardMessage::Ready, &classifier), Transition::Ready);
    }

    #[test]
    fn test_error_after_ready() {
        let (mut session, v) = session();
        let classifier = ErrorClassifier::default();
        session.apply(v, &UpwardMessage::Ready, &classifier);
        assert_eq!(session.apply(v, &error("TypeError: x"), &classifier), Transition::Errored);
    }

    #[test]
    fn test_stale_versions_are_ignored() {
        let (mut session, old) = session();
        let classifier = ErrorClassifier::default();
        let current = session.begin_version(&Injection::default());
        assert_ne!(old, current);

        assert_eq!(session.apply(old, &error("SyntaxError: old"), &classifier), Transition::Stale);
        assert_eq!(session.apply(old, &UpwardMessage::Ready, &classifier), Transition::Stale);
        assert_eq!(session.expire_timeout(old), Transition::Stale);
        assert_eq!(session.loading_state(), LoadingState::Loading);
        assert!(session.error().is_none());
    }

    #[test]
    fn test_timeout_fallback_once() {
        let (mut session, v) = session();
        assert_eq!(session.expire_timeout(v), Transition::Ready);
        assert_eq!(session.expire_timeout(v), Transition::Unchanged);
        assert_eq!(session.loading_state(), LoadingState::Ready);
        assert!(session.error_message().is_none());
    }

    #[test]
    fn test_timeout_after_error_keeps_error() {
        let (mut session, v) = session();
        session.apply(v, &error("boom"), &ErrorClassifier::default());
        assert_eq!(session.expire_timeout(v), Transition::Unchanged);
        assert_eq!(session.loading_state(), LoadingState::Errored);
        assert_eq!(session.error_category(), Some(ErrorCategory::Unknown));
    }

    #[test]
    fn test_fix_request() {
        let (mut session, v) = session();
        let artifact = Artifact::new(ArtifactKind::Markup, "t", "<script>x(</script>");
        assert!(session.fix_request(&artifact).is_none());

        let classifier = ErrorClassifier::default();
        session.apply(v, &error("SyntaxError: Unexpected end of input"), &classifier);
        let request = session.fix_request(&artifact).unwrap();
        assert_eq!(request.category, ErrorCategory::Syntax);
        assert!(request.prompt().contains("a syntax error"));
        assert!(request.prompt().contains("Unexpected end of input"));
    }
}
