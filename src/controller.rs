//! Preview session controller.
//!
//! One controller task per mounted artifact. It runs the pipeline
//!
//!   detect -> approval gate -> synthesize -> mount -> handshake
//!
//! and reruns it whenever the content changes, an approval is resolved or
//! the host theme changes. Every rerun is a new document version; the
//! listener for the previous version is dropped before the next one is
//! installed.
//!
//! The host drives a controller through a [`PreviewHandle`] and observes
//! it through [`PreviewEvent`]s.

use crate::approval::{ApprovalDecision, ApprovalRequest, Gatekeeper, Injection};
use crate::artifact::{Artifact, ArtifactId};
use crate::boundary::{ContextMessage, ExecutionHost, ListenerGuard};
use crate::config::{PreviewConfig, COMPONENT_RUNTIME_GLOBALS};
use crate::detect::detect;
use crate::protocol::{ErrorCategory, ErrorClassifier, UpwardMessage};
use crate::registry::ResourceRegistry;
use crate::session::{PreviewSession, Transition};
use crate::synth::{DiagramRenderer, DocumentSynthesizer};
use crate::theme::ThemeSnapshot;
use crate::validate::{ContentValidator, ValidationReport};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Host -> controller.
#[derive(Debug, Clone)]
pub enum PreviewCommand {
    /// The artifact was edited in place.
    ContentChanged(String),
    /// The user answered an approval request.
    ResolveApproval {
        request_id: uuid::Uuid,
        decision: ApprovalDecision,
    },
    /// Stop previewing; cancels the timeout and detaches the listener.
    Unmount,
}

/// Controller -> host UI.
#[derive(Debug, Clone)]
pub enum PreviewEvent {
    StateChanged(PreviewSession),
    ApprovalRequested(ApprovalRequest),
    Validated(ValidationReport),
}

struct EngineInner {
    registry: Arc<ResourceRegistry>,
    gatekeeper: Arc<Gatekeeper>,
    synthesizer: DocumentSynthesizer,
    host: Arc<dyn ExecutionHost>,
    validator: Arc<dyn ContentValidator>,
    classifier: ErrorClassifier,
    config: PreviewConfig,
}

/// Shared, immutable engine wiring. Cheap to clone.
#[derive(Clone)]
pub struct PreviewEngine {
    inner: Arc<EngineInner>,
}

impl PreviewEngine {
    pub fn new(
        config: PreviewConfig,
        registry: Arc<ResourceRegistry>,
        gatekeeper: Arc<Gatekeeper>,
        diagram: Arc<dyn DiagramRenderer>,
        host: Arc<dyn ExecutionHost>,
        validator: Arc<dyn ContentValidator>,
    ) -> Self {
        let globals = registry
            .libraries()
            .iter()
            .flat_map(|lib| lib.globals.iter().cloned())
            .chain(COMPONENT_RUNTIME_GLOBALS.iter().map(|g| g.to_string()));
        let classifier = ErrorClassifier::new(globals);
        let synthesizer = DocumentSynthesizer::new(
            diagram,
            config.component_runtime.clone(),
            config.default_viewbox.clone(),
        );

        Self {
            inner: Arc::new(EngineInner {
                registry,
                gatekeeper,
                synthesizer,
                host,
                validator,
                classifier,
                config,
            }),
        }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.inner.registry
    }

    pub fn synthesizer(&self) -> &DocumentSynthesizer {
        &self.inner.synthesizer
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.inner.gatekeeper
    }

    /// Start previewing `artifact`. Must be called inside a tokio runtime.
    pub fn mount(
        &self,
        artifact: Artifact,
        theme: watch::Receiver<ThemeSnapshot>,
    ) -> PreviewHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let artifact_id = artifact.id.clone();

        let controller = PreviewController {
            engine: self.inner.clone(),
            session: PreviewSession::new(artifact.id.clone()),
            artifact,
            theme,
            theme_open: true,
            listener: None,
            injection: Injection::default(),
            pending: None,
            handshake_deadline: None,
            validation_deadline: None,
            events: event_tx,
        };
        let task = tokio::spawn(controller.run(command_rx));

        PreviewHandle {
            artifact_id,
            commands: command_tx,
            events: event_rx,
            task,
        }
    }
}

/// Host-side handle to one running controller.
pub struct PreviewHandle {
    artifact_id: ArtifactId,
    commands: mpsc::UnboundedSender<PreviewCommand>,
    events: mpsc::UnboundedReceiver<PreviewEvent>,
    task: JoinHandle<()>,
}

impl PreviewHandle {
    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact_id
    }

    pub fn update_content(&self, content: impl Into<String>) {
        self.send(PreviewCommand::ContentChanged(content.into()));
    }

    pub fn resolve_approval(&self, request_id: uuid::Uuid, decision: ApprovalDecision) {
        self.send(PreviewCommand::ResolveApproval { request_id, decision });
    }

    fn send(&self, command: PreviewCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!(artifact = %self.artifact_id, "controller already stopped");
        }
    }

    pub async fn next_event(&mut self) -> Option<PreviewEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<PreviewEvent> {
        self.events.try_recv().ok()
    }

    /// Unmount and wait for the controller to finish tearing down.
    pub async fn unmount(self) {
        self.send(PreviewCommand::Unmount);
        if let Err(e) = self.task.await {
            tracing::warn!(artifact = %self.artifact_id, error = %e, "controller task failed");
        }
    }
}

struct PreviewController {
    engine: Arc<EngineInner>,
    artifact: Artifact,
    session: PreviewSession,
    theme: watch::Receiver<ThemeSnapshot>,
    theme_open: bool,
    listener: Option<ListenerGuard>,
    /// Injection cleared for the current content.
    injection: Injection,
    pending: Option<ApprovalRequest>,
    handshake_deadline: Option<(u64, Instant)>,
    validation_deadline: Option<Instant>,
    events: mpsc::UnboundedSender<PreviewEvent>,
}

impl PreviewController {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<PreviewCommand>) {
        tracing::info!(artifact = %self.artifact.id, kind = %self.artifact.kind, "preview mounted");
        self.refresh().await;
        self.schedule_validation();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(PreviewCommand::Unmount) => break,
                    Some(PreviewCommand::ContentChanged(content)) => {
                        self.artifact.commit_edit(content);
                        self.refresh().await;
                        self.schedule_validation();
                    }
                    Some(PreviewCommand::ResolveApproval { request_id, decision }) => {
                        self.resolve_approval(request_id, decision).await;
                    }
                },
                changed = self.theme.changed(), if self.theme_open => {
                    if changed.is_err() {
                        self.theme_open = false;
                        continue;
                    }
                    // Nothing is mounted while consent is outstanding; the
                    // new theme is read when rendering resumes.
                    if self.pending.is_none() {
                        let injection = self.injection.clone();
                        self.render(injection);
                    }
                }
                message = next_message(&mut self.listener) => {
                    if let Some(message) = message {
                        self.on_message(message);
                    }
                }
                version = wait_handshake(self.handshake_deadline) => {
                    self.handshake_deadline = None;
                    if self.session.expire_timeout(version) == Transition::Ready {
                        self.emit_state();
                    }
                }
                _ = wait_until(self.validation_deadline) => {
                    self.validation_deadline = None;
                    let artifact = &self.artifact;
                    let report = self.engine.validator.validate(&artifact.content, artifact.kind);
                    self.emit(PreviewEvent::Validated(report));
                }
            }
        }

        self.teardown();
        tracing::info!(artifact = %self.artifact.id, "preview unmounted");
    }

    /// Content-driven pass: detection and the approval gate, then render.
    async fn refresh(&mut self) {
        self.teardown();

        let detected = detect(&self.engine.registry, &self.artifact.content);
        let resolution = self.engine.gatekeeper.clear(&detected).await;

        if resolution.pending.is_empty() {
            self.render(resolution.ready);
            return;
        }

        // Hold synthesis until the user decides. The version still moves on
        // so nothing from the previous document can land.
        self.injection = Injection::default();
        self.session.begin_version(&self.injection);
        self.emit_state();

        let request = ApprovalRequest::new(self.artifact.id.clone(), resolution.pending);
        tracing::info!(
            artifact = %self.artifact.id,
            request = %request.id,
            libraries = request.libraries.len(),
            "awaiting dependency approval"
        );
        self.pending = Some(request.clone());
        self.emit(PreviewEvent::ApprovalRequested(request));
    }

    async fn resolve_approval(&mut self, request_id: uuid::Uuid, decision: ApprovalDecision) {
        let Some(mut request) = self.pending.take_if(|r| r.id == request_id) else {
            tracing::debug!(
                artifact = %self.artifact.id,
                %request_id,
                "ignoring answer to superseded approval request"
            );
            return;
        };

        let injection = self.engine.gatekeeper.decide(&mut request, decision).await;
        self.render(injection);
    }

    /// Synthesize and mount a new document version.
    fn render(&mut self, injection: Injection) {
        self.teardown();

        let version = self.session.begin_version(&injection);
        self.injection = injection;
        let theme = self.theme.borrow_and_update().clone();

        let preview = match self
            .engine
            .synthesizer
            .synthesize(&self.artifact, &self.injection, &theme)
        {
            Ok(preview) => preview,
            Err(e) => {
                let message = e.to_string();
                let category = self.engine.classifier.categorize(&message);
                self.session.fail(version, message, category);
                self.emit_state();
                return;
            }
        };

        let sandboxed = preview.is_sandboxed();
        let host = self.engine.host.clone();
        match ListenerGuard::install(host, self.artifact.id.clone(), version, preview) {
            Ok(guard) => {
                self.listener = Some(guard);
                if sandboxed {
                    let deadline = Instant::now() + self.engine.config.ready_timeout();
                    self.handshake_deadline = Some((version, deadline));
                } else {
                    self.session.mark_ready(version);
                }
            }
            Err(e) => {
                tracing::warn!(artifact = %self.artifact.id, version, error = %e, "mount failed");
                self.session.fail(version, e.to_string(), ErrorCategory::Unknown);
            }
        }
        self.emit_state();
    }

    fn on_message(&mut self, message: ContextMessage) {
        let max_bytes = self.engine.config.max_message_bytes;
        let parsed = match UpwardMessage::parse(&message.raw, max_bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    artifact = %self.artifact.id,
                    version = message.version,
                    error = %e,
                    "dropping context message"
                );
                return;
            }
        };

        match self.session.apply(message.version, &parsed, &self.engine.classifier) {
            Transition::Ready | Transition::Errored => {
                self.handshake_deadline = None;
                self.emit_state();
            }
            Transition::Unchanged | Transition::Stale => {}
        }
    }

    /// Drop the current listener (unmounting its context) and cancel the
    /// handshake timeout.
    fn teardown(&mut self) {
        self.handshake_deadline = None;
        self.pending = None;
        self.listener = None;
    }

    fn schedule_validation(&mut self) {
        self.validation_deadline = Some(Instant::now() + self.engine.config.validation_debounce());
    }

    fn emit_state(&self) {
        self.emit(PreviewEvent::StateChanged(self.session.clone()));
    }

    fn emit(&self, event: PreviewEvent) {
        // The host may have stopped listening; the preview keeps running.
        let _ = self.events.send(event);
    }
}

async fn next_message(listener: &mut Option<ListenerGuard>) -> Option<ContextMessage> {
    match listener {
        Some(guard) => guard.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_handshake(deadline: Option<(u64, Instant)>) -> u64 {
    match deadline {
        Some((version, at)) => {
            tokio::time::sleep_until(at).await;
            version
        }
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
