//! Sandboxed execution boundary.
//!
//! The engine never executes artifact content itself. An [`ExecutionHost`]
//! (an isolated frame, a webview, a separate process) mounts each
//! synthesized document and relays whatever the context posts back through
//! a [`ContextPort`]. That port is the only channel from a context to the
//! host.
//!
//! Each mount is owned by a [`ListenerGuard`]. Dropping the guard closes
//! the port and unmounts the context, so a superseded document can never
//! deliver into the session that replaced it.

use crate::artifact::ArtifactId;
use crate::error::BoundaryError;
use crate::synth::Synthesized;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-mount message backlog. Messages beyond it are dropped.
const PORT_CAPACITY: usize = 64;

/// A raw upward message, tagged with the document version it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMessage {
    pub version: u64,
    pub raw: String,
}

/// Sending half handed to the execution host for one mount.
#[derive(Debug, Clone)]
pub struct ContextPort {
    artifact_id: ArtifactId,
    version: u64,
    tx: mpsc::Sender<ContextMessage>,
}

impl ContextPort {
    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Relay a message posted by the context. Returns false once the
    /// listener for this version has been torn down or is saturated.
    pub fn post(&self, raw: impl Into<String>) -> bool {
        let message = ContextMessage {
            version: self.version,
            raw: raw.into(),
        };
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    artifact = %self.artifact_id,
                    version = self.version,
                    "context message backlog full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Everything a host needs to display one document version.
#[derive(Debug, Clone)]
pub struct Mount {
    pub artifact_id: ArtifactId,
    pub version: u64,
    pub preview: Synthesized,
    pub port: ContextPort,
}

/// Provides isolated execution contexts.
pub trait ExecutionHost: Send + Sync {
    /// Display `mount.preview`. Sandboxed documents must be loaded into a
    /// fresh isolated context whose upward messages go to `mount.port`.
    fn mount(&self, mount: Mount) -> Result<(), BoundaryError>;

    /// Discard whatever was mounted for `version`.
    fn unmount(&self, artifact_id: &ArtifactId, version: u64);
}

/// Scoped ownership of one mounted context and its message listener.
pub struct ListenerGuard {
    host: Arc<dyn ExecutionHost>,
    artifact_id: ArtifactId,
    version: u64,
    rx: mpsc::Receiver<ContextMessage>,
    exhausted: bool,
}

impl ListenerGuard {
    /// Install a listener for `version` and mount `preview` against it.
    pub fn install(
        host: Arc<dyn ExecutionHost>,
        artifact_id: ArtifactId,
        version: u64,
        preview: Synthesized,
    ) -> Result<Self, BoundaryError> {
        let (tx, rx) = mpsc::channel(PORT_CAPACITY);
        let port = ContextPort {
            artifact_id: artifact_id.clone(),
            version,
            tx,
        };

        host.mount(Mount {
            artifact_id: artifact_id.clone(),
            version,
            preview,
            port,
        })?;
        tracing::debug!(artifact = %artifact_id, version, "context mounted");

        Ok(Self {
            host,
            artifact_id,
            version,
            rx,
            exhausted: false,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Next message from this version's context. Yields `None` once when
    /// the host has dropped every port clone, then never resolves again.
    pub async fn recv(&mut self) -> Option<ContextMessage> {
        if self.exhausted {
            return std::future::pending().await;
        }
        let message = self.rx.recv().await;
        if message.is_none() {
            self.exhausted = true;
        }
        message
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.rx.close();
        self.host.unmount(&self.artifact_id, self.version);
        tracing::debug!(artifact = %self.artifact_id, version = self.version, "context unmounted");
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingHost;
    use super::*;

    fn preview() -> Synthesized {
        Synthesized::Sandboxed {
            document: "<!DOCTYPE html>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_port_delivers_tagged_messages() {
        let host = Arc::new(RecordingHost::default());
        let id = ArtifactId::from("a");
        let mut guard = ListenerGuard::install(host.clone(), id, 3, preview()).unwrap();

        let port = host.port(3);
        assert!(port.post(r#"{"type":"artifact-ready"}"#));

        let message = guard.recv().await.unwrap();
        assert_eq!(message.version, 3);
        assert_eq!(message.raw, r#"{"type":"artifact-ready"}"#);
    }

    #[tokio::test]
    async fn test_drop_tears_down_listener_and_context() {
        let host = Arc::new(RecordingHost::default());
        let id = ArtifactId::from("a");
        let guard = ListenerGuard::install(host.clone(), id, 1, preview()).unwrap();
        let port = host.port(1);

        drop(guard);
        assert!(port.is_closed());
        assert!(!port.post(r#"{"type":"artifact-ready"}"#));
        assert_eq!(host.unmounted(), vec![1]);
    }

    #[tokio::test]
    async fn test_mount_failure_surfaces() {
        let host = Arc::new(RecordingHost::default());
        *host.fail_next.lock().unwrap() = true;
        let result = ListenerGuard::install(host.clone(), ArtifactId::from("a"), 1, preview());
        assert!(matches!(result, Err(BoundaryError::Mount { version: 1, .. })));
        // Nothing was mounted, so nothing is unmounted either.
        assert!(host.unmounted().is_empty());
    }

    #[tokio::test]
    async fn test_backlog_is_bounded() {
        let host = Arc::new(RecordingHost::default());
        let id = ArtifactId::from("a");
        let _guard = ListenerGuard::install(host.clone(), id, 1, preview()).unwrap();
        let port = host.port(1);

        let accepted = (0..PORT_CAPACITY + 10)
            .filter(|i| port.post(format!(r#"{{"type":"artifact-error","message":"{i}"}}"#)))
            .count();
        assert_eq!(accepted, PORT_CAPACITY);
    }
}
