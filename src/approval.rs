//! Approval gatekeeper - the engine's trust boundary.
//!
//! No network resource tag reaches a synthesized document unless the content
//! already carried it, the user approved it for this pass, or a standing
//! per-user approval record covers it.
//!
//! An unreadable record is treated as no record: the user is asked again and
//! nothing is injected.

use crate::artifact::ArtifactId;
use crate::detect::DetectedLibrary;
use crate::error::ApprovalStoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Persisted per-user trust decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    #[serde(rename = "autoApproveLibraries", default)]
    pub auto_approve_all: bool,
    #[serde(rename = "approvedLibraries", default)]
    pub approved_resource_urls: BTreeSet<String>,
}

impl ApprovalRecord {
    pub fn covers(&self, detected: &[DetectedLibrary]) -> bool {
        self.auto_approve_all
            || detected
                .iter()
                .all(|lib| self.approved_resource_urls.contains(&lib.resource_url))
    }
}

/// External store for approval records, keyed by user identity.
///
/// `write` is an upsert of the whole record. Callers only ever grow the
/// approved set.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn read(&self, user: &str) -> Result<Option<ApprovalRecord>, ApprovalStoreError>;
    async fn write(&self, user: &str, record: &ApprovalRecord) -> Result<(), ApprovalStoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryApprovalStore {
    records: Mutex<HashMap<String, ApprovalRecord>>,
}

impl MemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn read(&self, user: &str) -> Result<Option<ApprovalRecord>, ApprovalStoreError> {
        Ok(self.records.lock().await.get(user).cloned())
    }

    async fn write(&self, user: &str, record: &ApprovalRecord) -> Result<(), ApprovalStoreError> {
        self.records
            .lock()
            .await
            .insert(user.to_string(), record.clone());
        Ok(())
    }
}

/// JSON file holding every user's record, used by the CLI.
#[derive(Debug, Clone)]
pub struct FileApprovalStore {
    path: PathBuf,
}

impl FileApprovalStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, ApprovalRecord>, ApprovalStoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(ApprovalStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ApprovalStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `bytes` to a sibling temp file, sync it, then rename it over the
    /// record file. A crash leaves either the old file or the new one.
    async fn replace(&self, bytes: &[u8]) -> std::io::Result<()> {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("approvals"));
        let tmp = self.path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));

        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }
}

#[async_trait]
impl ApprovalStore for FileApprovalStore {
    async fn read(&self, user: &str) -> Result<Option<ApprovalRecord>, ApprovalStoreError> {
        Ok(self.read_all().await?.remove(user))
    }

    async fn write(&self, user: &str, record: &ApprovalRecord) -> Result<(), ApprovalStoreError> {
        let mut all = self.read_all().await?;
        all.insert(user.to_string(), record.clone());

        let json = serde_json::to_string_pretty(&all).map_err(|source| ApprovalStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        if let Err(source) = self.replace(json.as_bytes()).await {
            return Err(ApprovalStoreError::Io {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

/// Ordered, de-duplicated inclusion markup cleared for injection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Injection {
    tags: Vec<String>,
    resource_urls: BTreeSet<String>,
}

impl Injection {
    pub fn from_libraries(libraries: &[DetectedLibrary]) -> Self {
        let mut injection = Self::default();
        for lib in libraries {
            if !injection.tags.contains(&lib.tag) {
                injection.tags.push(lib.tag.clone());
            }
            injection.resource_urls.insert(lib.resource_url.clone());
        }
        injection
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn resource_urls(&self) -> &BTreeSet<String> {
        &self.resource_urls
    }

    /// Markup ready to embed in a document head.
    pub fn render(&self) -> String {
        self.tags.join("\n")
    }
}

/// Outcome of consulting the approval record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub ready: Injection,
    pub pending: Vec<DetectedLibrary>,
}

/// Pure gate decision for `detected` against an optional record.
///
/// A missing record is treated exactly like an empty one.
pub fn resolve(detected: &[DetectedLibrary], record: Option<&ApprovalRecord>) -> Resolution {
    if detected.is_empty() {
        return Resolution::default();
    }

    match record {
        Some(record) if record.covers(detected) => Resolution {
            ready: Injection::from_libraries(detected),
            pending: Vec::new(),
        },
        _ => Resolution {
            ready: Injection::default(),
            pending: detected.to_vec(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Approved,
    Denied,
}

/// The user's answer to an [`ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve { remember: bool },
    Deny,
}

/// Consent prompt surfaced to the host UI while synthesis is held back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: uuid::Uuid,
    pub artifact_id: ArtifactId,
    pub libraries: Vec<DetectedLibrary>,
    pub resolution: RequestState,
}

impl ApprovalRequest {
    pub fn new(artifact_id: ArtifactId, libraries: Vec<DetectedLibrary>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            artifact_id,
            libraries,
            resolution: RequestState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.resolution == RequestState::Pending
    }
}

/// Applies the approval record for one user. Shared by every artifact that
/// user has on screen.
pub struct Gatekeeper {
    store: Arc<dyn ApprovalStore>,
    user: String,
    // Serializes read-modify-write of the record across concurrent approvals.
    write_lock: Mutex<()>,
}

impl Gatekeeper {
    pub fn new(store: Arc<dyn ApprovalStore>, user: impl Into<String>) -> Self {
        Self {
            store,
            user: user.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    async fn load_record(&self) -> Option<ApprovalRecord> {
        match self.store.read(&self.user).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    user = %self.user,
                    error = %e,
                    "approval record unreadable, asking instead"
                );
                None
            }
        }
    }

    /// Decide which detected libraries may be injected right away.
    pub async fn clear(&self, detected: &[DetectedLibrary]) -> Resolution {
        if detected.is_empty() {
            return Resolution::default();
        }

        let record = self.load_record().await;
        let resolution = resolve(detected, record.as_ref());
        tracing::debug!(
            user = %self.user,
            ready = resolution.ready.tags().len(),
            pending = resolution.pending.len(),
            "approval gate resolved"
        );
        resolution
    }

    /// Resolve a pending request. Returns what may be injected for this pass.
    pub async fn decide(
        &self,
        request: &mut ApprovalRequest,
        decision: ApprovalDecision,
    ) -> Injection {
        match decision {
            ApprovalDecision::Deny => {
                request.resolution = RequestState::Denied;
                tracing::info!(artifact = %request.artifact_id, "dependency approval denied");
                Injection::default()
            }
            ApprovalDecision::Approve { remember } => {
                request.resolution = RequestState::Approved;
                if remember {
                    let urls = request.libraries.iter().map(|lib| lib.resource_url.clone());
                    self.remember(urls).await;
                }
                tracing::info!(
                    artifact = %request.artifact_id,
                    remember,
                    count = request.libraries.len(),
                    "dependency approval granted"
                );
                Injection::from_libraries(&request.libraries)
            }
        }
    }

    /// Union `urls` into the stored record.
    pub async fn remember(&self, urls: impl IntoIterator<Item = String>) {
        let _guard = self.write_lock.lock().await;

        let mut record = match self.store.read(&self.user).await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                // Writing over an unreadable record could drop earlier approvals.
                tracing::warn!(
                    user = %self.user,
                    error = %e,
                    "approval record unreadable, not remembering"
                );
                return;
            }
        };
        record.approved_resource_urls.extend(urls);

        if let Err(e) = self.store.write(&self.user, &record).await {
            tracing::warn!(user = %self.user, error = %e, "failed to persist approval record");
        }
    }
}
