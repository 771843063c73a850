//! Engine configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the preview engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Time a mounted context gets to report ready/error before it is
    /// assumed ready (default: 5000ms)
    pub ready_timeout_ms: u64,
    /// Quiet period after the last content change before validation runs
    /// (default: 300ms)
    pub validation_debounce_ms: u64,
    /// Largest upward message accepted from a context, in bytes (default: 64KB)
    pub max_message_bytes: usize,
    /// Pre-approved runtime tags every component document carries
    pub component_runtime: Vec<String>,
    /// Replacement registry table (None = built-in table)
    pub registry_path: Option<PathBuf>,
    /// Approval record file used by the CLI (None = in-memory, nothing persists)
    pub approvals_path: Option<PathBuf>,
    /// viewBox given to vector images that declare no size of their own
    pub default_viewbox: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: 5_000,
            validation_debounce_ms: 300,
            max_message_bytes: crate::protocol::DEFAULT_MAX_MESSAGE_BYTES,
            component_runtime: default_component_runtime(),
            registry_path: None,
            approvals_path: None,
            default_viewbox: String::from("0 0 800 600"),
        }
    }
}

impl PreviewConfig {
    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config '{}'", path.display()))
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn validation_debounce(&self) -> Duration {
        Duration::from_millis(self.validation_debounce_ms)
    }
}

fn default_component_runtime() -> Vec<String> {
    [
        concat!(
            r#"<script crossorigin "#,
            r#"src="https://unpkg.com/react@18.2.0/umd/react.production.min.js"></script>"#,
        ),
        concat!(
            r#"<script crossorigin "#,
            r#"src="https://unpkg.com/react-dom@18.2.0/umd/react-dom.production.min.js"></script>"#,
        ),
        r#"<script src="https://unpkg.com/@babel/standalone@7.23.5/babel.min.js"></script>"#,
        r#"<script src="https://cdn.tailwindcss.com/3.4.1"></script>"#,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Globals the component runtime defines.
pub const COMPONENT_RUNTIME_GLOBALS: &[&str] = &["React", "ReactDOM", "Babel", "tailwind"];
