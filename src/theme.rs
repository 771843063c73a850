//! Theme snapshot and synchronizer.
//!
//! A synthesized document is a static snapshot of the host theme. There is
//! no live theme channel into a running context; a theme change forces a
//! fresh synthesis and remount instead.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

/// Host theme values read once per synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSnapshot {
    pub mode: ThemeMode,
    pub background: String,
    pub foreground: String,
    pub muted: String,
    pub accent: String,
    pub font_family: String,
}

impl ThemeSnapshot {
    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            background: "#ffffff".to_string(),
            foreground: "#1f2328".to_string(),
            muted: "#f6f8fa".to_string(),
            accent: "#0969da".to_string(),
            font_family: "system-ui, -apple-system, 'Segoe UI', sans-serif".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            background: "#0d1117".to_string(),
            foreground: "#e6edf3".to_string(),
            muted: "#161b22".to_string(),
            accent: "#4493f8".to_string(),
            font_family: "system-ui, -apple-system, 'Segoe UI', sans-serif".to_string(),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }

    /// Base styling layer for a document shell.
    pub fn base_style(&self) -> String {
        let scheme = match self.mode {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        };
        format!(
            r#"<style>
:root {{
  color-scheme: {scheme};
  --artifact-bg: {bg};
  --artifact-fg: {fg};
  --artifact-muted: {muted};
  --artifact-accent: {accent};
}}
html, body {{
  margin: 0;
  padding: 0;
  background: var(--artifact-bg);
  color: var(--artifact-fg);
  font-family: {font};
}}
body {{ padding: 1rem; box-sizing: border-box; }}
a {{ color: var(--artifact-accent); }}
pre, code {{
  background: var(--artifact-muted);
  font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
}}
pre {{ padding: 0.75rem; border-radius: 6px; overflow: auto; }}
</style>"#,
            scheme = scheme,
            bg = self.background,
            fg = self.foreground,
            muted = self.muted,
            accent = self.accent,
            font = self.font_family,
        )
    }
}

impl Default for ThemeSnapshot {
    fn default() -> Self {
        Self::light()
    }
}

/// Watches a coarse host-side theme signal and publishes snapshots.
///
/// Controllers subscribe and resynthesize on every published change.
#[derive(Debug)]
pub struct ThemeSynchronizer {
    tx: watch::Sender<ThemeSnapshot>,
}

impl ThemeSynchronizer {
    pub fn new(initial: ThemeSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ThemeSnapshot {
        self.tx.borrow().clone()
    }

    /// Feed the host root's class attribute. A `dark` class token selects
    /// the dark theme. Returns true if subscribers were notified.
    pub fn observe_class_list(&self, class_attr: &str) -> bool {
        let mode = if class_attr.split_whitespace().any(|c| c == "dark") {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        };
        self.set_mode(mode)
    }

    pub fn set_mode(&self, mode: ThemeMode) -> bool {
        self.set(ThemeSnapshot::for_mode(mode))
    }

    /// Publish `snapshot` if it differs from the current one.
    pub fn set(&self, snapshot: ThemeSnapshot) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        if changed {
            tracing::debug!(mode = ?self.tx.borrow().mode, "host theme changed");
        }
        changed
    }
}

impl Default for ThemeSynchronizer {
    fn default() -> Self {
        Self::new(ThemeSnapshot::default())
    }
}
