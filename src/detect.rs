//! Dependency detection - static inference of optional libraries from raw
//! content. Nothing here executes or fetches anything.
//!
//! Detection is best-effort. A comment mentioning `new Chart(` is a false
//! positive, an aliased import is a false negative. The approval gate, not
//! this module, is the trust boundary.

use crate::registry::ResourceRegistry;
use serde::{Deserialize, Serialize};

/// A library referenced by content but not yet included by it.
///
/// Multi-tag libraries (stylesheet + script) produce one entry per tag so
/// each resource is reported and approved on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLibrary {
    pub name: String,
    pub resource_url: String,
    pub purpose: String,
    pub provider: String,
    /// Inclusion markup to inject once approved.
    pub tag: String,
}

/// Scan `content` against every registry entry.
pub fn detect(registry: &ResourceRegistry, content: &str) -> Vec<DetectedLibrary> {
    let mut detected = Vec::new();

    for library in registry.libraries() {
        if !library.detection.is_match(content) || library.is_included_in(content) {
            continue;
        }

        for tag in &library.inclusion_tags {
            detected.push(DetectedLibrary {
                name: library.name.clone(),
                resource_url: tag.resource_url.to_string(),
                purpose: library.purpose.clone(),
                provider: library.provider.clone(),
                tag: tag.markup.clone(),
            });
        }
    }

    if !detected.is_empty() {
        tracing::debug!(
            count = detected.len(),
            libraries = ?detected.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            "detected optional dependencies"
        );
    }

    detected
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_TAG: &str = concat!(
        r#"<script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js">"#,
        "</script>",
    );
    const LEAFLET_CSS: &str =
        r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />"#;
    const LEAFLET_JS: &str =
        r#"<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>"#;

    #[test]
    fn test_detects_chart_usage() {
        let registry = ResourceRegistry::builtin().unwrap();
        let content = "<canvas id=c></canvas><script>new Chart(ctx, {type: 'bar'})</script>";

        let detected = detect(&registry, content);
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].name, "chart.js");
        assert_eq!(detected[0].tag, CHART_TAG);
        assert_eq!(
            detected[0].resource_url,
            "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js"
        );
    }

    #[test]
    fn test_skips_already_included_library() {
        let registry = ResourceRegistry::builtin().unwrap();
        let content = format!("{CHART_TAG}<script>new Chart(ctx, {{}})</script>");
        assert!(detect(&registry, &content).is_empty());
    }

    #[test]
    fn test_multi_tag_library_splits_and_is_idempotent() {
        let registry = ResourceRegistry::builtin().unwrap();
        let usage = "<div id=m></div><script>L.map('m').setView([0, 0], 2)</script>";

        let detected = detect(&registry, usage);
        assert_eq!(detected.len(), 2);
        assert!(detected.iter().all(|d| d.name == "leaflet"));
        assert_ne!(detected[0].resource_url, detected[1].resource_url);

        // Any one of the tags being present counts as included.
        for present in [vec![LEAFLET_CSS], vec![LEAFLET_JS], vec![LEAFLET_CSS, LEAFLET_JS]] {
            let content = format!("{}{}", present.join(""), usage);
            assert!(detect(&registry, &content).is_empty(), "present: {:?}", present);
        }
    }

    #[test]
    fn test_plain_content_detects_nothing() {
        let registry = ResourceRegistry::builtin().unwrap();
        assert!(detect(&registry, "<h1>Hello</h1><script>console.log(1)</script>").is_empty());
    }

    #[test]
    fn test_detection_is_pure() {
        let registry = ResourceRegistry::builtin().unwrap();
        let content = "const scene = new THREE.Scene(); gsap.to('.box', {x: 10});";
        assert_eq!(detect(&registry, content), detect(&registry, content));
        assert_eq!(detect(&registry, content).len(), 2);
    }
}
