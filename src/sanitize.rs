//! Sanitize untrusted input before it touches the host.
//!
//! Two entry points:
//! - [`sanitize_markup`] reduces markup that is inserted into the host
//!   document directly (rendered diagrams, rendered markdown) to an
//!   allow-list of inert HTML and SVG. Nothing in such markup may execute.
//! - [`check_depth`] bounds the nesting of JSON arriving over the upward
//!   message channel before it is deserialized.
//!
//! The markup is parsed the way a browser parses it, so entity-encoded
//! schemes and `/`-separated attributes are seen exactly as the host would
//! see them. Anything not on the allow-list is dropped: scripts, frames,
//! `<base>`, SVG animation elements, every `on*` handler, and any URL
//! attribute whose scheme is not a plain link scheme.

use crate::error::ProtocolError;
use once_cell::sync::Lazy;
use serde_json::Value;

/// Maximum nesting depth accepted in an upward message.
pub const MAX_DEPTH: usize = 8;

/// SVG structure and paint elements. Animation (`set`, `animate*`),
/// `use`, `image` and `script` are deliberately absent.
const SVG_TAGS: &[&str] = &[
    "svg",
    "g",
    "defs",
    "symbol",
    "title",
    "desc",
    "style",
    "path",
    "rect",
    "circle",
    "ellipse",
    "line",
    "polyline",
    "polygon",
    "text",
    "tspan",
    "marker",
    "linearGradient",
    "radialGradient",
    "stop",
    "clipPath",
    "mask",
    "pattern",
    "foreignObject",
];

/// Presentation and geometry attributes, allowed on every element.
const SVG_ATTRIBUTES: &[&str] = &[
    "class",
    "id",
    "style",
    "role",
    "aria-label",
    "aria-roledescription",
    "xmlns",
    "viewBox",
    "preserveAspectRatio",
    "width",
    "height",
    "x",
    "y",
    "x1",
    "y1",
    "x2",
    "y2",
    "cx",
    "cy",
    "r",
    "rx",
    "ry",
    "dx",
    "dy",
    "d",
    "points",
    "transform",
    "opacity",
    "fill",
    "fill-opacity",
    "fill-rule",
    "stroke",
    "stroke-width",
    "stroke-dasharray",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-opacity",
    "font-family",
    "font-size",
    "font-weight",
    "text-anchor",
    "dominant-baseline",
    "alignment-baseline",
    "offset",
    "stop-color",
    "stop-opacity",
    "marker-start",
    "marker-mid",
    "marker-end",
    "markerWidth",
    "markerHeight",
    "markerUnits",
    "refX",
    "refY",
    "orient",
    "gradientUnits",
    "gradientTransform",
    "patternUnits",
    "clip-path",
    "mask",
];

static SANITIZER: Lazy<ammonia::Builder<'static>> = Lazy::new(|| {
    let mut builder = ammonia::Builder::default();
    builder
        .add_tags(SVG_TAGS.iter().copied())
        .add_tags(["input"])
        .add_generic_attributes(SVG_ATTRIBUTES.iter().copied())
        // Task list checkboxes from rendered markdown.
        .add_tag_attributes("input", ["type", "checked", "disabled"])
        // Diagram styling lives in an embedded <style>; CSS is kept, its
        // content is never executed.
        .rm_clean_content_tags(["style"]);
    builder
});

/// Reduce `markup` to the inert allow-list.
pub fn sanitize_markup(markup: &str) -> String {
    let clean = SANITIZER.clean(markup).to_string();
    tracing::debug!(
        input_bytes = markup.len(),
        output_bytes = clean.len(),
        "sanitized host markup"
    );
    clean
}

/// Reject JSON nested deeper than [`MAX_DEPTH`].
pub fn check_depth(value: &Value) -> Result<(), ProtocolError> {
    check_depth_recursive(value, 0)
}

fn check_depth_recursive(value: &Value, depth: usize) -> Result<(), ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::TooDeep(MAX_DEPTH));
    }

    match value {
        Value::Object(map) => map
            .values()
            .try_for_each(|v| check_depth_recursive(v, depth + 1)),
        Value::Array(arr) => arr
            .iter()
            .try_for_each(|v| check_depth_recursive(v, depth + 1)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diagram_structure_survives() {
        let svg = concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">"#,
            r#"<style>.node { fill: red; }</style>"#,
            r#"<defs><marker id="arrow" refX="5" refY="5"><path d="M0 0L10 5"/></marker></defs>"#,
            r#"<rect class="node" width="5" height="5" fill="red"/>"#,
            r#"<path d="M0 0L9 9" marker-end="url(#arrow)"/>"#,
            r#"<text x="1" y="2">label</text></svg>"#,
        );
        let clean = sanitize_markup(svg);
        assert!(clean.contains(r#"viewBox="0 0 10 10""#));
        assert!(clean.contains("<style>"));
        assert!(clean.contains(r#"refX="5""#));
        assert!(clean.contains(r#"marker-end="url(#arrow)""#));
        assert!(clean.contains(r#"width="5""#));
        assert!(clean.contains(">label</text>"));
    }

    #[test]
    fn test_strips_script_elements() {
        let svg = concat!(
            r#"<svg><script type="text/javascript">alert(1)</script>"#,
            r#"<g></g><SCRIPT>x()</SCRIPT></svg>"#,
        );
        let clean = sanitize_markup(svg);
        assert!(!clean.to_lowercase().contains("<script"));
        assert!(!clean.contains("alert"));
        assert!(clean.contains("<g>"));
    }

    #[test]
    fn test_strips_unterminated_script() {
        let clean = sanitize_markup("<svg><script src=x.js><g/></svg>");
        assert!(!clean.to_lowercase().contains("<script"));
        assert!(!clean.contains("x.js"));
    }

    #[test]
    fn test_strips_event_handlers() {
        let svg = r#"<svg onload="steal()"><text onclick='x()'>hi</text></svg>"#;
        let clean = sanitize_markup(svg);
        assert!(!clean.contains("onload"));
        assert!(!clean.contains("onclick"));
        assert!(clean.contains(">hi</text>"));
    }

    #[test]
    fn test_slash_separated_handler() {
        let clean = sanitize_markup("<svg/onload=alert(1)>");
        assert!(!clean.contains("onload"));
        assert!(!clean.contains("alert"));
    }

    #[test]
    fn test_entity_encoded_script_scheme() {
        let html = r#"click <a href="&#106;avascript:alert(document.cookie)">here</a>"#;
        let clean = sanitize_markup(html);
        assert!(!clean.contains("avascript"));
        assert!(!clean.contains("&#106;"));
        assert!(clean.contains(">here</a>"));

        let html = r#"<a href="java&#x09;script:alert(1)">x</a>"#;
        assert!(!sanitize_markup(html).contains("script:"));
    }

    #[test]
    fn test_xlink_script_url() {
        let svg = r#"<svg><a xlink:href="javascript:alert(1)"><text>hi</text></a></svg>"#;
        let clean = sanitize_markup(svg);
        assert!(!clean.contains("javascript"));
        assert!(clean.contains(">hi</text>"));
    }

    #[test]
    fn test_form_action_attributes() {
        let html = concat!(
            r#"<form action="javascript:alert(1)">"#,
            r#"<button formaction="javascript:alert(2)">go</button></form>"#,
        );
        let clean = sanitize_markup(html);
        assert!(!clean.contains("formaction"));
        assert!(!clean.contains("javascript"));
    }

    #[test]
    fn test_svg_animation_cannot_set_urls() {
        let svg = concat!(
            r#"<svg><a><set attributeName="href" to="javascript:alert(1)"/>"#,
            r#"<animate attributeName="href" values="javascript:alert(2)"/>"#,
            r#"<text>x</text></a></svg>"#,
        );
        let clean = sanitize_markup(svg);
        assert!(!clean.contains("<set"));
        assert!(!clean.contains("<animate"));
        assert!(!clean.contains("javascript"));
    }

    #[test]
    fn test_strips_base_and_embedded_frames() {
        let html = concat!(
            r#"<base href="https://evil.example/"><p>a</p>"#,
            r#"<iframe src="https://evil.example"></iframe><object data="x"></object>"#,
            r#"<embed src="x.swf"><p>b</p>"#,
        );
        let clean = sanitize_markup(html);
        assert!(!clean.contains("<base"));
        assert!(!clean.contains("evil.example"));
        assert!(!clean.contains("<iframe"));
        assert!(!clean.contains("<object"));
        assert!(!clean.contains("<embed"));
        assert!(clean.contains("<p>a</p>"));
        assert!(clean.contains("<p>b</p>"));
    }

    #[test]
    fn test_plain_links_kept() {
        let clean = sanitize_markup(r#"<a href="https://example.com/docs">docs</a>"#);
        assert!(clean.contains(r#"href="https://example.com/docs""#));
    }

    #[test]
    fn test_depth_within_limit() {
        assert!(check_depth(&json!({"type": "artifact-error", "message": "x"})).is_ok());
    }

    #[test]
    fn test_depth_limit() {
        let mut value = json!({"leaf": true});
        for _ in 0..12 {
            value = json!({"nested": value});
        }
        let err = check_depth(&value).unwrap_err();
        assert!(err.to_string().contains("too deep"));

        let mut arr = json!([1]);
        for _ in 0..12 {
            arr = json!([arr]);
        }
        assert!(check_depth(&arr).is_err());
    }
}
