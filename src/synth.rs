//! Document synthesizer.
//!
//! Builds one self-contained, previewable result per artifact from its
//! content, the injection set cleared by the approval gate, and a theme
//! snapshot. Synthesis is a pure function of those inputs plus the diagram
//! collaborator's output.
//!
//! - Code / Markup / Component run in an isolated context and carry the
//!   instrumentation block that reports errors and readiness upward.
//! - Diagram / Markdown render to sanitized markup inserted host-side.
//! - VectorImage becomes a data URI; RasterImage is passed through.

use crate::approval::Injection;
use crate::artifact::{Artifact, ArtifactKind};
use crate::error::SynthesisError;
use crate::sanitize::sanitize_markup;
use crate::theme::ThemeSnapshot;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const INSTRUMENTATION: &str = include_str!("instrumentation.js");
const COMPONENT_BOOTSTRAP: &str = include_str!("component_bootstrap.js");
const COMPONENT_PLACEHOLDER: &str = "__ARTIFACT_COMPONENT__";
const ANONYMOUS_COMPONENT: &str = "ArtifactComponent";

/// Element id the component bootstrap mounts into.
pub const COMPONENT_ANCHOR: &str = "artifact-root";

static DOCTYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<!doctype\s+html").unwrap());
static HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head\b[^>]*>").unwrap());
static HTML_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html\b[^>]*>").unwrap());
static SCRIPT_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</script").unwrap());
static SVG_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<svg\b[^>]*>").unwrap());
static SVG_SIZING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s(?:viewbox|width|height)\s*="#).unwrap());
static SVG_XMLNS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\sxmlns\s*="#).unwrap());

static REACT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?m)^[ \t]*import\s+(.+?)\s+from\s+"#,
        r#"['"](react|react-dom|react-dom/client)['"][ \t]*;?[ \t]*$"#,
    ))
    .unwrap()
});
static SIDE_EFFECT_REACT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?m)^[ \t]*import\s+"#,
        r#"['"](react|react-dom|react-dom/client)['"][ \t]*;?[ \t]*$"#,
    ))
    .unwrap()
});
static DEFAULT_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^([ \t]*)export\s+default\s+",
        r"((?:async\s+)?(?:function\s*\*?|class)\s+([A-Za-z_$][\w$]*))",
    ))
    .unwrap()
});
static DEFAULT_IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*export\s+default\s+([A-Za-z_$][\w$]*)[ \t]*;?[ \t]*$").unwrap()
});
static DEFAULT_EXPR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)export\s+default\s+").unwrap());
static NAMED_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+((?:async\s+)?(?:const|let|var|function|class)\b)").unwrap()
});
static FALLBACK_APP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:function|const|let|class)\s+App\b").unwrap());

/// Renders diagram notation into vector markup.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, source: &str) -> anyhow::Result<String>;
}

impl<F> DiagramRenderer for F
where
    F: Fn(&str) -> anyhow::Result<String> + Send + Sync,
{
    fn render(&self, source: &str) -> anyhow::Result<String> {
        self(source)
    }
}

/// A synthesized preview, tagged by how the host must display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesized {
    /// Complete document for an isolated execution context.
    Sandboxed { document: String },
    /// Sanitized markup inserted into the host tree. Nothing executes.
    HostMarkup { markup: String },
    /// Displayable resource (encoded vector image).
    DataUri { uri: String },
    /// Content that is already a displayable reference.
    Passthrough { reference: String },
}

impl Synthesized {
    pub fn is_sandboxed(&self) -> bool {
        matches!(self, Self::Sandboxed { .. })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Sandboxed { document } => document,
            Self::HostMarkup { markup } => markup,
            Self::DataUri { uri } => uri,
            Self::Passthrough { reference } => reference,
        }
    }
}

pub struct DocumentSynthesizer {
    diagram: Arc<dyn DiagramRenderer>,
    component_runtime: Vec<String>,
    default_viewbox: String,
}

impl DocumentSynthesizer {
    pub fn new(
        diagram: Arc<dyn DiagramRenderer>,
        component_runtime: Vec<String>,
        default_viewbox: impl Into<String>,
    ) -> Self {
        Self {
            diagram,
            component_runtime,
            default_viewbox: default_viewbox.into(),
        }
    }

    pub fn synthesize(
        &self,
        artifact: &Artifact,
        injection: &Injection,
        theme: &ThemeSnapshot,
    ) -> Result<Synthesized, SynthesisError> {
        let synthesized = match artifact.kind {
            ArtifactKind::Code => Synthesized::Sandboxed {
                document: self.code_document(artifact, injection, theme),
            },
            ArtifactKind::Markup => Synthesized::Sandboxed {
                document: self.markup_document(artifact, &artifact.content, injection, theme),
            },
            ArtifactKind::Component => Synthesized::Sandboxed {
                document: self.component_document(artifact, injection, theme),
            },
            ArtifactKind::Diagram => {
                let svg = self
                    .diagram
                    .render(&artifact.content)
                    .map_err(|e| SynthesisError::Diagram(e.to_string()))?;
                Synthesized::HostMarkup {
                    markup: sanitize_markup(&svg),
                }
            }
            ArtifactKind::Markdown => Synthesized::HostMarkup {
                markup: render_markdown(&artifact.content),
            },
            ArtifactKind::VectorImage => Synthesized::DataUri {
                uri: self.vector_data_uri(&artifact.content),
            },
            ArtifactKind::RasterImage => Synthesized::Passthrough {
                reference: artifact.content.trim().to_string(),
            },
        };

        tracing::debug!(
            artifact = %artifact.id,
            kind = %artifact.kind,
            injected = injection.tags().len(),
            bytes = synthesized.as_str().len(),
            "synthesized preview"
        );
        Ok(synthesized)
    }

    fn code_document(
        &self,
        artifact: &Artifact,
        injection: &Injection,
        theme: &ThemeSnapshot,
    ) -> String {
        let language = artifact
            .language
            .as_deref()
            .map(|l| l.trim().to_ascii_lowercase());

        match language.as_deref() {
            None | Some("html") | Some("htm") | Some("xhtml") => {
                self.markup_document(artifact, &artifact.content, injection, theme)
            }
            Some("javascript") | Some("js") | Some("mjs") => {
                let body = format!("<script>\n{}\n</script>", escape_script(&artifact.content));
                shell(&artifact.title, theme, injection, &[], &body)
            }
            Some(other) => {
                let body = format!(
                    r#"<pre><code class="language-{}">{}</code></pre>"#,
                    escape_html(other),
                    escape_html(&artifact.content)
                );
                shell(&artifact.title, theme, injection, &[], &body)
            }
        }
    }

    fn markup_document(
        &self,
        artifact: &Artifact,
        content: &str,
        injection: &Injection,
        theme: &ThemeSnapshot,
    ) -> String {
        if DOCTYPE.is_match(content) {
            splice_into_document(content, injection)
        } else {
            shell(&artifact.title, theme, injection, &[], content)
        }
    }

    fn component_document(
        &self,
        artifact: &Artifact,
        injection: &Injection,
        theme: &ThemeSnapshot,
    ) -> String {
        let (source, component) = prepare_component(&artifact.content);
        let mount = COMPONENT_BOOTSTRAP.replace(COMPONENT_PLACEHOLDER, &component);
        let body = format!(
            concat!(
                "<div id=\"{anchor}\"></div>\n",
                "<script type=\"text/babel\" data-presets=\"react\">\n{source}\n{mount}</script>",
            ),
            anchor = COMPONENT_ANCHOR,
            source = escape_script(&source),
            mount = mount,
        );
        shell(&artifact.title, theme, injection, &self.component_runtime, &body)
    }

    fn vector_data_uri(&self, content: &str) -> String {
        let svg = ensure_svg_sizing(content, &self.default_viewbox);
        format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
        )
    }
}

/// Minimal document shell: theme layer, instrumentation, runtime, injection.
fn shell(
    title: &str,
    theme: &ThemeSnapshot,
    injection: &Injection,
    runtime: &[String],
    body: &str,
) -> String {
    let mut head = String::new();
    head.push_str(&theme.base_style());
    head.push('\n');
    head.push_str(&instrumentation_block());
    for tag in runtime {
        head.push('\n');
        head.push_str(tag);
    }
    if !injection.is_empty() {
        head.push('\n');
        head.push_str(&injection.render());
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n{head}\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
        head = head,
        body = body,
    )
}

fn instrumentation_block() -> String {
    format!("<script>\n{}</script>", INSTRUMENTATION)
}

/// Keep a complete document verbatim, adding only instrumentation and the
/// approved injection right after its head opens.
fn splice_into_document(document: &str, injection: &Injection) -> String {
    let mut block = instrumentation_block();
    if !injection.is_empty() {
        block.push('\n');
        block.push_str(&injection.render());
    }

    if let Some(head) = HEAD_OPEN.find(document) {
        let mut out = String::with_capacity(document.len() + block.len() + 2);
        out.push_str(&document[..head.end()]);
        out.push('\n');
        out.push_str(&block);
        out.push_str(&document[head.end()..]);
        out
    } else if let Some(html) = HTML_OPEN.find(document) {
        format!(
            "{}\n<head>\n{}\n</head>{}",
            &document[..html.end()],
            block,
            &document[html.end()..]
        )
    } else {
        format!("{}\n{}", block, document)
    }
}

/// Rewrite component source for a global-runtime, non-module script and
/// return it with the name of the component to mount.
fn prepare_component(content: &str) -> (String, String) {
    let source = SIDE_EFFECT_REACT_IMPORT.replace_all(content, "");
    let source = REACT_IMPORT
        .replace_all(&source, |caps: &regex::Captures<'_>| {
            let global = if &caps[2] == "react" { "React" } else { "ReactDOM" };
            import_bindings(&caps[1], global)
        })
        .into_owned();
    let source = NAMED_EXPORT.replace_all(&source, "${1}${2}").into_owned();

    if let Some(caps) = DEFAULT_DECL.captures(&source) {
        let name = caps[3].to_string();
        let source = DEFAULT_DECL.replace(&source, "${1}${2}").into_owned();
        return (source, name);
    }
    if let Some(caps) = DEFAULT_IDENT.captures(&source) {
        let name = caps[1].to_string();
        let source = DEFAULT_IDENT.replace(&source, "").into_owned();
        return (source, name);
    }
    if DEFAULT_EXPR.is_match(&source) {
        let replacement = format!("${{1}}const {} = ", ANONYMOUS_COMPONENT);
        let source = DEFAULT_EXPR.replace(&source, replacement.as_str()).into_owned();
        return (source, ANONYMOUS_COMPONENT.to_string());
    }

    let name = if FALLBACK_APP.is_match(&source) {
        "App"
    } else {
        ANONYMOUS_COMPONENT
    };
    (source, name.to_string())
}

/// Turn an import clause into bindings against a runtime global.
fn import_bindings(clause: &str, global: &str) -> String {
    let mut out = Vec::new();
    let clause = clause.trim();

    let (default_part, named_part) = match clause.find('{') {
        Some(start) => {
            let end = clause.rfind('}').unwrap_or(clause.len());
            let inner = clause.get(start + 1..end).unwrap_or("");
            (clause[..start].trim().trim_end_matches(',').trim(), Some(inner))
        }
        None => (clause, None),
    };

    for part in default_part.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let name = part.strip_prefix("* as ").map(str::trim).unwrap_or(part);
        if name != global {
            out.push(format!("const {} = {};", name, global));
        }
    }

    if let Some(named) = named_part {
        let fields: Vec<String> = named
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| match f.split_once(" as ") {
                Some((orig, alias)) => format!("{}: {}", orig.trim(), alias.trim()),
                None => f.to_string(),
            })
            .collect();
        if !fields.is_empty() {
            out.push(format!("const {{ {} }} = {};", fields.join(", "), global));
        }
    }

    out.join(" ")
}

/// Add a default viewBox and size when the root element has no sizing of
/// its own, and the namespace a standalone image needs.
fn ensure_svg_sizing(content: &str, default_viewbox: &str) -> String {
    let Some(open) = SVG_OPEN.find(content) else {
        return content.to_string();
    };
    let tag = open.as_str();

    let mut extra = String::new();
    if !SVG_XMLNS.is_match(tag) {
        extra.push_str(r#" xmlns="http://www.w3.org/2000/svg""#);
    }
    if !SVG_SIZING.is_match(tag) {
        extra.push_str(&format!(
            r#" viewBox="{}" width="100%" height="100%""#,
            escape_html(default_viewbox)
        ));
    }
    if extra.is_empty() {
        return content.to_string();
    }

    // Insert right after "<svg".
    let insert_at = open.start() + 4;
    let mut out = String::with_capacity(content.len() + extra.len());
    out.push_str(&content[..insert_at]);
    out.push_str(&extra);
    out.push_str(&content[insert_at..]);
    out
}

fn render_markdown(content: &str) -> String {
    use pulldown_cmark::{Options, Parser};

    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(content, opts);

    let mut html = String::with_capacity(content.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    sanitize_markup(&html)
}

fn escape_script(source: &str) -> String {
    SCRIPT_CLOSE.replace_all(source, r"<\/script").into_owned()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{resolve, ApprovalRecord};
    use crate::detect::detect;
    use crate::registry::ResourceRegistry;
    use pretty_assertions::assert_eq;

    const CHART_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";
    const CHART_CONTENT: &str = concat!(
        "<canvas id=\"c\"></canvas>\n",
        "<script>new Chart(document.getElementById('c'), {type: 'bar'});</script>",
    );

    fn synthesizer() -> DocumentSynthesizer {
        let renderer = |source: &str| -> anyhow::Result<String> {
            if source.starts_with("graph") {
                Ok(format!(
                    r#"<svg onload="x()"><script>alert(1)</script><text>{}</text></svg>"#,
                    source
                ))
            } else {
                Err(anyhow::anyhow!("Parse error on line 1: unexpected '{}'", source))
            }
        };
        let runtime =
            r#"<script src="https://unpkg.com/react@18/umd/react.production.min.js"></script>"#;
        DocumentSynthesizer::new(Arc::new(renderer), vec![runtime.to_string()], "0 0 800 600")
    }

    fn artifact(kind: ArtifactKind, content: &str) -> Artifact {
        Artifact::new(kind, "Test <artifact>", content)
    }

    fn synthesize(
        kind: ArtifactKind,
        content: &str,
        theme: &ThemeSnapshot,
    ) -> Result<Synthesized, SynthesisError> {
        synthesizer().synthesize(&artifact(kind, content), &Injection::default(), theme)
    }

    #[test]
    fn test_markup_fragment_gets_shell() {
        let theme = ThemeSnapshot::dark();
        let result = synthesize(ArtifactKind::Markup, "<h1>Hi</h1>", &theme).unwrap();

        let Synthesized::Sandboxed { document } = result else {
            panic!("expected sandboxed document");
        };
        assert!(document.starts_with("<!DOCTYPE html>"));
        assert!(document.contains("<h1>Hi</h1>"));
        assert!(document.contains("color-scheme: dark"));
        assert!(document.contains("artifact-ready"));
        assert!(document.contains("unhandledrejection"));
        assert!(document.contains("<title>Test &lt;artifact&gt;</title>"));
    }

    #[test]
    fn test_complete_document_kept_verbatim() {
        let content = concat!(
            "<!doctype html>\n",
            "<html><head><title>Mine</title></head><body>x</body></html>",
        );
        let document = synthesize(ArtifactKind::Markup, content, &ThemeSnapshot::dark()).unwrap();
        let document = document.as_str();

        assert!(!document.contains("color-scheme"));
        assert!(document.starts_with("<!doctype html>\n<html><head>\n<script>"));
        assert!(document.ends_with("<title>Mine</title></head><body>x</body></html>"));
    }

    #[test]
    fn test_scenario_pending_library_not_injected() {
        let registry = ResourceRegistry::builtin().unwrap();
        let detected = detect(&registry, CHART_CONTENT);
        assert_eq!(detected.len(), 1);

        let resolution = resolve(&detected, None);
        assert_eq!(resolution.pending.len(), 1);

        let chart = artifact(ArtifactKind::Markup, CHART_CONTENT);
        let document = synthesizer()
            .synthesize(&chart, &resolution.ready, &ThemeSnapshot::light())
            .unwrap();
        assert!(!document.as_str().contains(CHART_URL));
    }

    #[test]
    fn test_scenario_auto_approved_library_injected_once() {
        let registry = ResourceRegistry::builtin().unwrap();
        let record = ApprovalRecord {
            auto_approve_all: true,
            ..Default::default()
        };

        let mut detected = detect(&registry, CHART_CONTENT);
        detected.extend(detect(&registry, CHART_CONTENT));
        let resolution = resolve(&detected, Some(&record));
        assert!(resolution.pending.is_empty());

        let chart = artifact(ArtifactKind::Markup, CHART_CONTENT);
        let document = synthesizer()
            .synthesize(&chart, &resolution.ready, &ThemeSnapshot::light())
            .unwrap();
        assert_eq!(document.as_str().matches(CHART_URL).count(), 1);
    }

    #[test]
    fn test_code_languages() {
        let synth = synthesizer();
        let theme = ThemeSnapshot::light();

        let js =
            artifact(ArtifactKind::Code, "console.log('</script>')").with_language("javascript");
        let doc = synth.synthesize(&js, &Injection::default(), &theme).unwrap();
        assert!(doc.as_str().contains(r"console.log('<\/script>')"));

        let py = artifact(ArtifactKind::Code, "print(1 < 2)").with_language("python");
        let doc = synth.synthesize(&py, &Injection::default(), &theme).unwrap();
        let expected = r#"<pre><code class="language-python">print(1 &lt; 2)</code></pre>"#;
        assert!(doc.as_str().contains(expected));
    }

    #[test]
    fn test_component_document() {
        let source = concat!(
            "import React, { useState } from 'react';\n",
            "export default function Counter() {\n",
            "  const [n, setN] = useState(0);\n",
            "  return <button>{n}</button>;\n",
            "}\n",
        );
        let doc = synthesize(ArtifactKind::Component, source, &ThemeSnapshot::light()).unwrap();
        let doc = doc.as_str();

        assert!(doc.contains("react.production.min.js"));
        assert!(doc.contains(r#"<div id="artifact-root"></div>"#));
        assert!(doc.contains("const { useState } = React;"));
        assert!(doc.contains("function Counter()"));
        assert!(!doc.contains("export default"));
        assert!(doc.contains("React.createElement(Counter)"));
        assert!(doc.contains("artifact-ready"));
    }

    #[test]
    fn test_prepare_component_variants() {
        let widget = "const Widget = () => <p/>;\nexport default Widget;\n";
        let (src, name) = prepare_component(widget);
        assert_eq!(name, "Widget");
        assert!(!src.contains("export"));

        let (src, name) = prepare_component("export default () => <p/>;\n");
        assert_eq!(name, ANONYMOUS_COMPONENT);
        assert!(src.contains("const ArtifactComponent = () => <p/>;"));

        let (_, name) = prepare_component("function App() { return null }\n");
        assert_eq!(name, "App");

        let (src, _) = prepare_component(concat!(
            "import * as R from 'react';\n",
            "import { createRoot as cr } from 'react-dom/client';\n",
        ));
        assert!(src.contains("const R = React;"));
        assert!(src.contains("const { createRoot: cr } = ReactDOM;"));
    }

    #[test]
    fn test_diagram_is_sanitized_host_markup() {
        let result =
            synthesize(ArtifactKind::Diagram, "graph TD; A-->B", &ThemeSnapshot::light()).unwrap();
        let Synthesized::HostMarkup { markup } = result else {
            panic!("expected host markup");
        };
        assert!(!markup.contains("<script"));
        assert!(!markup.contains("onload"));
        assert!(markup.contains("graph TD; A--&gt;B") || markup.contains("graph TD; A-->B"));
    }

    #[test]
    fn test_diagram_failure_routes_message() {
        let theme = ThemeSnapshot::light();
        let err = synthesize(ArtifactKind::Diagram, "nonsense", &theme).unwrap_err();
        assert!(matches!(err, SynthesisError::Diagram(ref m) if m.starts_with("Parse error")));
    }

    #[test]
    fn test_vector_image_sizing() {
        let bare = synthesize(
            ArtifactKind::VectorImage,
            "<svg><circle r=\"4\"/></svg>",
            &ThemeSnapshot::light(),
        )
        .unwrap();
        let Synthesized::DataUri { uri } = bare else {
            panic!("expected data uri");
        };
        let encoded = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 800 600" "#,
                r#"width="100%" height="100%"><circle r="4"/></svg>"#,
            )
        );

        let sized = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;
        assert_eq!(ensure_svg_sizing(sized, "0 0 800 600"), sized);
    }

    #[test]
    fn test_markdown_and_raster() {
        let theme = ThemeSnapshot::light();

        let content = "# Title\n\n<script>x()</script>\n\n*hi*";
        let md = synthesize(ArtifactKind::Markdown, content, &theme).unwrap();
        assert!(md.as_str().contains("<h1>Title</h1>"));
        assert!(md.as_str().contains("<em>hi</em>"));
        assert!(!md.as_str().contains("<script"));
        assert!(!md.is_sandboxed());

        let img = synthesize(ArtifactKind::RasterImage, " https://example.com/a.png \n", &theme);
        assert_eq!(
            img.unwrap(),
            Synthesized::Passthrough {
                reference: "https://example.com/a.png".to_string()
            }
        );
    }

    #[test]
    fn test_markdown_links_cannot_run_script() {
        let html =
            render_markdown(r#"click <a href="&#106;avascript:alert(document.cookie)">here</a>"#);
        assert!(!html.contains("avascript"));
        assert!(html.contains(">here</a>"));

        let html = render_markdown("[x](javascript:alert(1)) and <svg/onload=alert(2)>");
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("onload"));
        assert!(html.contains(">x</a>"));

        let html = render_markdown("[docs](https://example.com/docs)");
        assert!(html.contains(r#"href="https://example.com/docs""#));
    }
}
