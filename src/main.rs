//! Artifact Preview CLI
//!
//! Single-shot mode:
//!   artifact-preview [options] <kind> <file>
//!
//! Detect mode:
//!   artifact-preview --detect <file>
//!
//! Server mode (persistent process, reads from stdin):
//!   artifact-preview [options] --server
//!
//! Options:
//!   --config <path>     load PreviewConfig from TOML
//!   --theme light|dark  theme snapshot to synthesize with (default: light)
//!   --user <id>         approval record owner (default: $USER or "local")
//!   --approve           approve detected libraries for this run
//!   --remember          with --approve, persist the approval
//!
//! Protocol (server mode):
//!   Request (stdin, one JSON object per line):
//!     {"kind":"html","content":"<h1>Hi</h1>","theme":"dark","approve":false}
//!
//!   Response (stdout):
//!     Status:Ok
//!     Length:1234
//!
//!     <!DOCTYPE html>...
//!
//!   Pending response (libraries need approval, body lists them as JSON):
//!     Status:Pending
//!     Length:210
//!
//!     [{"name":"chart.js",...}]
//!
//!   Error response:
//!     Status:Error
//!     Length:42
//!
//!     unknown artifact kind: 'foo'

use anyhow::{anyhow, Result};
use artifact_preview::{
    detect, ApprovalDecision, ApprovalRequest, ApprovalStore, Artifact, ArtifactKind,
    DetectedLibrary, DocumentSynthesizer, FileApprovalStore, Gatekeeper, Injection,
    MemoryApprovalStore, PreviewConfig, ResourceRegistry, ThemeMode, ThemeSnapshot,
};
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Artifact Preview - sandboxed preview document synthesis");
    eprintln!();
    eprintln!("Single-shot mode:");
    eprintln!("  artifact-preview [options] <kind> <file>");
    eprintln!();
    eprintln!("Detect mode:");
    eprintln!("  artifact-preview --detect <file>");
    eprintln!();
    eprintln!("Server mode (persistent process):");
    eprintln!("  artifact-preview [options] --server");
    eprintln!();
    eprintln!("Options: --config <path> --theme light|dark --user <id> --approve --remember");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  artifact-preview --theme dark html ./page.html");
    eprintln!("  artifact-preview --approve --remember react ./App.jsx");
    eprintln!("  artifact-preview --server");
}

struct Cli {
    config_path: Option<String>,
    theme: ThemeMode,
    user: Option<String>,
    approve: bool,
    remember: bool,
    mode: Mode,
}

enum Mode {
    Single { kind: String, file: String },
    Detect { file: String },
    Server,
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut config_path = None;
    let mut theme = ThemeMode::Light;
    let mut user = None;
    let mut approve = false;
    let mut remember = false;
    let mut detect_file = None;
    let mut server = false;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config_path = Some(next_value(&mut iter, "--config")?),
            "--user" => user = Some(next_value(&mut iter, "--user")?),
            "--theme" => {
                theme = match next_value(&mut iter, "--theme")?.as_str() {
                    "light" => ThemeMode::Light,
                    "dark" => ThemeMode::Dark,
                    other => {
                        return Err(anyhow!("Unknown theme '{}', expected light or dark", other))
                    }
                }
            }
            "--approve" => approve = true,
            "--remember" => remember = true,
            "--detect" => detect_file = Some(next_value(&mut iter, "--detect")?),
            "--server" => server = true,
            flag if flag.starts_with("--") => return Err(anyhow!("Unknown option: {}", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    let mode = if server {
        Mode::Server
    } else if let Some(file) = detect_file {
        Mode::Detect { file }
    } else {
        match positional.as_slice() {
            [kind, file] => Mode::Single {
                kind: kind.clone(),
                file: file.clone(),
            },
            _ => return Err(anyhow!("Missing required arguments")),
        }
    };

    Ok(Cli {
        config_path,
        theme,
        user,
        approve,
        remember,
        mode,
    })
}

fn next_value(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| anyhow!("{} requires a value", flag))
}

/// Everything needed to gate and synthesize outside a live preview.
struct Toolkit {
    registry: ResourceRegistry,
    gatekeeper: Gatekeeper,
    synthesizer: DocumentSynthesizer,
}

impl Toolkit {
    fn new(config: &PreviewConfig, user: String) -> Result<Self> {
        let registry = match &config.registry_path {
            Some(path) => ResourceRegistry::load(path)?,
            None => ResourceRegistry::builtin()?,
        };

        let store: Arc<dyn ApprovalStore> = match &config.approvals_path {
            Some(path) => Arc::new(FileApprovalStore::new(path)),
            None => Arc::new(MemoryApprovalStore::new()),
        };

        // No diagram engine ships with the CLI; pre-rendered SVG passes through.
        let diagram = |source: &str| -> Result<String> {
            let trimmed = source.trim_start();
            if trimmed.starts_with("<svg") {
                Ok(trimmed.to_string())
            } else {
                Err(anyhow!("No diagram renderer available; provide pre-rendered SVG"))
            }
        };

        Ok(Self {
            registry,
            gatekeeper: Gatekeeper::new(store, user),
            synthesizer: DocumentSynthesizer::new(
                Arc::new(diagram),
                config.component_runtime.clone(),
                config.default_viewbox.clone(),
            ),
        })
    }

    /// Gate the artifact's dependencies. `Err` carries what still needs
    /// approval when `approve` is false.
    async fn clear(
        &self,
        artifact: &Artifact,
        approve: bool,
        remember: bool,
    ) -> Result<Injection, Vec<DetectedLibrary>> {
        let detected = detect(&self.registry, &artifact.content);
        let resolution = self.gatekeeper.clear(&detected).await;
        if resolution.pending.is_empty() {
            return Ok(resolution.ready);
        }
        if !approve {
            return Err(resolution.pending);
        }

        let mut request = ApprovalRequest::new(artifact.id.clone(), resolution.pending);
        Ok(self
            .gatekeeper
            .decide(&mut request, ApprovalDecision::Approve { remember })
            .await)
    }
}

/// Run in single-shot mode
async fn run_single_shot(cli: &Cli, toolkit: &Toolkit, kind: &str, file: &str) -> Result<()> {
    let kind: ArtifactKind = kind.parse()?;
    let content =
        std::fs::read_to_string(file).map_err(|e| anyhow!("Failed to read '{}': {}", file, e))?;
    let artifact = Artifact::new(kind, file, content);

    let injection = match toolkit.clear(&artifact, cli.approve, cli.remember).await {
        Ok(injection) => injection,
        Err(pending) => {
            for lib in &pending {
                tracing::warn!(
                    library = %lib.name,
                    url = %lib.resource_url,
                    "not injected without approval (rerun with --approve)"
                );
            }
            Injection::default()
        }
    };

    let preview = toolkit
        .synthesizer
        .synthesize(&artifact, &injection, &ThemeSnapshot::for_mode(cli.theme))?;
    println!("{}", preview.as_str());

    Ok(())
}

/// Print detected libraries as JSON
fn run_detect(toolkit: &Toolkit, file: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(file).map_err(|e| anyhow!("Failed to read '{}': {}", file, e))?;
    let detected = detect(&toolkit.registry, &content);
    println!("{}", serde_json::to_string_pretty(&detected)?);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ServerRequest {
    kind: String,
    content: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    theme: Option<ThemeMode>,
    #[serde(default)]
    approve: bool,
    #[serde(default)]
    remember: bool,
}

enum Reply {
    Ok(String),
    Pending(String),
    Error(String),
}

async fn handle_request(toolkit: &Toolkit, line: &str) -> Reply {
    let request: ServerRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return Reply::Error(format!("Invalid request JSON: {}", e)),
    };
    let kind: ArtifactKind = match request.kind.parse() {
        Ok(kind) => kind,
        Err(e) => return Reply::Error(e.to_string()),
    };

    let mut artifact = Artifact::new(kind, request.title.unwrap_or_default(), request.content);
    artifact.language = request.language;

    let injection = match toolkit.clear(&artifact, request.approve, request.remember).await {
        Ok(injection) => injection,
        Err(pending) => {
            return match serde_json::to_string(&pending) {
                Ok(body) => Reply::Pending(body),
                Err(e) => Reply::Error(e.to_string()),
            }
        }
    };

    let theme = ThemeSnapshot::for_mode(request.theme.unwrap_or(ThemeMode::Light));
    match toolkit.synthesizer.synthesize(&artifact, &injection, &theme) {
        Ok(preview) => Reply::Ok(preview.as_str().to_string()),
        Err(e) => Reply::Error(e.to_string()),
    }
}

/// Run in server mode (persistent process, reads requests from stdin)
async fn run_server(toolkit: &Toolkit) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut reader = stdin.lock();

    tracing::info!("server ready, reading from stdin");

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            // EOF - stdin closed, exit gracefully
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match handle_request(toolkit, line).await {
            Reply::Ok(body) => write_response(&mut stdout, "Ok", &body)?,
            Reply::Pending(body) => write_response(&mut stdout, "Pending", &body)?,
            Reply::Error(body) => write_response(&mut stdout, "Error", &body)?,
        }
    }

    tracing::info!("server shutting down");
    Ok(())
}

/// Write response in length-prefixed protocol
fn write_response(stdout: &mut std::io::Stdout, status: &str, body: &str) -> Result<()> {
    writeln!(stdout, "Status:{}", status)?;
    writeln!(stdout, "Length:{}", body.len())?;
    writeln!(stdout)?; // Empty line separator
    write!(stdout, "{}", body)?;
    stdout.flush()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            print_usage();
            return Err(e);
        }
    };

    let config = match &cli.config_path {
        Some(path) => PreviewConfig::load(path)?,
        None => PreviewConfig::default(),
    };
    let user = cli
        .user
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| String::from("local"));
    let toolkit = Toolkit::new(&config, user)?;

    match &cli.mode {
        Mode::Single { kind, file } => run_single_shot(&cli, &toolkit, kind, file).await,
        Mode::Detect { file } => run_detect(&toolkit, file),
        Mode::Server => run_server(&toolkit).await,
    }
}
