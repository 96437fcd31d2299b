//! CLI binary for edgequake-pdftask.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, runs one task and prints where the result went.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdftask::{
    run_task, ClientConfig, CompressOptions, CompressionLevel, ProcessResult, ProgressCallback,
    Session, Task, TaskProgressCallback, ToolVariant,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// One bar reused for each phase: file count while uploading, a spinner
/// while the server works, bytes while downloading.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl TaskProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_length(total_files as u64);
        self.bar.set_position(0);
        self.bar.set_prefix("Uploading");
    }

    fn on_file_uploaded(&self, _index: usize, _total: usize, path: &Path) {
        self.bar
            .println(format!("  {} {}", green("✓"), dim(&path.display().to_string())));
        self.bar.inc(1);
        if self.bar.position() >= self.bar.length().unwrap_or(0) {
            self.bar.set_style(spinner_style());
            self.bar.set_prefix("Processing");
            self.bar.set_message("waiting for server…");
        }
    }

    fn on_process_complete(&self, result: &ProcessResult) {
        let ratio = result
            .size_ratio()
            .map(|r| format!("  {:.0}% of original", r * 100.0))
            .unwrap_or_default();
        self.bar.println(format!(
            "  {} processed → {}{}",
            green("✓"),
            bold(&result.download_filename),
            dim(&ratio)
        ));
    }

    fn on_download_progress(&self, downloaded: u64, total: Option<u64>) {
        if self.bar.prefix() != "Downloading" {
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
            self.bar.set_style(style);
            self.bar.set_prefix("Downloading");
            self.bar.set_length(total.unwrap_or(0));
        }
        self.bar.set_position(downloaded);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compress one file into the current directory
  pdftask --public-key project_public_... scan.pdf

  # Several files, strongest compression, custom output directory
  pdftask --level extreme -o compressed/ a.pdf b.pdf

  # Any other tool, with raw parameters
  pdftask --tool rotate --param rotate=90 report.pdf

  # Keep the remote task for inspection and print the server report
  pdftask --keep-remote --json scan.pdf

ENVIRONMENT VARIABLES:
  PDFTASK_PUBLIC_KEY        Project public key (required)
  PDFTASK_SERVER            Entry server host (default api.ilovepdf.com)
  PDFTASK_OUTPUT_DIR        Output directory
  RUST_LOG                  Override log filter (e.g. edgequake_pdftask=debug)
"#;

/// Run remote PDF tools (compress, …) over local files.
#[derive(Parser, Debug)]
#[command(
    name = "pdftask",
    version,
    about = "Run remote PDF tools (compress, …) over local files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local files to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Project public key.
    #[arg(long, env = "PDFTASK_PUBLIC_KEY", hide_env_values = true)]
    public_key: String,

    /// Remote tool name.
    #[arg(long, env = "PDFTASK_TOOL", default_value = "compress")]
    tool: String,

    /// Compression level (compress tool only).
    #[arg(long, env = "PDFTASK_LEVEL", value_enum, default_value = "recommended")]
    level: LevelArg,

    /// Extra tool parameter as key=value (repeatable).
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Directory for the result (created if missing). Default: current directory.
    #[arg(short, long, env = "PDFTASK_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Entry server host.
    #[arg(long, env = "PDFTASK_SERVER", default_value = edgequake_pdftask::config::DEFAULT_ENTRY_SERVER)]
    server: String,

    /// URL scheme.
    #[arg(long, env = "PDFTASK_SCHEME", default_value = "https")]
    scheme: String,

    /// API version path segment.
    #[arg(long, env = "PDFTASK_API_VERSION", default_value = edgequake_pdftask::config::DEFAULT_API_VERSION)]
    api_version: String,

    /// Send debug=true with every payload.
    #[arg(long, env = "PDFTASK_DEBUG_API")]
    debug_api: bool,

    /// Do not delete the remote task afterwards.
    #[arg(long)]
    keep_remote: bool,

    /// Concurrent uploads per task.
    #[arg(long, env = "PDFTASK_UPLOAD_CONCURRENCY", default_value_t = 1)]
    upload_concurrency: usize,

    /// Connect timeout in seconds.
    #[arg(long, env = "PDFTASK_CONNECT_TIMEOUT", default_value_t = 30)]
    connect_timeout: u64,

    /// Per-request timeout in seconds (0 disables).
    #[arg(long, env = "PDFTASK_TIMEOUT", default_value_t = 600)]
    timeout: u64,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFTASK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFTASK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFTASK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LevelArg {
    Low,
    Recommended,
    Extreme,
}

impl From<LevelArg> for CompressionLevel {
    fn from(v: LevelArg) -> Self {
        match v {
            LevelArg::Low => CompressionLevel::Low,
            LevelArg::Recommended => CompressionLevel::Recommended,
            LevelArg::Extreme => CompressionLevel::Extreme,
        }
    }
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;

    // Tool options are validated before the first request.
    let session = Session::new(config).context("Invalid configuration")?;
    let mut task = build_task(&cli, session)?;
    task.session_mut()
        .authenticate(cli.public_key.as_str())
        .await
        .context("Authentication failed")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = run_task(
        &mut task,
        &cli.files,
        cli.output_dir.as_deref(),
        cli.keep_remote,
    )
    .await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let output = outcome.context("Task failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} file(s)  {}ms  →  {}",
            green("✔"),
            cli.files.len(),
            output.duration_ms,
            bold(&output.output_path.display().to_string()),
        );
        if cli.keep_remote {
            eprintln!("   remote task kept: {}", dim(&output.task_id));
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .scheme(&cli.scheme)
        .entry_server(&cli.server)
        .api_version(&cli.api_version)
        .debug(cli.debug_api)
        .upload_concurrency(cli.upload_concurrency)
        .connect_timeout_secs(cli.connect_timeout)
        .request_timeout_secs((cli.timeout > 0).then_some(cli.timeout));

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Build the task for `--tool`, applying `--level` and `--param`s.
fn build_task(cli: &Cli, session: Session) -> Result<Task> {
    let mut task = if cli.tool == CompressOptions::TOOL {
        CompressOptions {
            level: cli.level.clone().into(),
        }
        .into_task(session)?
    } else {
        Task::new(session, cli.tool.clone())
    };

    for (key, value) in &cli.params {
        task.params_mut()
            .set(key.clone(), value.clone())
            .with_context(|| format!("Invalid --param {key}"))?;
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_param_splits_on_first_equals() {
        assert_eq!(
            parse_param("output_filename=a=b").unwrap(),
            ("output_filename".to_string(), "a=b".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["pdftask", "--public-key", "pk", "a.pdf"]).unwrap();
        assert_eq!(cli.tool, "compress");
        assert_eq!(cli.server, "api.ilovepdf.com");
        assert_eq!(cli.files, vec![PathBuf::from("a.pdf")]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.request_timeout_secs, Some(600));
    }
}
