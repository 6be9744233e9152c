//! CLI binary for md2pdf-watch.
//!
//! A thin shim over the library crate that maps CLI flags to `WatchConfig`,
//! runs the watch loop until Ctrl-C, and prints per-file results.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf_watch::{
    convert_stream, ConversionRequest, ConversionResult, ConversionStatus, MarkdownExtension,
    WatchConfig, WatchController, WatchMode, WatchObserver, WatchSummary, WorkspaceLayout,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal observer ────────────────────────────────────────────────────────

/// Prints one line per conversion, through the progress bar when there is
/// one so the bar stays anchored at the bottom of the terminal.
struct TerminalObserver {
    bar: Option<ProgressBar>,
    json: bool,
    quiet: bool,
}

impl TerminalObserver {
    fn line(&self, text: String) {
        match &self.bar {
            Some(bar) => bar.println(text),
            None => eprintln!("{text}"),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl WatchObserver for TerminalObserver {
    fn on_watch_start(&self, input_dir: &Path) {
        if !self.quiet {
            self.line(format!(
                "{} {}  {}",
                cyan("◆"),
                bold(&format!("Watching {}", input_dir.display())),
                dim("(Ctrl-C to stop)")
            ));
        }
    }

    fn on_conversion_start(&self, request: &ConversionRequest) {
        if let Some(bar) = &self.bar {
            bar.set_message(request.display_name());
        }
    }

    fn on_conversion_complete(&self, result: &ConversionResult) {
        if self.json {
            match serde_json::to_string(result) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("Failed to serialise result: {}", e),
            }
        } else if !self.quiet {
            let name = file_name(&result.source_path);
            let timing = dim(&format!("{}ms", result.duration_ms));
            let text = match result.status {
                ConversionStatus::Success => format!(
                    "  {} {}  →  {}  {}",
                    green("✓"),
                    name,
                    result
                        .output_path
                        .as_deref()
                        .map(file_name)
                        .unwrap_or_default(),
                    timing
                ),
                ConversionStatus::Skipped => format!(
                    "  {} {}  {}",
                    yellow("–"),
                    name,
                    dim(&result
                        .skip_reason
                        .map(|r| r.to_string())
                        .unwrap_or_default())
                ),
                ConversionStatus::Failed => format!(
                    "  {} {}  {}",
                    red("✗"),
                    name,
                    red(result.error.as_deref().unwrap_or("unknown error"))
                ),
            };
            self.line(text);
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_watch_stop(&self, summary: &WatchSummary) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        if self.quiet || self.json {
            return;
        }
        let mark = if summary.failed == 0 {
            green("✔")
        } else {
            red("✘")
        };
        eprintln!(
            "{} {} converted, {} skipped, {} failed",
            mark,
            bold(&summary.converted.to_string()),
            summary.skipped,
            summary.failed
        );
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len}  {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_prefix("Converting");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Watch ./pdf_workspace/input, write PDFs to ./pdf_workspace/output
  md2pdf

  # Use another workspace and convert what is already there first
  md2pdf ~/notes --scan-existing

  # Network share: poll every two seconds instead of OS notifications
  md2pdf /mnt/share/docs --poll --poll-interval-ms 2000

  # Convert existing files once and exit (CI, cron)
  md2pdf docs --once

  # Machine-readable results, one JSON object per line
  md2pdf --json > results.ndjson

LAYOUT:
  <workspace>/input/    drop or save *.md files here (not recursive)
  <workspace>/output/   <stem>.pdf appears here, overwritten on each change

ENVIRONMENT VARIABLES:
  MD2PDF_WORKSPACE        Workspace root (default: pdf_workspace)
  MD2PDF_SETTLE_MS        Delay between an event and reading the file
  MD2PDF_POLL             Use polling instead of native notification
  RUST_LOG                Override the log filter (e.g. md2pdf_watch=debug)
"#;

/// Watch a directory and convert Markdown files into styled PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Watch a directory and convert Markdown files into styled PDFs",
    long_about = "Watch <workspace>/input for Markdown files that are created, saved or moved \
in, and render each one to <workspace>/output/<stem>.pdf with a fixed A4 style sheet. \
Runs until interrupted with Ctrl-C.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Workspace root holding the `input` and `output` directories.
    #[arg(env = "MD2PDF_WORKSPACE", default_value = "pdf_workspace")]
    workspace: PathBuf,

    /// Poll the directory instead of using OS notifications.
    #[arg(long, env = "MD2PDF_POLL")]
    poll: bool,

    /// Polling interval in milliseconds (with --poll).
    #[arg(long, env = "MD2PDF_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Pause after an event before reading the file, in milliseconds (≥ 500).
    #[arg(long, env = "MD2PDF_SETTLE_MS", default_value_t = 500)]
    settle_ms: u64,

    /// Abandon a render that takes longer than this many seconds.
    #[arg(long, env = "MD2PDF_RENDER_TIMEOUT", default_value_t = 30)]
    render_timeout: u64,

    /// Leave pipe tables as literal text.
    #[arg(long, env = "MD2PDF_NO_TABLES")]
    no_tables: bool,

    /// Render ``` fences as inline code instead of code blocks.
    #[arg(long, env = "MD2PDF_NO_FENCED_CODE")]
    no_fenced_code: bool,

    /// Restart ordered-list numbering at 1.
    #[arg(long, env = "MD2PDF_NO_SANE_LISTS")]
    no_sane_lists: bool,

    /// Treat single newlines as spaces rather than line breaks.
    #[arg(long, env = "MD2PDF_NO_NL2BR")]
    no_nl2br: bool,

    /// Convert Markdown files already in the input directory before watching.
    #[arg(long, env = "MD2PDF_SCAN_EXISTING")]
    scan_existing: bool,

    /// Convert existing files and exit without watching.
    #[arg(long, conflicts_with = "scan_existing")]
    once: bool,

    /// Print each result as a JSON line on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The batch progress bar replaces INFO-level logs; watch mode keeps them
    // because each event is worth a timestamped line.
    let show_progress = cli.once && !cli.quiet && !cli.json;
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

    // ── Resolve workspace once ───────────────────────────────────────────
    let root = std::path::absolute(&cli.workspace)
        .with_context(|| format!("Failed to resolve workspace {:?}", cli.workspace))?;
    let layout = WorkspaceLayout::from_root(&root).context("Invalid workspace")?;

    // ── Run ──────────────────────────────────────────────────────────────
    if cli.once {
        return run_once(&cli, &layout).await;
    }

    let mut config = build_config(&cli)?;
    config.observer = Some(Arc::new(TerminalObserver {
        bar: None,
        json: cli.json,
        quiet: cli.quiet,
    }));
    let controller = WatchController::new(layout, &config).scan_existing(cli.scan_existing);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    controller
        .run(shutdown)
        .await
        .context("Watcher failed to start")?;
    Ok(())
}

/// `--once`: convert what is in the input directory, then exit.
async fn run_once(cli: &Cli, layout: &WorkspaceLayout) -> Result<()> {
    let config = build_config(cli)?;
    let batch = convert_stream(layout, &config)
        .await
        .context("Failed to read workspace")?;

    let observer = TerminalObserver {
        bar: (!cli.quiet && !cli.json && batch.total > 0).then(|| progress_bar(batch.total)),
        json: cli.json,
        quiet: cli.quiet,
    };

    let mut summary = WatchSummary::default();
    let mut results = batch.results;
    while let Some(result) = results.next().await {
        summary.record(&result);
        observer.on_conversion_complete(&result);
    }
    observer.on_watch_stop(&summary);

    if summary.failed > 0 {
        anyhow::bail!("{} document(s) failed to convert", summary.failed);
    }
    Ok(())
}

/// Map CLI args to `WatchConfig`.
fn build_config(cli: &Cli) -> Result<WatchConfig> {
    let mut builder = WatchConfig::builder()
        .settle_delay_ms(cli.settle_ms)
        .poll_interval_ms(cli.poll_interval_ms)
        .render_timeout_secs(cli.render_timeout)
        .watch_mode(if cli.poll {
            WatchMode::Polling
        } else {
            WatchMode::Native
        });

    for (off, ext) in [
        (cli.no_tables, MarkdownExtension::Tables),
        (cli.no_fenced_code, MarkdownExtension::FencedCode),
        (cli.no_sane_lists, MarkdownExtension::SaneLists),
        (cli.no_nl2br, MarkdownExtension::Nl2Br),
    ] {
        if off {
            builder = builder.without_extension(ext);
        }
    }

    builder.build().context("Invalid configuration")
}
