//! CLI binary for pdfglance.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, shows progress from the event channel and prints the
//! report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfglance::{
    event_channel, write_atomic, BlockOrder, ChartDataset, ChartRenderer, EventReceiver,
    ExtractionConfig, ExtractionReport, OcrBackend, Orchestrator, PieChartRenderer,
    ProgressEvent, Provenance,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress display driven by the event channel ─────────────────────────────

/// Drain progress events into an indicatif bar until every sender is gone.
fn spawn_progress(mut events: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Loading");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        while let Some(event) = events.recv().await {
            match event {
                ProgressEvent::DocumentOpened { page_count } => {
                    bar.set_style(
                        ProgressStyle::with_template(
                            "{spinner:.cyan} {prefix:.bold}  \
                             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
                        )
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▉▊▋▌▍▎▏  ")
                        .tick_strings(TICKS),
                    );
                    bar.set_length(page_count as u64);
                    bar.set_prefix("Extracting");
                }
                ProgressEvent::PageStarted { page, .. } => {
                    bar.set_position(page.saturating_sub(1) as u64);
                    bar.set_message(format!("page {page}"));
                }
                ProgressEvent::BlockAppended {
                    page,
                    provenance,
                    chars,
                } => {
                    let source = match provenance {
                        Provenance::Native => "text",
                        Provenance::Ocr => "OCR ",
                    };
                    bar.println(format!(
                        "  {} Page {:>3}  {}  {}",
                        green("✓"),
                        page,
                        source,
                        dim(&format!("{chars:>5} chars")),
                    ));
                }
                ProgressEvent::OcrQueued { page } => {
                    bar.println(format!("  {} Page {:>3}  no text layer, OCR queued", cyan("…"), page));
                }
                ProgressEvent::OcrProgress {
                    page,
                    status,
                    progress,
                } => {
                    bar.set_message(format!("OCR page {page}: {status} {:.0}%", progress * 100.0));
                }
                ProgressEvent::OcrFailed { page, error } => {
                    let msg: String = if error.chars().count() > 80 {
                        error.chars().take(79).chain(['\u{2026}']).collect()
                    } else {
                        error
                    };
                    bar.println(format!("  {} Page {:>3}  {}", red("✗"), page, red(&msg)));
                }
                ProgressEvent::PagesFinished { .. } => {
                    if let Some(len) = bar.length() {
                        bar.set_position(len);
                    }
                    bar.set_prefix("Summarizing");
                    bar.set_message("");
                }
                ProgressEvent::StateChanged { .. } => {}
            }
        }

        bar.finish_and_clear();
    })
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract text, summary and chart data (stdout)
  pdfglance report.pdf

  # Also render the pie chart
  pdfglance report.pdf --chart chart.png

  # Scanned document in German, OCR through a vision model
  pdfglance scan.pdf --ocr vision --lang deu --provider openai

  # JSON report written to a file
  pdfglance report.pdf --json -o report.json

  # Keep OCR blocks in completion order
  pdfglance scan.pdf --order arrival

OCR BACKENDS:
  tesseract   local `tesseract` executable (default); install language packs
              for --lang codes other than eng
  vision      vision LLM via edgequake-llm (needs an API key)
  off         no OCR; pages without a text layer are skipped

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           OpenAI API key (vision OCR)
  ANTHROPIC_API_KEY        Anthropic API key (vision OCR)
  EDGEQUAKE_LLM_PROVIDER   Vision provider override
  EDGEQUAKE_MODEL          Vision model override
  PDFGLANCE_PDFIUM_LIB     Path to libpdfium; otherwise ./ then the system library
  RUST_LOG                 Log filter (overrides -v / -q)
"#;

/// Extract text from PDFs, with OCR for scanned pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdfglance",
    version,
    about = "Extract text from PDFs with OCR fallback, plus a summary and chart data",
    long_about = "Extract the text layer of every page of a PDF. Pages without one are rendered \
and read with OCR (tesseract or a vision LLM). Prints the text, a 500-character summary and a \
pie-chart dataset built from the first numbers found in the text.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to read.
    input: Option<PathBuf>,

    /// OCR backend for pages without a text layer.
    #[arg(long, env = "PDFGLANCE_OCR", value_enum, default_value = "tesseract")]
    ocr: OcrArg,

    /// OCR language code (tesseract style: eng, deu, fra, …).
    #[arg(long, env = "PDFGLANCE_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract executable.
    #[arg(long, env = "PDFGLANCE_TESSERACT_CMD", default_value = "tesseract")]
    tesseract_cmd: String,

    /// LLM provider for `--ocr vision`: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "PDFGLANCE_PROVIDER")]
    provider: Option<String>,

    /// Vision model ID for `--ocr vision` (default gpt-4.1-nano).
    #[arg(long, env = "PDFGLANCE_MODEL")]
    model: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFGLANCE_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFGLANCE_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Render scale for OCR (1.0 = one pixel per point).
    #[arg(long, env = "PDFGLANCE_SCALE", default_value_t = 1.0)]
    scale: f32,

    /// Block order: page (sorted) or arrival (OCR completion order).
    #[arg(long, env = "PDFGLANCE_ORDER", value_enum, default_value = "page")]
    order: OrderArg,

    /// Summary length in characters.
    #[arg(long, env = "PDFGLANCE_SUMMARY_CHARS", default_value_t = 500)]
    summary_chars: usize,

    /// Render the pie chart to this PNG file.
    #[arg(long, env = "PDFGLANCE_CHART")]
    chart: Option<PathBuf>,

    /// Chart width and height in pixels.
    #[arg(long, env = "PDFGLANCE_CHART_SIZE", default_value_t = 400,
          value_parser = clap::value_parser!(u32).range(64..=4096))]
    chart_size: u32,

    /// Output the JSON report instead of text.
    #[arg(long, env = "PDFGLANCE_JSON")]
    json: bool,

    /// Write the output to this file instead of stdout.
    #[arg(short, long, env = "PDFGLANCE_OUTPUT")]
    output: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PDFGLANCE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFGLANCE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFGLANCE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OcrArg {
    Tesseract,
    Vision,
    Off,
}

impl From<OcrArg> for OcrBackend {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::Tesseract => OcrBackend::Tesseract,
            OcrArg::Vision => OcrBackend::Vision,
            OcrArg::Off => OcrBackend::Disabled,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Page,
    Arrival,
}

impl From<OrderArg> for BlockOrder {
    fn from(v: OrderArg) -> Self {
        match v {
            OrderArg::Page => BlockOrder::PageOrder,
            OrderArg::Arrival => BlockOrder::Arrival,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the feedback while it is visible.
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
    let (events, receiver) = if show_progress {
        let (tx, rx) = event_channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    let config = build_config(&cli, events)?;
    let orchestrator = Orchestrator::from_config(config).context("Failed to set up extraction")?;

    // Start the bar only after setup succeeds.
    let progress = receiver.map(spawn_progress);

    // ── Run extraction ───────────────────────────────────────────────────
    let result = orchestrator.extract(cli.input.as_deref()).await;

    // Dropping the orchestrator closes the event channel and ends the bar.
    drop(orchestrator);
    if let Some(handle) = progress {
        handle.await.ok();
    }

    let report = result.context("Extraction failed")?;

    // ── Chart image ──────────────────────────────────────────────────────
    let chart_file = match (&cli.chart, &report.chart) {
        (Some(path), Some(dataset)) => write_chart(dataset, path, cli.chart_size, cli.quiet),
        (Some(_), None) => {
            if !cli.quiet {
                eprintln!("{} no chart: fewer than two numbers in the text", cyan("⚠"));
            }
            None
        }
        _ => None,
    };

    // ── Output ───────────────────────────────────────────────────────────
    let rendered = if cli.json {
        serde_json::to_string_pretty(&report).context("Failed to serialise report")?
    } else {
        render_report(&report, chart_file.as_deref())
    };

    if let Some(ref output_path) = cli.output {
        write_atomic(output_path, rendered.as_bytes())
            .await
            .context("Failed to write output")?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        print_stats(&report, cli.output.as_deref());
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, events: Option<pdfglance::EventSender>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .ocr(cli.ocr.into())
        .ocr_language(cli.lang.clone())
        .tesseract_command(cli.tesseract_cmd.clone())
        .render_scale(cli.scale)
        .block_order(cli.order.into())
        .summary_limit(cli.summary_chars);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(tx) = events {
        builder = builder.events(tx);
    }

    builder.build().context("Invalid configuration")
}

/// Render the chart PNG. Failures are reported and otherwise ignored.
fn write_chart(dataset: &ChartDataset, path: &Path, size: u32, quiet: bool) -> Option<PathBuf> {
    match PieChartRenderer::new(size, size).render_to_file(dataset, path) {
        Ok(()) => Some(path.to_path_buf()),
        Err(e) => {
            if !quiet {
                eprintln!("{} chart not written: {}", cyan("⚠"), e);
            }
            None
        }
    }
}

/// The three output regions: text, summary, chart.
fn render_report(report: &ExtractionReport, chart_file: Option<&Path>) -> String {
    let mut out = String::new();

    out.push_str("── Extracted text ──\n\n");
    out.push_str(&report.text);

    out.push_str("── Summary ──\n\n");
    out.push_str(&report.summary);
    out.push_str("\n\n");

    out.push_str("── Chart ──\n\n");
    match &report.chart {
        Some(chart) => {
            for ((label, value), color) in chart.labels.iter().zip(&chart.values).zip(&chart.colors)
            {
                out.push_str(&format!("{label}: {value} ({color})\n"));
            }
            if let Some(path) = chart_file {
                out.push_str(&format!("Pie chart written to {}\n", path.display()));
            }
        }
        None => out.push_str("No chart: fewer than two numbers in the text.\n"),
    }

    out
}

fn print_stats(report: &ExtractionReport, output: Option<&Path>) {
    let stats = &report.stats;
    let mark = if stats.ocr_failed_pages == 0 {
        green("✔")
    } else {
        cyan("⚠")
    };

    let destination = output
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();

    eprintln!(
        "{}  {} pages: {} text, {} OCR, {} failed, {} blank  {}ms{}",
        mark,
        stats.total_pages,
        stats.native_pages,
        stats.ocr_pages,
        stats.ocr_failed_pages,
        stats.blank_pages,
        stats.total_duration_ms,
        destination,
    );
    for err in &report.ocr_errors {
        eprintln!("   {}", dim(&err.to_string()));
    }
}
