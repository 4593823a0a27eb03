//! CLI binary for markitdown.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use markitdown::{
    convert_loaded, load, resolve_provider, write_atomic, ConversionConfig,
    ConversionProgressCallback, FileType, LlmEnricher, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for the PDF page pipeline. Pages may complete out of
/// order in concurrent mode.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// The bar starts as a spinner; `on_conversion_start` sets its length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&page)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Clear the bar if no PDF pipeline ever ran (HTML input).
    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(page, Instant::now());
        self.bar.set_message(format!("page {}", page + 1));
    }

    fn on_page_complete(&self, page: usize, total: usize, markdown_len: usize) {
        let elapsed = self.elapsed_secs(page);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page + 1,
            total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(page);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page + 1,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if success_count == total_pages {
            eprintln!(
                "{} {} pages converted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} conversion aborted after {}/{} pages",
                red("✘"),
                bold(&success_count.to_string()),
                total_pages
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a local PDF file
  markitdown document.pdf -o output.md

  # Convert from a URL
  markitdown https://example.com/document.html -o output.md

  # Use a specific LLM model
  markitdown document.pdf -m gpt-4o -o output.md

  # Text layer only, no API key needed
  markitdown --no-llm document.pdf

  # Output to stdout (no -o flag)
  markitdown document.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium
"#;

/// Convert PDF and HTML documents to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "markitdown",
    version,
    about = "Convert documents to markdown",
    long_about = "Convert PDF and HTML documents (local files or URLs) to Markdown. \
PDF pages are sent to a Vision Language Model together with their text layer; \
use --no-llm to extract the text layer only.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local .pdf/.html/.htm file or HTTP/HTTPS URL.
    input: String,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "MARKITDOWN_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID.
    #[arg(short, long, env = "MARKITDOWN_MODEL", default_value = markitdown::config::DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "MARKITDOWN_PROVIDER")]
    provider: Option<String>,

    /// Number of pages processed concurrently.
    #[arg(short, long, env = "MARKITDOWN_WORKERS", default_value_t = markitdown::config::DEFAULT_NUM_WORKERS)]
    workers: usize,

    /// Page rendering DPI (72–600).
    #[arg(long, env = "MARKITDOWN_DPI", default_value_t = markitdown::config::DEFAULT_IMAGE_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "MARKITDOWN_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "MARKITDOWN_PASSWORD")]
    password: Option<String>,

    /// Extract PDF text only; do not call an LLM.
    #[arg(long)]
    no_llm: bool,

    /// Convert the whole HTML body instead of the main article.
    #[arg(long)]
    raw_html: bool,

    /// Output JSON `{input, file_type, markdown, duration_ms}`.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MARKITDOWN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MARKITDOWN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-page LLM call timeout in seconds (none by default).
    #[arg(long, env = "MARKITDOWN_ENRICH_TIMEOUT")]
    enrich_timeout: Option<u64>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    input: &'a str,
    file_type: FileType,
    markdown: &'a str,
    duration_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    validate_input(&cli.input)?;

    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
    )
    .await?;

    info!("Converting {}", cli.input);
    let start = Instant::now();

    let result = async {
        let source = load(&cli.input, config.download_timeout_secs).await?;
        let file_type = source.file_type;
        convert_loaded(source, &config)
            .await
            .map(|markdown| (file_type, markdown))
    }
    .await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let (file_type, markdown) = result.context("Conversion failed")?;
    let duration = start.elapsed();

    if cli.json {
        let out = JsonOutput {
            input: &cli.input,
            file_type,
            markdown: &markdown,
            duration_ms: duration.as_millis() as u64,
        };
        let json = serde_json::to_string_pretty(&out).context("Failed to serialise output")?;
        emit(&cli, json).await?;
    } else {
        emit(&cli, markdown).await?;
    }

    info!("Conversion completed in {:?}", duration);
    if !cli.quiet && !cli.json {
        if let Some(ref path) = cli.output {
            eprintln!(
                "{}  {}ms  →  {}",
                green("✔"),
                duration.as_millis(),
                bold(&path.display().to_string())
            );
        }
    }
    Ok(())
}

/// Write to `--output` atomically, or to stdout.
async fn emit(cli: &Cli, text: String) -> Result<()> {
    match cli.output {
        Some(ref path) => {
            write_atomic(path.clone(), text)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

/// Accept http(s) URLs, or existing files with a supported extension.
fn validate_input(input: &str) -> Result<()> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok(());
    }
    if input.contains("://") {
        bail!("invalid URL scheme: must be http or https");
    }

    let path = Path::new(input);
    if !path.exists() {
        bail!("input file not found: {}", input);
    }
    match FileType::from_path(path) {
        Ok(file_type) if file_type.has_converter() => Ok(()),
        Ok(file_type) => bail!(
            "no converter for .{} files (supported: pdf, html, htm)",
            file_type
        ),
        Err(_) => bail!(
            "unsupported file type: {} (supported: pdf, html, htm)",
            path.display()
        ),
    }
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .num_workers(cli.workers)
        .image_dpi(cli.dpi)
        .model(cli.model.clone())
        .html_readability(!cli.raw_html)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;
    if cli.no_llm {
        return Ok(config);
    }

    let provider = match resolve_provider(&config) {
        Ok(provider) => provider,
        Err(e) if cli.provider.is_some() => {
            return Err(e).context("Failed to configure LLM provider");
        }
        Err(e) => {
            warn!("No LLM provider available, extracting text only: {}", e);
            return Ok(config);
        }
    };

    let mut enricher = LlmEnricher::new(provider);
    if let Some(secs) = cli.enrich_timeout {
        enricher = enricher.with_timeout(Duration::from_secs(secs));
    }

    let mut config = config;
    config.enricher = Some(Arc::new(enricher));
    Ok(config)
}
