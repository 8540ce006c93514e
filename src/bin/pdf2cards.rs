//! CLI binary for pdf2cards.
//!
//! A thin shim over the library crate: maps flags to `PipelineConfig`, then
//! either serves the HTTP API or runs the pipeline once on a local file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2cards::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use pdf2cards::server::{parse_count, start_server, AppState, PdfInfo, ProcessPdfResponse};
use pdf2cards::{
    text_direction, CardCount, CardType, FlashcardPreferences, FlashcardService, PipelineConfig,
    PipelineProgressCallback, ProgressCallback, TextLength,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the PDF opens, page bar during extraction, spinner again
/// while the model works.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
            started: Instant::now(),
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize, pages_to_process: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(pages_to_process as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
        if pages_to_process < total_pages {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                dim(&format!(
                    "PDF has {total_pages} pages; reading the first {pages_to_process}"
                ))
            ));
        }
    }

    fn on_page_extracted(&self, _page_num: usize, _pages: usize, _chars: usize) {
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page_num: usize, pages: usize, reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            pages,
            red(reason)
        ));
        self.bar.inc(1);
    }

    fn on_generation_start(&self, count: CardCount) {
        self.bar.set_style(Self::spinner_style());
        self.bar.set_prefix("Generating");
        self.bar.set_message(match count {
            CardCount::Auto => "asking the model for flashcards…".to_string(),
            CardCount::Exact(n) => format!("asking the model for {n} flashcards…"),
        });
    }

    fn on_generation_complete(&self, cards: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        let mark = if skipped == 0 { green("✔") } else { cyan("⚠") };
        eprintln!(
            "{} {} flashcards in {:.1}s{}",
            mark,
            bold(&cards.to_string()),
            self.started.elapsed().as_secs_f64(),
            if skipped == 0 {
                String::new()
            } else {
                format!("  ({} pages skipped)", red(&skipped.to_string()))
            }
        );
    }
}

/// Clears the bar when `main` returns, including early `?` exits.
struct ClearBarOnDrop(Option<Arc<CliProgressCallback>>);

impl Drop for ClearBarOnDrop {
    fn drop(&mut self) {
        if let Some(cb) = &self.0 {
            if !cb.bar.is_finished() {
                cb.bar.finish_and_clear();
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the HTTP API on port 3000
  pdf2cards serve --addr 0.0.0.0:3000

  # Ten flashcards from a local PDF
  pdf2cards generate lecture.pdf

  # Let the model choose how many, short questions, detailed answers
  pdf2cards generate --count auto --front-length Short --back-length Long notes.pdf

  # Force the output language, cloze cards, JSON output
  pdf2cards generate --language French --card-type Cloze --json chapter.pdf > cards.json

  # Page count only (no API key needed)
  pdf2cards inspect lecture.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY      API key for the chat-completion endpoint
  OPENAI_BASE_URL     OpenAI-compatible endpoint (default https://api.openai.com/v1)
  PDF2CARDS_MODEL     Model ID (default gpt-4o)
  PDF2CARDS_ADDR      Listen address for `serve`
  PDFIUM_LIB_PATH     Path to libpdfium, or the directory holding it
  RUST_LOG            Log filter, overrides -v / -q
"#;

/// Turn PDF documents into study flashcards.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2cards",
    version,
    about = "Turn PDF documents into study flashcards with a chat-completion model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2CARDS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2CARDS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address.
        #[arg(long, env = "PDF2CARDS_ADDR", default_value = "0.0.0.0:3000")]
        addr: String,
    },

    /// Generate flashcards from a local PDF.
    Generate {
        /// PDF file.
        file: PathBuf,

        /// Number of cards, or "auto".
        #[arg(short, long, default_value = "10")]
        count: String,

        /// Question length: Short, Medium or Long.
        #[arg(long)]
        front_length: Option<String>,

        /// Answer length: Short, Medium or Long.
        #[arg(long)]
        back_length: Option<String>,

        /// Output language; "Auto Detect" mirrors the PDF.
        #[arg(long)]
        language: Option<String>,

        /// Card type: Basic or Cloze.
        #[arg(long)]
        card_type: Option<String>,

        /// Print the API response JSON instead of plain text.
        #[arg(long)]
        json: bool,

        /// Disable the progress bar.
        #[arg(long, env = "PDF2CARDS_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Print page count and size of a PDF.
    Inspect {
        /// PDF file.
        file: PathBuf,

        /// Print JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Completion model ID.
    #[arg(long, global = true, env = "PDF2CARDS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// API key for the completion endpoint.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, env = "PDF2CARDS_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Cap on completion tokens.
    #[arg(long, global = true, env = "PDF2CARDS_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Completion call timeout in seconds.
    #[arg(long, global = true, env = "PDF2CARDS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Pages read per PDF.
    #[arg(long, global = true, env = "PDF2CARDS_MAX_PAGES", default_value_t = 50)]
    max_pages: usize,

    /// Document load timeout in seconds.
    #[arg(long, global = true, env = "PDF2CARDS_LOAD_TIMEOUT", default_value_t = 30)]
    load_timeout: u64,

    /// Per-page extraction timeout in seconds.
    #[arg(long, global = true, env = "PDF2CARDS_PAGE_TIMEOUT", default_value_t = 10)]
    page_timeout: u64,

    /// Largest accepted upload in MiB.
    #[arg(long, global = true, env = "PDF2CARDS_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,

    /// Count used when a request has none.
    #[arg(long, global = true, env = "PDF2CARDS_DEFAULT_COUNT", default_value_t = 10)]
    default_count: usize,

    /// Soft deadline per HTTP request in seconds; 0 disables it.
    #[arg(long, global = true, env = "PDF2CARDS_REQUEST_DEADLINE", default_value_t = 50)]
    request_deadline: u64,

    /// Path to libpdfium or its directory.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Text file holding a custom system prompt.
    #[arg(long, global = true, env = "PDF2CARDS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // A progress bar replaces INFO logs for one-shot commands.
    let show_progress = matches!(
        &cli.command,
        Command::Generate { json: false, no_progress: false, .. }
    ) && !cli.quiet;
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

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let _bar_guard = ClearBarOnDrop(cli_progress.clone());
    let progress_cb: Option<ProgressCallback> =
        cli_progress.map(|cb| cb as Arc<dyn PipelineProgressCallback>);

    let config = build_config(&cli.pipeline, progress_cb).await?;

    match cli.command {
        Command::Serve { addr } => {
            let service = FlashcardService::new(config).context("Failed to start service")?;
            start_server(&addr, AppState::new(service))
                .await
                .with_context(|| format!("Server on {addr} failed"))?;
        }

        Command::Inspect { file, json } => {
            let bytes = read_pdf(&file).await?;
            let service = FlashcardService::new(config).context("Failed to start service")?;
            let info = service.inspect(bytes).await.context("Failed to inspect PDF")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialise info")?
                );
            } else {
                println!("File:   {}", file.display());
                println!("Pages:  {}", info.page_count);
                println!("Size:   {} bytes", info.size_bytes);
            }
        }

        Command::Generate {
            file,
            count,
            front_length,
            back_length,
            language,
            card_type,
            json,
            ..
        } => {
            let count = parse_count(
                Some(&serde_json::Value::String(count)),
                config.default_count,
            );
            let prefs = FlashcardPreferences {
                front_length: front_length.as_deref().map(TextLength::parse),
                back_length: back_length.as_deref().map(TextLength::parse),
                language,
                card_type: card_type.as_deref().map(CardType::parse),
            };

            let bytes = read_pdf(&file).await?;
            let service = FlashcardService::new(config).context("Failed to start service")?;
            let result = service
                .generate_from_pdf_bytes(bytes, count, &prefs)
                .await
                .context("Flashcard generation failed")?;

            let extraction = result.extraction;
            let generation = result.generation;

            if json {
                let response = ProcessPdfResponse {
                    success: true,
                    count: generation.flashcards.len(),
                    pdf_info: PdfInfo {
                        pages: extraction.page_count,
                        pages_processed: extraction.pages_processed,
                        text_length: extraction.text.chars().count(),
                        text_direction: text_direction(&extraction.text),
                        skipped_pages: extraction.skipped_pages,
                    },
                    flashcards: generation.flashcards,
                    warnings: generation.warnings,
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response).context("Failed to serialise output")?
                );
            } else {
                for (i, card) in generation.flashcards.iter().enumerate() {
                    println!("{}. {}", i + 1, bold(&card.question));
                    println!("   {}\n", card.answer);
                }
                if !cli.quiet {
                    for warning in &generation.warnings {
                        eprintln!("{} {}", cyan("⚠"), warning);
                    }
                    eprintln!(
                        "   {} tokens in  /  {} tokens out",
                        dim(&generation.usage.prompt_tokens.to_string()),
                        dim(&generation.usage.completion_tokens.to_string()),
                    );
                }
            }
        }
    }

    Ok(())
}

async fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(
    args: &PipelineArgs,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .model(&args.model)
        .base_url(&args.base_url)
        .temperature(args.temperature)
        .api_timeout_secs(args.api_timeout)
        .max_pages(args.max_pages)
        .load_timeout_secs(args.load_timeout)
        .page_timeout_secs(args.page_timeout)
        .max_upload_mb(args.max_upload_mb)
        .default_count(args.default_count)
        .request_deadline(
            (args.request_deadline > 0).then(|| Duration::from_secs(args.request_deadline)),
        );

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref path) = args.pdfium_lib_path {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
