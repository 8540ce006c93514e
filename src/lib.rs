//! # pdf2cards
//!
//! Turn PDF documents into study flashcards with a chat-completion model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (base64 JSON field)
//!  │
//!  ├─ 1. Input      decode, enforce the size limit, check the %PDF signature
//!  ├─ 2. Extract    page text via pdfium (engine thread, per-page timeouts)
//!  ├─ 3. Prompt     count + length/language/type preferences + text
//!  ├─ 4. Generate   one JSON-mode chat completion (gpt-4o by default)
//!  ├─ 5. Normalise  accept `flashcards` or `cards`, truncate to the count
//!  └─ 6. Respond    cards + pdfInfo + warnings
//! ```
//!
//! The same pipeline backs the HTTP API ([`server::build_router`]) and the
//! `pdf2cards` CLI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2cards::{CardCount, FlashcardPreferences, FlashcardService, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from OPENAI_API_KEY when not set on the builder.
//!     let service = FlashcardService::new(PipelineConfig::default())?;
//!     let pdf = std::fs::read("lecture.pdf")?;
//!     let out = service
//!         .generate_from_pdf_bytes(pdf, CardCount::Exact(10), &FlashcardPreferences::default())
//!         .await?;
//!     for card in &out.generation.flashcards {
//!         println!("Q: {}\nA: {}\n", card.question, card.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Serving the API
//!
//! ```rust,no_run
//! use pdf2cards::server::{start_server, AppState};
//! use pdf2cards::{FlashcardService, PipelineConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FlashcardService::new(PipelineConfig::default())?;
//! start_server("0.0.0.0:3000", AppState::new(service)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2cards` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2cards = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDF engine
//!
//! Text extraction uses the pdfium shared library, bound at runtime. Point
//! `PDFIUM_LIB_PATH` at `libpdfium` (or its directory), or place it in the
//! working directory or a system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CardCount, CardType, FlashcardPreferences, PipelineConfig, PipelineConfigBuilder, TextLength,
};
pub use error::{ErrorKind, PageError, Pdf2CardsError};
pub use generate::FlashcardService;
pub use language::{is_arabic, is_rtl, text_direction, TextDirection};
pub use output::{
    DocumentInfo, ExtractionResult, Flashcard, GenerationOutput, PdfGeneration, TokenUsage,
};
pub use pipeline::engine::{LoadedPdf, PdfBackend, PdfiumBackend};
pub use pipeline::input::is_pdf;
pub use pipeline::llm::{CompletionProvider, CompletionRequest, CompletionResponse, OpenAiProvider};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
