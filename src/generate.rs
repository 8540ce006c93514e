//! Orchestration: chain the pipeline stages for one request.
//!
//! [`FlashcardService`] owns the two long-lived collaborators, the PDF
//! extractor (and through it the engine thread) and the completion provider.
//! It is built once per process and shared behind an `Arc` by the HTTP
//! layer and the CLI.
//!
//! ## Order of checks
//!
//! Cheap local checks run before anything expensive:
//!
//! ```text
//! fileData present? ─▶ provider configured? ─▶ decode + size ─▶ %PDF?
//!   ─▶ extract ─▶ any text? ─▶ completion call ─▶ normalise
//! ```
//!
//! so a missing key never costs a PDF parse, and a non-PDF upload never
//! costs a model call.

use crate::config::{CardCount, FlashcardPreferences, PipelineConfig};
use crate::error::Pdf2CardsError;
use crate::output::{DocumentInfo, ExtractionResult, GenerationOutput, PdfGeneration};
use crate::pipeline::engine::{PdfBackend, PdfiumBackend};
use crate::pipeline::extract::{ExtractionLimits, PdfExtractor};
use crate::pipeline::input::decode_upload;
use crate::pipeline::llm::{generate_cards, CompletionProvider, OpenAiProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Message returned when no completion provider is available.
pub const MISSING_KEY_MESSAGE: &str = "OpenAI API key is not configured";

/// Runs the upload → extract → generate pipeline.
pub struct FlashcardService {
    config: PipelineConfig,
    extractor: PdfExtractor,
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl std::fmt::Debug for FlashcardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashcardService")
            .field("config", &self.config)
            .field("pdf_engine", &self.extractor.backend().name())
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl FlashcardService {
    /// Build the service with the pdfium engine.
    ///
    /// A missing pdfium library does not fail construction; PDF requests then
    /// fail with [`Pdf2CardsError::EngineUnavailable`] and `/health` reports
    /// the engine as unavailable.
    pub fn new(config: PipelineConfig) -> Result<Self, Pdf2CardsError> {
        let backend = Arc::new(PdfiumBackend::start(config.pdfium_library_path.clone()));
        Self::with_backend(config, backend)
    }

    /// Build the service around an explicit PDF backend.
    pub fn with_backend(
        config: PipelineConfig,
        backend: Arc<dyn PdfBackend>,
    ) -> Result<Self, Pdf2CardsError> {
        let provider = resolve_provider(&config)?;
        match &provider {
            Some(p) => info!("Completion provider: {} (model {})", p.name(), p.model()),
            None => warn!("No completion provider configured; generation requests will fail"),
        }

        let extractor = PdfExtractor::new(backend, ExtractionLimits::from(&config))
            .with_progress(config.progress_callback.clone());

        Ok(Self {
            config,
            extractor,
            provider,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_provider_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// The configured provider, or [`Pdf2CardsError::ProviderNotConfigured`].
    pub fn provider(&self) -> Result<&Arc<dyn CompletionProvider>, Pdf2CardsError> {
        self.provider
            .as_ref()
            .ok_or_else(|| Pdf2CardsError::ProviderNotConfigured {
                provider: OpenAiProvider::NAME.to_string(),
                hint: MISSING_KEY_MESSAGE.to_string(),
            })
    }

    /// `Ok` when the PDF engine can open documents.
    pub fn pdf_engine_status(&self) -> Result<(), String> {
        self.extractor.backend().probe()
    }

    /// Generate cards from plain text.
    pub async fn generate_from_text(
        &self,
        text: &str,
        count: CardCount,
        prefs: &FlashcardPreferences,
    ) -> Result<GenerationOutput, Pdf2CardsError> {
        if text.trim().is_empty() {
            return Err(Pdf2CardsError::missing("text", "Text content is required"));
        }
        let provider = self.provider()?;
        self.generate(provider.as_ref(), text, count, prefs).await
    }

    /// Generate cards from a base64-encoded PDF upload.
    pub async fn generate_from_pdf(
        &self,
        file_data: &str,
        count: CardCount,
        prefs: &FlashcardPreferences,
    ) -> Result<PdfGeneration, Pdf2CardsError> {
        if file_data.trim().is_empty() {
            return Err(Pdf2CardsError::missing("fileData", "No file data provided"));
        }
        // Credentials first: no decoding or parsing without a provider.
        self.provider()?;

        let bytes = decode_upload(file_data, self.config.max_upload_bytes)?;
        self.generate_from_pdf_bytes(bytes, count, prefs).await
    }

    /// Generate cards from raw PDF bytes.
    pub async fn generate_from_pdf_bytes(
        &self,
        bytes: Vec<u8>,
        count: CardCount,
        prefs: &FlashcardPreferences,
    ) -> Result<PdfGeneration, Pdf2CardsError> {
        let start = Instant::now();
        let provider = self.provider()?;

        let extraction = self.extract_text(bytes).await?;
        if extraction.is_blank() {
            return Err(Pdf2CardsError::NoExtractableText {
                pages: extraction.page_count,
            });
        }

        let mut generation = self
            .generate(provider.as_ref(), &extraction.text, count, prefs)
            .await?;

        if !extraction.skipped_pages.is_empty() {
            let pages: Vec<String> = extraction
                .skipped_pages
                .iter()
                .map(|p| p.to_string())
                .collect();
            generation.warnings.insert(
                0,
                format!(
                    "Skipped {} page(s) that could not be read: {}",
                    pages.len(),
                    pages.join(", ")
                ),
            );
        }

        info!(
            "PDF request complete: {} pages ({} processed), {} cards, {:?}",
            extraction.page_count,
            extraction.pages_processed,
            generation.flashcards.len(),
            start.elapsed()
        );

        Ok(PdfGeneration {
            extraction,
            generation,
        })
    }

    /// Extract text from raw PDF bytes, enforcing the upload size limit.
    pub async fn extract_text(&self, bytes: Vec<u8>) -> Result<ExtractionResult, Pdf2CardsError> {
        self.check_size(bytes.len())?;
        self.extractor.extract(bytes).await
    }

    /// Page count and size, without extracting text.
    pub async fn inspect(&self, bytes: Vec<u8>) -> Result<DocumentInfo, Pdf2CardsError> {
        self.check_size(bytes.len())?;
        self.extractor.inspect(bytes).await
    }

    fn check_size(&self, size: usize) -> Result<(), Pdf2CardsError> {
        if size > self.config.max_upload_bytes {
            return Err(Pdf2CardsError::PayloadTooLarge {
                size,
                limit: self.config.max_upload_bytes,
            });
        }
        Ok(())
    }

    async fn generate(
        &self,
        provider: &dyn CompletionProvider,
        text: &str,
        count: CardCount,
        prefs: &FlashcardPreferences,
    ) -> Result<GenerationOutput, Pdf2CardsError> {
        if let Some(cb) = &self.config.progress_callback {
            cb.on_generation_start(count);
        }
        let output = generate_cards(provider, text, count, prefs, &self.config).await?;
        if let Some(cb) = &self.config.progress_callback {
            cb.on_generation_complete(output.flashcards.len());
        }
        Ok(output)
    }
}

/// Pick the completion provider.
///
/// 1. A pre-built provider from the config wins.
/// 2. Otherwise an API key (config, then `OPENAI_API_KEY`) builds an
///    [`OpenAiProvider`].
/// 3. Otherwise there is no provider; requests fail at the credential check.
fn resolve_provider(
    config: &PipelineConfig,
) -> Result<Option<Arc<dyn CompletionProvider>>, Pdf2CardsError> {
    if let Some(provider) = &config.provider {
        return Ok(Some(Arc::clone(provider)));
    }

    match config.resolved_api_key() {
        Some(key) => {
            debug!("Using OpenAI provider at {}", config.base_url);
            let provider = OpenAiProvider::new(key, config)?;
            Ok(Some(Arc::new(provider)))
        }
        None => Ok(None),
    }
}
