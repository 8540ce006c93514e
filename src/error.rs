//! Error types for the pdf2cards library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2CardsError`]: **Fatal**: the request cannot produce flashcards at
//!   all (no upload, not a PDF, extraction failed, provider not configured,
//!   malformed model output). Returned as `Err(Pdf2CardsError)` from the
//!   [`crate::generate::FlashcardService`] entry points.
//!
//! * [`PageError`]: **Non-fatal**: a single page timed out or could not be
//!   read, but the rest of the document is fine. Pages that fail are skipped,
//!   recorded in [`crate::output::ExtractionResult::skipped_pages`], and
//!   surfaced as warnings.
//!
//! Every fatal error belongs to exactly one [`ErrorKind`], which is what the
//! HTTP layer maps to a status code.

use thiserror::Error;

/// All fatal errors returned by the pdf2cards library.
#[derive(Debug, Error)]
pub enum Pdf2CardsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required request field was absent or empty.
    #[error("{message}")]
    MissingInput { field: &'static str, message: String },

    /// `fileData` was present but is not valid base64.
    #[error("File data is not valid base64: {detail}")]
    InvalidEncoding { detail: String },

    /// The decoded upload exceeds the configured size limit.
    #[error("PDF file is too large ({size} bytes, limit {limit} bytes). Please use a smaller file or a PDF with fewer pages.")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The payload does not start with the `%PDF` signature.
    #[error("Invalid PDF file format")]
    InvalidFormat { magic: Vec<u8> },

    /// The PDF was readable but no page produced any text.
    #[error("Could not extract text from PDF")]
    NoExtractableText { pages: usize },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The PDF engine rejected the document (corrupt structure, encryption…).
    #[error("PDF text extraction failed: {detail}")]
    ExtractionFailed { detail: String },

    /// Loading the document did not finish within the load timeout.
    #[error("PDF processing timed out after {secs}s. The PDF file may be too large or complex.")]
    ExtractionTimeout { secs: u64 },

    /// The pdfium library could not be bound.
    #[error(
        "PDF processing is not available on this server: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    EngineUnavailable(String),

    // ── Provider errors ───────────────────────────────────────────────────
    /// No completion provider could be built (missing API key etc.).
    #[error("{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The request to the provider did not complete (connect, timeout, body).
    #[error("Request to provider '{provider}' failed: {detail}")]
    ProviderRequest { provider: String, detail: String },

    /// The provider answered with a non-success HTTP status.
    #[error("Provider '{provider}' returned HTTP {status}: {body}")]
    ProviderApi {
        provider: String,
        status: u16,
        body: String,
    },

    /// The provider answered successfully but with no message content.
    #[error("No response content from provider '{provider}'")]
    EmptyProviderResponse { provider: String },

    /// The model output is not an object holding a `flashcards`/`cards` array.
    #[error("Invalid response format from model: {detail}")]
    InvalidResponseShape { detail: String },

    // ── Request lifecycle ─────────────────────────────────────────────────
    /// The soft request deadline expired before the pipeline finished.
    #[error("Request timed out after {secs}s")]
    DeadlineExceeded { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure taxonomy used to pick HTTP status codes and log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed request fields. Local, never retried.
    InputValidation,
    /// Payload is not a PDF.
    FormatValidation,
    /// PDF library, load timeout, or corrupt document.
    ExtractionFailure,
    /// Completion call failed or returned an unusable shape.
    ProviderFailure,
    /// Missing credentials or invalid settings.
    ConfigurationFailure,
    /// Soft request deadline expired.
    Timeout,
    /// Anything else.
    Internal,
}

impl Pdf2CardsError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput { .. }
            | Self::InvalidEncoding { .. }
            | Self::PayloadTooLarge { .. }
            | Self::NoExtractableText { .. } => ErrorKind::InputValidation,
            Self::InvalidFormat { .. } => ErrorKind::FormatValidation,
            Self::ExtractionFailed { .. }
            | Self::ExtractionTimeout { .. }
            | Self::EngineUnavailable(_) => ErrorKind::ExtractionFailure,
            Self::ProviderRequest { .. }
            | Self::ProviderApi { .. }
            | Self::EmptyProviderResponse { .. }
            | Self::InvalidResponseShape { .. } => ErrorKind::ProviderFailure,
            Self::ProviderNotConfigured { .. } | Self::InvalidConfig(_) => {
                ErrorKind::ConfigurationFailure
            }
            Self::DeadlineExceeded { .. } => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Convenience constructor for [`Pdf2CardsError::MissingInput`].
    pub fn missing(field: &'static str, message: impl Into<String>) -> Self {
        Self::MissingInput {
            field,
            message: message.into(),
        }
    }
}

/// A non-fatal error for a single page.
///
/// The page is skipped and extraction continues with the next one.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Text extraction did not finish within the page timeout.
    #[error("Page {page}: extraction timed out after {millis}ms")]
    Timeout { page: usize, millis: u64 },

    /// The engine reported an error for this page.
    #[error("Page {page}: extraction failed: {detail}")]
    ExtractFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Timeout { page, .. } | PageError::ExtractFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_format_display_matches_api_message() {
        let e = Pdf2CardsError::InvalidFormat {
            magic: b"\x89PNG".to_vec(),
        };
        assert_eq!(e.to_string(), "Invalid PDF file format");
        assert_eq!(e.kind(), ErrorKind::FormatValidation);
    }

    #[test]
    fn missing_input_uses_message_verbatim() {
        let e = Pdf2CardsError::missing("fileData", "No file data provided");
        assert_eq!(e.to_string(), "No file data provided");
        assert_eq!(e.kind(), ErrorKind::InputValidation);
    }

    #[test]
    fn extraction_timeout_display() {
        let e = Pdf2CardsError::ExtractionTimeout { secs: 30 };
        assert!(e.to_string().contains("30s"), "got: {e}");
        assert_eq!(e.kind(), ErrorKind::ExtractionFailure);
    }

    #[test]
    fn provider_api_display() {
        let e = Pdf2CardsError::ProviderApi {
            provider: "openai".into(),
            status: 429,
            body: "rate limited".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("openai"));
        assert!(msg.contains("429"));
        assert_eq!(e.kind(), ErrorKind::ProviderFailure);
    }

    #[test]
    fn not_configured_is_configuration_failure() {
        let e = Pdf2CardsError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "OpenAI API key is not configured".into(),
        };
        assert_eq!(e.to_string(), "OpenAI API key is not configured");
        assert_eq!(e.kind(), ErrorKind::ConfigurationFailure);
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::Timeout {
            page: 7,
            millis: 10_000,
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("10000ms"));
    }
}
