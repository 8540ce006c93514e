//! Configuration types for PDF-to-flashcard generation.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The extraction limits and timeouts that
//! guard against unbounded resource use live here as tunables rather than
//! literals scattered through the pipeline.
//!
//! The per-request knobs a user picks in the upload dialog (card count,
//! text lengths, language, card type) are modelled by [`CardCount`] and
//! [`FlashcardPreferences`].

use crate::error::Pdf2CardsError;
use crate::pipeline::llm::CompletionProvider;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

/// Default chat-completion endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for the flashcard pipeline.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2cards::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig::builder()
///     .max_pages(20)
///     .page_timeout(Duration::from_secs(5))
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, 20);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum number of pages whose text is extracted. Default: 50.
    ///
    /// Pages past the cap are ignored without error; the page count reported
    /// to the caller is still the full document length.
    pub max_pages: usize,

    /// Timeout for loading the whole document. Default: 30 s.
    pub load_timeout: Duration,

    /// Timeout for extracting the text of one page. Default: 10 s.
    ///
    /// A page that exceeds it is skipped and extraction moves on.
    pub page_timeout: Duration,

    /// Largest accepted decoded upload, in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Card count used when the request carries no usable count. Default: 10.
    pub default_count: usize,

    /// Range the model is asked to pick from in auto-count mode. Default: 5..=50.
    pub auto_count_range: RangeInclusive<usize>,

    /// Completion model identifier. Default: `gpt-4o`.
    pub model: String,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Optional cap on completion tokens. Default: provider default.
    pub max_tokens: Option<usize>,

    /// API key for the completion endpoint. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of the chat-completion API. Default: OpenAI.
    pub base_url: String,

    /// HTTP timeout for one completion call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Soft deadline for a whole HTTP request. Default: 50 s. `None` disables it.
    pub request_deadline: Option<Duration>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Explicit path to the pdfium shared library.
    pub pdfium_library_path: Option<std::path::PathBuf>,

    /// Pre-constructed completion provider. Takes precedence over `api_key`.
    pub provider: Option<Arc<dyn CompletionProvider>>,

    /// Receives extraction and generation events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            load_timeout: Duration::from_secs(30),
            page_timeout: Duration::from_secs(10),
            max_upload_bytes: 50 * 1024 * 1024,
            default_count: 10,
            auto_count_range: 5..=50,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: None,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_timeout_secs: 60,
            request_deadline: Some(Duration::from_secs(50)),
            system_prompt: None,
            pdfium_library_path: None,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("max_pages", &self.max_pages)
            .field("load_timeout", &self.load_timeout)
            .field("page_timeout", &self.page_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("default_count", &self.default_count)
            .field("auto_count_range", &self.auto_count_range)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("request_deadline", &self.request_deadline)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API key to use: the configured one, else `OPENAI_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PipelineConfigBuilder")
            .field(&self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.config.load_timeout = timeout;
        self
    }

    pub fn load_timeout_secs(self, secs: u64) -> Self {
        self.load_timeout(Duration::from_secs(secs))
    }

    pub fn page_timeout(mut self, timeout: Duration) -> Self {
        self.config.page_timeout = timeout;
        self
    }

    pub fn page_timeout_secs(self, secs: u64) -> Self {
        self.page_timeout(Duration::from_secs(secs))
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn max_upload_mb(self, mb: usize) -> Self {
        self.max_upload_bytes(mb.saturating_mul(1024 * 1024))
    }

    pub fn default_count(mut self, n: usize) -> Self {
        self.config.default_count = n;
        self
    }

    pub fn auto_count_range(mut self, range: RangeInclusive<usize>) -> Self {
        self.config.auto_count_range = range;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn request_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.config.request_deadline = deadline;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Pdf2CardsError> {
        let c = &self.config;
        if c.max_pages == 0 {
            return Err(Pdf2CardsError::InvalidConfig(
                "max_pages must be ≥ 1".into(),
            ));
        }
        if c.load_timeout.is_zero() || c.page_timeout.is_zero() {
            return Err(Pdf2CardsError::InvalidConfig(
                "extraction timeouts must be non-zero".into(),
            ));
        }
        if c.default_count == 0 {
            return Err(Pdf2CardsError::InvalidConfig(
                "default_count must be ≥ 1".into(),
            ));
        }
        if c.auto_count_range.is_empty() || *c.auto_count_range.start() == 0 {
            return Err(Pdf2CardsError::InvalidConfig(format!(
                "auto_count_range must be a non-empty range starting at ≥ 1, got {:?}",
                c.auto_count_range
            )));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Pdf2CardsError::InvalidConfig(format!(
                "base_url must be an HTTP(S) URL, got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Request-level choices ────────────────────────────────────────────────

/// How many cards to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardCount {
    /// Let the model pick a count inside the configured auto range.
    Auto,
    /// Ask for exactly this many; extra cards are cut off.
    Exact(usize),
}

impl CardCount {
    /// The exact target, or `None` in auto mode.
    pub fn target(&self) -> Option<usize> {
        match self {
            CardCount::Auto => None,
            CardCount::Exact(n) => Some(*n),
        }
    }
}

impl fmt::Display for CardCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardCount::Auto => f.write_str("auto"),
            CardCount::Exact(n) => write!(f, "{n}"),
        }
    }
}

/// Length hint for one side of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextLength {
    Short,
    Medium,
    Long,
    /// Any other value. Gets the per-side default guidance.
    Other(String),
}

impl TextLength {
    /// Map a user-supplied label. Matching is exact, as sent by the upload form.
    pub fn parse(value: &str) -> Self {
        match value {
            "Short" => TextLength::Short,
            "Medium" => TextLength::Medium,
            "Long" => TextLength::Long,
            other => TextLength::Other(other.to_string()),
        }
    }
}

/// Flashcard style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardType {
    /// Plain question/answer cards.
    Basic,
    /// Cloze deletions (`{{c1::…}}`) where appropriate.
    Cloze,
    /// Unrecognised label, treated like `Basic`.
    Other(String),
}

impl CardType {
    pub fn parse(value: &str) -> Self {
        match value {
            "Cloze" => CardType::Cloze,
            "Basic" | "Q&A" | "Question & Answer" => CardType::Basic,
            other => CardType::Other(other.to_string()),
        }
    }
}

/// Language label meaning "mirror the input language".
pub const AUTO_DETECT_LANGUAGE: &str = "Auto Detect";

/// Per-request generation preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardPreferences {
    /// Length of the question side.
    pub front_length: Option<TextLength>,
    /// Length of the answer side.
    pub back_length: Option<TextLength>,
    /// Output language. `None`, empty or "Auto Detect" mirrors the input.
    pub language: Option<String>,
    /// Card style.
    pub card_type: Option<CardType>,
}

impl FlashcardPreferences {
    /// The explicit output language, if one was chosen.
    pub fn explicit_language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != AUTO_DETECT_LANGUAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let c = PipelineConfig::default();
        assert_eq!(c.max_pages, 50);
        assert_eq!(c.load_timeout, Duration::from_secs(30));
        assert_eq!(c.page_timeout, Duration::from_secs(10));
        assert_eq!(c.default_count, 10);
        assert_eq!(c.auto_count_range, 5..=50);
        assert_eq!(c.request_deadline, Some(Duration::from_secs(50)));
        assert_eq!(c.model, "gpt-4o");
    }

    #[test]
    fn builder_rejects_zero_pages() {
        let err = PipelineConfig::builder().max_pages(0).build().unwrap_err();
        assert!(matches!(err, Pdf2CardsError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_auto_range() {
        #[allow(clippy::reversed_empty_ranges)]
        let err = PipelineConfig::builder()
            .auto_count_range(10..=5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("auto_count_range"));
    }

    #[test]
    fn builder_trims_base_url_and_clamps_temperature() {
        let c = PipelineConfig::builder()
            .base_url("http://localhost:9999/v1/")
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://localhost:9999/v1");
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = PipelineConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn text_length_parse_is_exact() {
        assert_eq!(TextLength::parse("Short"), TextLength::Short);
        assert_eq!(TextLength::parse("Long"), TextLength::Long);
        assert_eq!(
            TextLength::parse("short"),
            TextLength::Other("short".to_string())
        );
    }

    #[test]
    fn explicit_language_ignores_auto_detect() {
        let mut prefs = FlashcardPreferences::default();
        assert_eq!(prefs.explicit_language(), None);
        prefs.language = Some("Auto Detect".into());
        assert_eq!(prefs.explicit_language(), None);
        prefs.language = Some("  ".into());
        assert_eq!(prefs.explicit_language(), None);
        prefs.language = Some("Arabic".into());
        assert_eq!(prefs.explicit_language(), Some("Arabic"));
    }

    #[test]
    fn card_count_display() {
        assert_eq!(CardCount::Auto.to_string(), "auto");
        assert_eq!(CardCount::Exact(12).to_string(), "12");
        assert_eq!(CardCount::Exact(12).target(), Some(12));
        assert_eq!(CardCount::Auto.target(), None);
    }
}
