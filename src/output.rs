//! Result types produced by the pipeline.

use serde::{Deserialize, Serialize};

/// A single question/answer card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Text pulled out of a PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Total pages in the document.
    pub page_count: usize,
    /// Pages attempted, i.e. `min(page_count, max_pages)`.
    pub pages_processed: usize,
    /// 1-indexed pages that timed out or failed and were left out.
    pub skipped_pages: Vec<usize>,
    /// Concatenated page text.
    pub text: String,
    /// Pages whose text had at least one non-whitespace character.
    #[serde(default)]
    pub text_pages: usize,
}

impl ExtractionResult {
    /// Whether the page cap cut the document short.
    pub fn truncated(&self) -> bool {
        self.pages_processed < self.page_count
    }

    /// True when no page yielded any non-whitespace text.
    ///
    /// Page separators do not count as text.
    pub fn is_blank(&self) -> bool {
        self.text_pages == 0
    }
}

/// Token accounting for one completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Cards returned by the generation client, after normalisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub flashcards: Vec<Flashcard>,
    /// Non-fatal notices: count shortfall, dropped entries, skipped pages.
    pub warnings: Vec<String>,
    pub usage: TokenUsage,
}

/// Everything produced from one PDF upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfGeneration {
    pub extraction: ExtractionResult,
    pub generation: GenerationOutput,
}

/// Basic facts about a PDF, obtained without extracting text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub size_bytes: usize,
}
