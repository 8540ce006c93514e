//! PDF text extraction: bytes in, page-bounded text out.
//!
//! ## Limits
//!
//! Three limits keep a hostile or huge upload from holding a request
//! forever:
//!
//! * only the first `max_pages` pages are read; the rest are ignored
//!   without error,
//! * loading the document must finish within `load_timeout`, or the whole
//!   extraction fails with [`Pdf2CardsError::ExtractionTimeout`],
//! * each page must finish within `page_timeout`, or that page is skipped
//!   and extraction moves on.
//!
//! Engine calls block, so each one runs in `spawn_blocking` and the timeout
//! is applied to the join handle. The page clock starts when the backend
//! reports it has begun on the page: a page that overran keeps the engine
//! busy, and the pages queued behind it wait (up to `load_timeout`) without
//! spending their own budget.
//!
//! ## Text layout
//!
//! Every page that yields text contributes `text + "\n"`. Every page except
//! the last one processed is then followed by `"\n---\n"`. Skipped pages
//! contribute nothing.

use crate::config::PipelineConfig;
use crate::error::{PageError, Pdf2CardsError};
use crate::output::{DocumentInfo, ExtractionResult};
use crate::pipeline::engine::{LoadedPdf, PdfBackend};
use crate::pipeline::input::ensure_pdf;
use crate::progress::ProgressCallback;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Separator inserted after every processed page but the last.
pub const PAGE_SEPARATOR: &str = "\n---\n";

/// Page cap and timeouts applied to one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    pub max_pages: usize,
    pub load_timeout: Duration,
    pub page_timeout: Duration,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for ExtractionLimits {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            load_timeout: config.load_timeout,
            page_timeout: config.page_timeout,
        }
    }
}

/// Reads text out of PDF uploads through a [`PdfBackend`].
#[derive(Clone)]
pub struct PdfExtractor {
    backend: Arc<dyn PdfBackend>,
    limits: ExtractionLimits,
    progress: Option<ProgressCallback>,
}

impl PdfExtractor {
    pub fn new(backend: Arc<dyn PdfBackend>, limits: ExtractionLimits) -> Self {
        Self {
            backend,
            limits,
            progress: None,
        }
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn backend(&self) -> &Arc<dyn PdfBackend> {
        &self.backend
    }

    pub fn limits(&self) -> ExtractionLimits {
        self.limits
    }

    /// Extract the text of up to `max_pages` pages.
    ///
    /// Fails fast with [`Pdf2CardsError::InvalidFormat`] when `bytes` does not
    /// start with `%PDF`; the backend is never called in that case.
    pub async fn extract(&self, bytes: Vec<u8>) -> Result<ExtractionResult, Pdf2CardsError> {
        ensure_pdf(&bytes)?;

        let document = self.load(bytes).await?;
        let page_count = document.page_count();
        let pages_processed = page_count.min(self.limits.max_pages);

        info!(
            "PDF loaded via {}: {} pages, processing {}",
            self.backend.name(),
            page_count,
            pages_processed
        );
        if let Some(cb) = &self.progress {
            cb.on_extraction_start(page_count, pages_processed);
        }

        let mut text = String::new();
        let mut skipped_pages = Vec::new();
        let mut text_pages = 0;

        for index in 0..pages_processed {
            let page_num = index + 1;
            match self.read_page(&document, index).await {
                Ok(page_text) => {
                    debug!("Page {}: {} chars", page_num, page_text.chars().count());
                    if let Some(cb) = &self.progress {
                        cb.on_page_extracted(page_num, pages_processed, page_text.chars().count());
                    }
                    if !page_text.trim().is_empty() {
                        text_pages += 1;
                    }
                    text.push_str(&page_text);
                    text.push('\n');
                    if page_num < pages_processed {
                        text.push_str(PAGE_SEPARATOR);
                    }
                }
                Err(e) => {
                    warn!("{} (skipped)", e);
                    if let Some(cb) = &self.progress {
                        cb.on_page_skipped(page_num, pages_processed, &e.to_string());
                    }
                    skipped_pages.push(e.page());
                }
            }
        }

        Ok(ExtractionResult {
            page_count,
            pages_processed,
            skipped_pages,
            text,
            text_pages,
        })
    }

    /// Page count and size of a PDF, without reading any page text.
    pub async fn inspect(&self, bytes: Vec<u8>) -> Result<DocumentInfo, Pdf2CardsError> {
        ensure_pdf(&bytes)?;
        let size_bytes = bytes.len();
        let document = self.load(bytes).await?;
        Ok(DocumentInfo {
            page_count: document.page_count(),
            size_bytes,
        })
    }

    async fn load(&self, bytes: Vec<u8>) -> Result<Arc<dyn LoadedPdf>, Pdf2CardsError> {
        let backend = Arc::clone(&self.backend);
        let task = tokio::task::spawn_blocking(move || backend.open(bytes));

        let joined = tokio::time::timeout(self.limits.load_timeout, task)
            .await
            .map_err(|_| Pdf2CardsError::ExtractionTimeout {
                secs: self.limits.load_timeout.as_secs(),
            })?;
        let document = joined
            .map_err(|e| Pdf2CardsError::Internal(format!("PDF load task panicked: {e}")))??;

        Ok(Arc::from(document))
    }

    async fn read_page(
        &self,
        document: &Arc<dyn LoadedPdf>,
        index: usize,
    ) -> Result<String, PageError> {
        let page = index + 1;
        let doc = Arc::clone(document);
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let task = tokio::task::spawn_blocking(move || {
            let mut started_tx = Some(started_tx);
            doc.page_text_with_start(index, &mut || {
                if let Some(tx) = started_tx.take() {
                    let _ = tx.send(());
                }
            })
        });

        // Waiting behind an earlier page is bounded by the load timeout.
        // A closed channel means the backend gave up before starting; the
        // join below then returns at once.
        if tokio::time::timeout(self.limits.load_timeout, started_rx)
            .await
            .is_err()
        {
            return Err(PageError::Timeout {
                page,
                millis: self.limits.load_timeout.as_millis() as u64,
            });
        }

        match tokio::time::timeout(self.limits.page_timeout, task).await {
            Ok(Ok(Ok(text))) => Ok(text),
            Ok(Ok(Err(detail))) => Err(PageError::ExtractFailed { page, detail }),
            Ok(Err(join)) => Err(PageError::ExtractFailed {
                page,
                detail: format!("page task panicked: {join}"),
            }),
            Err(_) => Err(PageError::Timeout {
                page,
                millis: self.limits.page_timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory backend: `pages[i]` is the text of page `i + 1`.
    pub(crate) struct FakeBackend {
        pub pages: Vec<String>,
        pub slow_pages: Vec<usize>,
        pub failing_pages: Vec<usize>,
        pub open_delay: Option<Duration>,
        pub opens: AtomicUsize,
        /// Run pages one at a time, like the pdfium engine thread.
        pub serial: bool,
    }

    impl FakeBackend {
        pub fn with_pages(pages: Vec<String>) -> Self {
            Self {
                pages,
                slow_pages: Vec::new(),
                failing_pages: Vec::new(),
                open_delay: None,
                opens: AtomicUsize::new(0),
                serial: false,
            }
        }
    }

    struct FakeDocument {
        pages: Vec<String>,
        slow_pages: Vec<usize>,
        failing_pages: Vec<usize>,
        engine: Option<Mutex<()>>,
    }

    impl PdfBackend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }

        fn open(&self, _bytes: Vec<u8>) -> Result<Box<dyn LoadedPdf>, Pdf2CardsError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.open_delay {
                std::thread::sleep(delay);
            }
            Ok(Box::new(FakeDocument {
                pages: self.pages.clone(),
                slow_pages: self.slow_pages.clone(),
                failing_pages: self.failing_pages.clone(),
                engine: self.serial.then(|| Mutex::new(())),
            }))
        }
    }

    impl LoadedPdf for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, index: usize) -> Result<String, String> {
            if self.slow_pages.contains(&index) {
                std::thread::sleep(Duration::from_millis(500));
            }
            if self.failing_pages.contains(&index) {
                return Err("broken content stream".into());
            }
            self.pages
                .get(index)
                .cloned()
                .ok_or_else(|| format!("no page {index}"))
        }

        fn page_text_with_start(
            &self,
            index: usize,
            on_start: &mut dyn FnMut(),
        ) -> Result<String, String> {
            let _busy = self
                .engine
                .as_ref()
                .map(|engine| engine.lock().unwrap_or_else(|e| e.into_inner()));
            on_start();
            self.page_text(index)
        }
    }

    fn pages(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("page {i}")).collect()
    }

    fn extractor(backend: FakeBackend, limits: ExtractionLimits) -> PdfExtractor {
        PdfExtractor::new(Arc::new(backend), limits)
    }

    fn fast_limits() -> ExtractionLimits {
        ExtractionLimits {
            max_pages: 50,
            load_timeout: Duration::from_secs(5),
            page_timeout: Duration::from_millis(200),
        }
    }

    const PDF: &[u8] = b"%PDF-1.4 fake";

    #[tokio::test]
    async fn joins_pages_with_separator() {
        let ex = extractor(
            FakeBackend::with_pages(vec!["alpha".into(), "beta".into(), "gamma".into()]),
            fast_limits(),
        );
        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert_eq!(result.text, "alpha\n\n---\nbeta\n\n---\ngamma\n");
        assert_eq!(result.page_count, 3);
        assert_eq!(result.pages_processed, 3);
        assert!(result.skipped_pages.is_empty());
    }

    #[tokio::test]
    async fn caps_at_max_pages() {
        let ex = extractor(FakeBackend::with_pages(pages(60)), fast_limits());
        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert_eq!(result.page_count, 60);
        assert_eq!(result.pages_processed, 50);
        assert!(result.truncated());
        assert!(result.text.contains("page 50\n"));
        assert!(!result.text.contains("page 51"));
        assert!(!result.text.ends_with(PAGE_SEPARATOR));
    }

    #[tokio::test]
    async fn slow_page_is_skipped_and_rest_extracted() {
        let mut backend = FakeBackend::with_pages(pages(4));
        backend.slow_pages = vec![1];
        let ex = extractor(backend, fast_limits());

        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert_eq!(result.skipped_pages, vec![2]);
        assert!(result.text.contains("page 1"));
        assert!(!result.text.contains("page 2"));
        assert!(result.text.contains("page 3"));
        assert!(result.text.contains("page 4"));
    }

    #[tokio::test]
    async fn failing_page_is_skipped() {
        let mut backend = FakeBackend::with_pages(pages(3));
        backend.failing_pages = vec![2];
        let ex = extractor(backend, fast_limits());

        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert_eq!(result.skipped_pages, vec![3]);
        // Last processed page failed, so the separator after page 2 stays.
        assert_eq!(result.text, "page 1\n\n---\npage 2\n\n---\n");
    }

    #[tokio::test]
    async fn load_timeout_fails_whole_extraction() {
        let mut backend = FakeBackend::with_pages(pages(1));
        backend.open_delay = Some(Duration::from_millis(500));
        let limits = ExtractionLimits {
            load_timeout: Duration::from_millis(50),
            ..fast_limits()
        };
        let err = extractor(backend, limits)
            .extract(PDF.to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2CardsError::ExtractionTimeout { .. }));
    }

    #[tokio::test]
    async fn non_pdf_never_reaches_backend() {
        let backend = Arc::new(FakeBackend::with_pages(pages(1)));
        let ex = PdfExtractor::new(backend.clone(), fast_limits());
        let err = ex.extract(b"\x89PNG\r\n\x1a\n".to_vec()).await.unwrap_err();
        assert!(matches!(err, Pdf2CardsError::InvalidFormat { .. }));
        assert_eq!(backend.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_pages_yield_blank_result() {
        let ex = extractor(
            FakeBackend::with_pages(vec!["   ".into(), String::new()]),
            fast_limits(),
        );
        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert!(result.is_blank());
    }

    #[tokio::test]
    async fn blank_middle_page_keeps_result_non_blank() {
        let ex = extractor(
            FakeBackend::with_pages(vec!["alpha".into(), "  ".into(), "gamma".into()]),
            fast_limits(),
        );
        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert!(!result.is_blank());
        assert_eq!(result.text_pages, 2);
        assert!(result.text.contains("alpha"));
        assert!(result.text.contains("gamma"));
    }

    #[tokio::test]
    async fn separators_alone_are_blank() {
        let ex = extractor(
            FakeBackend::with_pages(vec![String::new(), "  ".into(), String::new()]),
            fast_limits(),
        );
        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert!(result.text.contains(PAGE_SEPARATOR.trim()));
        assert_eq!(result.text_pages, 0);
        assert!(result.is_blank());
    }

    #[tokio::test]
    async fn queued_pages_do_not_inherit_slow_page_time() {
        let mut backend = FakeBackend::with_pages(pages(4));
        backend.slow_pages = vec![1];
        backend.serial = true;
        let ex = extractor(backend, fast_limits());

        let result = ex.extract(PDF.to_vec()).await.unwrap();
        assert_eq!(result.skipped_pages, vec![2]);
        assert!(result.text.contains("page 1"));
        assert!(result.text.contains("page 3"));
        assert!(result.text.contains("page 4"));
    }

    #[tokio::test]
    async fn inspect_reports_pages_and_size() {
        let ex = extractor(FakeBackend::with_pages(pages(7)), fast_limits());
        let info = ex.inspect(PDF.to_vec()).await.unwrap();
        assert_eq!(info.page_count, 7);
        assert_eq!(info.size_bytes, PDF.len());
    }
}
