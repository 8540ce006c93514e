//! Progress-callback trait for extraction and generation events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to follow a
//! request as pages are read and the model is queried. The CLI uses this to
//! drive its spinner; a server embedding the library could forward the events
//! to a channel or a job record.
//!
//! # Example
//!
//! ```rust
//! use pdf2cards::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_page_extracted(&self, page_num: usize, pages_to_process: usize, chars: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} read ({} chars)", page_num, pages_to_process, chars);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { pages: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::config::CardCount;
use std::sync::Arc;

/// Called by the pipeline as it works through a request.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are read one at a time, so page events arrive
/// in order.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once the document is loaded, before any page is read.
    ///
    /// # Arguments
    /// * `total_pages`: pages in the document
    /// * `pages_to_process`: pages that will be read after the page cap
    fn on_extraction_start(&self, total_pages: usize, pages_to_process: usize) {
        let _ = (total_pages, pages_to_process);
    }

    /// Called after a page's text was read.
    ///
    /// `chars` is the character count of the page text.
    fn on_page_extracted(&self, page_num: usize, pages_to_process: usize, chars: usize) {
        let _ = (page_num, pages_to_process, chars);
    }

    /// Called when a page timed out or failed and was left out.
    fn on_page_skipped(&self, page_num: usize, pages_to_process: usize, reason: &str) {
        let _ = (page_num, pages_to_process, reason);
    }

    /// Called just before the completion request is sent.
    fn on_generation_start(&self, count: CardCount) {
        let _ = count;
    }

    /// Called with the number of cards kept after normalisation.
    fn on_generation_complete(&self, cards: usize) {
        let _ = cards;
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
