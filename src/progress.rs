//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the page pipeline works through a document. The CLI renders
//! them as a progress bar; library users can forward them to a channel, a
//! metrics sink, or their own logs.
//!
//! # Example
//!
//! ```rust
//! use markitdown::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page: usize, total_pages: usize, markdown_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {}/{} done ({} bytes)", page + 1, total_pages, markdown_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the page pipeline as it processes each page.
///
/// All methods have default no-op implementations. Page numbers are 0-based
/// page indices.
///
/// # Thread safety
///
/// In enrichment mode `on_page_start`, `on_page_complete` and `on_page_error`
/// are called concurrently from different worker tasks.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any page is processed.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page has been admitted and work on it begins.
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page has produced its markdown.
    fn on_page_complete(&self, page: usize, total_pages: usize, markdown_len: usize) {
        let _ = (page, total_pages, markdown_len);
    }

    /// Called when a page fails. Pages skipped because of cancellation are
    /// not reported.
    fn on_page_error(&self, page: usize, total_pages: usize, error: &str) {
        let _ = (page, total_pages, error);
    }

    /// Called once after the pipeline has finished, successfully or not.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
