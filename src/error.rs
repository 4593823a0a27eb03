//! Error types for the markitdown library.
//!
//! Three error types reflect three scopes of failure:
//!
//! * [`MarkitdownError`] — **Fatal**: the conversion produced no document
//!   (bad input, unsupported type, pdfium missing, provider not configured,
//!   or a page failed). Returned as `Err(MarkitdownError)` from every
//!   top-level `convert*` function.
//!
//! * [`PageError`] — **Page-scoped**: one page could not be extracted or
//!   enriched. Always carries the 0-based page index. The page pipeline never
//!   tolerates a page error: the first one observed cancels the remaining
//!   work and is surfaced as [`MarkitdownError::PageFailed`].
//!
//! * [`EnrichError`] — the enrichment adapter's own failure (provider error,
//!   timeout). Wrapped into [`PageError::Enrichment`] by the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the markitdown library.
#[derive(Debug, Error)]
pub enum MarkitdownError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but the fetch failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// No converter exists for the detected (or undetectable) file type.
    #[error("Unsupported or unknown file type: {detail}")]
    UnsupportedFileType { detail: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document could not be opened (corrupt, encrypted, not a PDF).
    #[error("Failed to open document: {detail}")]
    OpenFailed { detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    /// A page failed to extract or enrich; the whole conversion is abandoned.
    #[error("Page processing failed: {source}")]
    PageFailed {
        page: usize,
        #[source]
        source: PageError,
    },

    /// The HTML converter could not produce markdown.
    #[error("HTML conversion failed: {0}")]
    HtmlConversion(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The conversion was cancelled before any page failed.
    #[error("Conversion cancelled")]
    Cancelled,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarkitdownError {
    /// Wrap the first page failure of a pipeline run.
    ///
    /// A bare cancellation (nothing actually failed) maps to
    /// [`MarkitdownError::Cancelled`] instead.
    pub fn from_page(err: PageError) -> Self {
        match err {
            PageError::Cancelled { .. } => MarkitdownError::Cancelled,
            other => MarkitdownError::PageFailed {
                page: other.page(),
                source: other,
            },
        }
    }
}

/// A failure scoped to a single page. `page` is the 0-based page index.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Text could not be extracted from the page.
    #[error("failed to extract text from page {page}: {detail}")]
    TextExtraction { page: usize, detail: String },

    /// The page could not be rasterised / encoded.
    #[error("failed to extract image from page {page}: {detail}")]
    ImageExtraction { page: usize, detail: String },

    /// The enrichment call for the page failed.
    #[error("enrichment failed for page {page}: {detail}")]
    Enrichment { page: usize, detail: String },

    /// The page was skipped because the pipeline was cancelled.
    #[error("page {page} cancelled")]
    Cancelled { page: usize },

    /// The worker for the page panicked or never reported a result.
    #[error("worker for page {page} failed: {detail}")]
    Internal { page: usize, detail: String },
}

impl PageError {
    /// The 0-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::TextExtraction { page, .. }
            | PageError::ImageExtraction { page, .. }
            | PageError::Enrichment { page, .. }
            | PageError::Internal { page, .. }
            | PageError::Cancelled { page } => *page,
        }
    }

    /// `true` when the page did not fail on its own but was skipped.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PageError::Cancelled { .. })
    }
}

/// Errors returned by a [`crate::pipeline::enrich::PageEnricher`].
#[derive(Debug, Clone, Error)]
pub enum EnrichError {
    /// The provider returned an error (network, auth, rate limit, bad request).
    #[error("provider error: {0}")]
    Provider(String),

    /// The call did not complete within the configured timeout.
    #[error("call timed out after {secs}s")]
    Timeout { secs: u64 },
}
