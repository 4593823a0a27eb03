//! # markitdown
//!
//! Convert PDF and HTML documents, local files or URLs, to Markdown.
//!
//! HTML is converted directly: the main article is located, page chrome is
//! dropped, and the remaining tree is rendered as Markdown. PDFs go through a
//! bounded page pipeline: without an enricher each page's text layer is
//! extracted in order; with one, every page's text and a rendered image are
//! sent to a Vision Language Model concurrently, and the answers are
//! reassembled in page order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source
//!  │
//!  ├─ 1. Input     read a local file or fetch a URL, detect the file type
//!  ├─ 2. Convert   HTML via html2md, or the PDF page pipeline:
//!  │                ├─ sequential   text layer only
//!  │                └─ concurrent   text + image → VLM, at most W pages in flight
//!  ├─ 3. Clean     strip the code fence a model wraps its answer in
//!  └─ 4. Assemble  pages joined with a blank line
//! ```
//!
//! A page failure is fatal: the remaining pages are cancelled and the
//! conversion returns that page's error instead of a partial document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use markitdown::{convert, resolve_provider, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Text-only conversion: no API key needed.
//!     let config = ConversionConfig::default();
//!     println!("{}", convert("document.pdf", &config).await?);
//!
//!     // VLM-enriched: provider auto-detected from OPENAI_API_KEY etc.
//!     let provider = resolve_provider(&config)?;
//!     let config = ConversionConfig::builder()
//!         .llm_provider(provider)
//!         .num_workers(4)
//!         .build()?;
//!     println!("{}", convert("document.pdf", &config).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `markitdown` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! markitdown = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod converters;
pub mod error;
pub mod filetype;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{
    convert, convert_bytes, convert_loaded, convert_local, convert_sync, convert_to_file,
    convert_url, write_atomic,
};
pub use converters::{new_converter, DocumentConverter, HtmlConverter, PdfConverter};
pub use error::{EnrichError, MarkitdownError, PageError};
pub use filetype::FileType;
pub use pipeline::enrich::{resolve_provider, EnrichRequest, LlmEnricher, PageEnricher};
pub use pipeline::input::{load, LoadedSource};
pub use pipeline::source::{PageSource, PdfiumDocument};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
