//! The multi-page document pipeline and its collaborators.
//!
//! Each submodule implements exactly one concern, so the pipeline core can
//! be tested against in-memory sources and enrichers without pdfium or a
//! network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──▶ (gate) ──▶ encode ──▶ enrich ──▶ postprocess ──▶ assemble
//! (bytes)   (pdfium)   (W slots)  (png/b64)  (VLM)      (fences)        ("\n\n")
//! ```
//!
//! 1. [`input`]      — read a local file or fetch a URL into memory
//! 2. [`source`]     — the [`source::PageSource`] seam; pdfium implementation
//! 3. [`gate`]       — admission gate and the shared cancellation signal
//! 4. [`encode`]     — PNG-encode rendered pages, base64-wrap for the API
//! 5. [`enrich`]     — the [`enrich::PageEnricher`] seam; VLM implementation
//! 6. [`postprocess`] — strip code fences the model wraps around its answer
//! 7. [`run`]        — sequential and bounded-concurrent page runs
//! 8. [`assemble`]   — join ordered page markdown into one document

pub mod assemble;
pub mod encode;
pub mod enrich;
pub mod gate;
pub mod input;
pub mod postprocess;
pub mod run;
pub mod source;
