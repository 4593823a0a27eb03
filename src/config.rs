//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct carries every knob so a
//! config can be shared across page tasks behind an `Arc` and printed in full
//! when a run needs to be diagnosed.

use crate::error::MarkitdownError;
use crate::pipeline::enrich::{LlmEnricher, PageEnricher};
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::LLMProvider;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;

/// Default model identifier handed to the enricher.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default number of concurrent page workers.
pub const DEFAULT_NUM_WORKERS: usize = 10;

/// Default rasterisation resolution for page images.
pub const DEFAULT_IMAGE_DPI: u32 = 300;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use markitdown::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .num_workers(4)
///     .image_dpi(200)
///     .model("gpt-4o")
///     .build()
///     .unwrap();
/// assert!(!config.enrichment_enabled());
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Maximum number of pages processed concurrently. Default: 10.
    ///
    /// Each active page holds one in-flight enrichment call, so this is also
    /// the cap on simultaneous LLM requests. Lower it if the provider answers
    /// with `429`. Values below 1 are treated as 1.
    pub num_workers: usize,

    /// Resolution used when rasterising a page for the enricher. Default: 300.
    pub image_dpi: u32,

    /// Model identifier passed to the enricher. Default: `gpt-4o-mini`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama") used by
    /// [`crate::pipeline::enrich::resolve_provider`].
    pub provider_name: Option<String>,

    /// Custom system prompt. If None, uses the built-in default.
    pub prompt: Option<String>,

    /// Page enricher. Enrichment runs iff this is set.
    pub enricher: Option<Arc<dyn PageEnricher>>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Extract the main article before converting HTML. Default: true.
    pub html_readability: bool,

    /// Host used to absolutise relative links in HTML, as `https://{host}/`.
    pub html_host: Option<String>,

    /// Full base URL for relative links in HTML. Set from the fetched URL
    /// for URL inputs; takes precedence over `html_host`.
    pub html_base_url: Option<Url>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-page events while the pipeline runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
            image_dpi: DEFAULT_IMAGE_DPI,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            prompt: None,
            enricher: None,
            password: None,
            html_readability: true,
            html_host: None,
            html_base_url: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("num_workers", &self.num_workers)
            .field("image_dpi", &self.image_dpi)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("enricher", &self.enricher.as_ref().map(|_| "<dyn PageEnricher>"))
            .field("html_readability", &self.html_readability)
            .field("html_host", &self.html_host)
            .field("html_base_url", &self.html_base_url.as_ref().map(Url::as_str))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The system prompt sent with every page.
    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Worker count with the minimum of one enforced.
    pub fn effective_workers(&self) -> usize {
        self.num_workers.max(1)
    }

    /// `true` when an enricher is configured.
    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_some()
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConversionConfigBuilder")
            .field(&self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn num_workers(mut self, n: usize) -> Self {
        self.config.num_workers = n.max(1);
        self
    }

    pub fn image_dpi(mut self, dpi: u32) -> Self {
        self.config.image_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    /// Enable enrichment with a custom enricher.
    pub fn enricher(mut self, enricher: Arc<dyn PageEnricher>) -> Self {
        self.config.enricher = Some(enricher);
        self
    }

    /// Enable enrichment through a pre-built LLM provider (no call timeout).
    pub fn llm_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.enricher = Some(Arc::new(LlmEnricher::new(provider)));
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn html_readability(mut self, v: bool) -> Self {
        self.config.html_readability = v;
        self
    }

    pub fn html_host(mut self, host: impl Into<String>) -> Self {
        self.config.html_host = Some(host.into());
        self
    }

    pub fn html_base_url(mut self, url: Url) -> Self {
        self.config.html_base_url = Some(url);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, MarkitdownError> {
        if self.config.model.trim().is_empty() {
            return Err(MarkitdownError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
