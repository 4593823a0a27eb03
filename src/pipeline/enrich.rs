//! Page enrichment: turn a page's text and image into markdown via a VLM.
//!
//! [`PageEnricher`] is the seam the pipeline calls once per page. The
//! production implementation, [`LlmEnricher`], sends a system prompt plus one
//! user message carrying the extracted text and the page PNG. Tests plug in
//! scripted enrichers instead.
//!
//! The pipeline itself imposes no deadline on enrichment. A caller that
//! wants one sets it on the enricher with [`LlmEnricher::with_timeout`].

use crate::config::ConversionConfig;
use crate::error::{EnrichError, MarkitdownError};
use crate::pipeline::encode::to_image_data;
use crate::prompts::page_content_message;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Everything an enricher needs to convert one page.
#[derive(Debug, Clone, Copy)]
pub struct EnrichRequest<'a> {
    /// 0-based page index, for logging.
    pub page: usize,
    /// Text layer of the page.
    pub text: &'a str,
    /// PNG-encoded page image.
    pub image: &'a [u8],
    pub model: &'a str,
    pub prompt: &'a str,
}

/// Converts one page into markdown.
///
/// Implementations must be callable from many tasks at once.
pub trait PageEnricher: Send + Sync {
    fn enrich<'a>(&'a self, req: EnrichRequest<'a>) -> BoxFuture<'a, Result<String, EnrichError>>;
}

/// [`PageEnricher`] backed by an `edgequake-llm` provider.
pub struct LlmEnricher {
    provider: Arc<dyn LLMProvider>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for LlmEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmEnricher")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmEnricher {
    /// Sampling temperature for every page request. Kept low so the
    /// transcription stays close to the page.
    pub const TEMPERATURE: f32 = 0.1;

    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    /// Fail a page with [`EnrichError::Timeout`] if the provider has not
    /// answered within `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the chat request for one page.
    fn messages(req: &EnrichRequest<'_>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(req.prompt),
            ChatMessage::user_with_images(
                page_content_message(req.text),
                vec![to_image_data(req.image)],
            ),
        ]
    }

    fn options() -> CompletionOptions {
        CompletionOptions {
            temperature: Some(Self::TEMPERATURE),
            ..Default::default()
        }
    }

    async fn call(&self, req: EnrichRequest<'_>) -> Result<String, EnrichError> {
        let start = Instant::now();
        let messages = Self::messages(&req);
        let options = Self::options();

        let chat = self.provider.chat(&messages, Some(&options));
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, chat)
                .await
                .map_err(|_| EnrichError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => chat.await,
        }
        .map_err(|e| EnrichError::Provider(e.to_string()))?;

        debug!(
            "Page {}: model {} → {} input tokens, {} output tokens, {:?}",
            req.page,
            req.model,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

impl PageEnricher for LlmEnricher {
    fn enrich<'a>(&'a self, req: EnrichRequest<'a>) -> BoxFuture<'a, Result<String, EnrichError>> {
        Box::pin(self.call(req))
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, MarkitdownError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        MarkitdownError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve an LLM provider, from most-specific to least-specific.
///
/// 1. `config.provider_name` with `config.model`.
/// 2. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 3. `OPENAI_API_KEY` present: OpenAI with `config.model`.
/// 4. [`ProviderFactory::from_env`] auto-detection.
pub fn resolve_provider(config: &ConversionConfig) -> Result<Arc<dyn LLMProvider>, MarkitdownError> {
    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    // With several keys configured, OpenAI wins unless asked otherwise.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", &config.model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| MarkitdownError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
