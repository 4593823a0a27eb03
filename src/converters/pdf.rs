//! PDF → Markdown through the page pipeline.

use crate::config::ConversionConfig;
use crate::converters::DocumentConverter;
use crate::error::MarkitdownError;
use crate::pipeline::assemble::assemble_document;
use crate::pipeline::run::{run_concurrent, run_sequential};
use crate::pipeline::source::{PageSource, PdfiumDocument};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Converts PDFs page by page.
///
/// With an enricher configured every page is sent, text plus image, through
/// the bounded concurrent pipeline. Without one the text layer of each page
/// is extracted in order.
#[derive(Debug, Clone)]
pub struct PdfConverter {
    config: ConversionConfig,
}

impl PdfConverter {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Run the page pipeline over an already opened document.
    pub async fn convert_document(
        &self,
        source: Arc<dyn PageSource>,
    ) -> Result<String, MarkitdownError> {
        let start = Instant::now();
        let total = source.page_count();

        let pages = match self.config.enricher.clone() {
            Some(enricher) => {
                info!(
                    "Converting {} pages with enrichment ({} workers, model {}, {} dpi)",
                    total,
                    self.config.effective_workers(),
                    self.config.model,
                    self.config.image_dpi
                );
                run_concurrent(source, enricher, &self.config).await
            }
            None => {
                info!("Extracting text from {} pages", total);
                run_sequential(source.as_ref(), self.config.progress_callback.as_ref()).await
            }
        }
        .map_err(|e| {
            error!("PDF conversion failed: {}", e);
            MarkitdownError::from_page(e)
        })?;

        let markdown = assemble_document(&pages);
        info!(
            "Completed PDF conversion: {} pages, {} chars in {:?}",
            total,
            markdown.len(),
            start.elapsed()
        );
        Ok(markdown)
    }
}

impl DocumentConverter for PdfConverter {
    fn convert(&self, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, MarkitdownError>> {
        Box::pin(async move {
            let document = PdfiumDocument::open(bytes, self.config.password.clone()).await?;
            self.convert_document(Arc::new(document)).await
        })
    }
}
