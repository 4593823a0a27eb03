//! Page runs: sequential text extraction and bounded-concurrent enrichment.
//!
//! ## Concurrent run
//!
//! One tokio task is spawned per page up front. A task becomes *active* only
//! once it holds an [`AdmissionGate`] permit, so at most `num_workers` pages
//! are being extracted or enriched at any instant. Results go into slots
//! reserved per page index, which makes output order independent of
//! completion order.
//!
//! The aggregator joins tasks as they finish. The first non-cancellation
//! error it sees is kept and the shared [`CancelSignal`] is fired once;
//! tasks still waiting for a permit or for the enricher then resolve as
//! cancelled. Work that already has its answer still writes it. The run
//! always waits for every task before returning.

use crate::config::ConversionConfig;
use crate::error::PageError;
use crate::pipeline::enrich::{EnrichRequest, PageEnricher};
use crate::pipeline::gate::{cancel_pair, AdmissionGate, CancelSignal};
use crate::pipeline::postprocess::strip_fences;
use crate::pipeline::source::PageSource;
use crate::progress::ProgressCallback;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Extract the text of every page in index order, without enrichment.
///
/// Stops at the first failing page and returns its error; no partial result
/// is returned.
pub async fn run_sequential(
    source: &dyn PageSource,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<String>, PageError> {
    let total = source.page_count();
    if let Some(cb) = progress {
        cb.on_conversion_start(total);
    }

    let mut texts = Vec::with_capacity(total);
    for page in 0..total {
        if let Some(cb) = progress {
            cb.on_page_start(page, total);
        }
        match source.extract_text(page).await {
            Ok(text) => {
                if let Some(cb) = progress {
                    cb.on_page_complete(page, total, text.len());
                }
                texts.push(text);
            }
            Err(e) => {
                if let Some(cb) = progress {
                    cb.on_page_error(page, total, &e.to_string());
                    cb.on_conversion_complete(total, texts.len());
                }
                return Err(e);
            }
        }
    }

    if let Some(cb) = progress {
        cb.on_conversion_complete(total, total);
    }
    Ok(texts)
}

/// State shared by every page task of one run.
struct TaskContext {
    source: Arc<dyn PageSource>,
    enricher: Arc<dyn PageEnricher>,
    dpi: u32,
    model: String,
    prompt: String,
    progress: Option<ProgressCallback>,
    total: usize,
}

/// Pre-sized, index-addressed result storage.
struct PageSlots {
    slots: Mutex<Vec<Option<String>>>,
}

impl PageSlots {
    fn new(len: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; len]),
        }
    }

    fn write(&self, page: usize, markdown: String) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots[page] = Some(markdown);
    }

    /// Drain the slots in index order. An empty slot is reported as an
    /// internal error for that page.
    fn take_ordered(&self) -> Result<Vec<String>, PageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *slots)
            .into_iter()
            .enumerate()
            .map(|(page, slot)| {
                slot.ok_or_else(|| PageError::Internal {
                    page,
                    detail: "no result recorded".to_string(),
                })
            })
            .collect()
    }
}

/// Extract, enrich and post-process every page with at most
/// `config.effective_workers()` pages active at once.
///
/// Returns the first page failure observed, or every page's markdown in
/// index order.
pub async fn run_concurrent(
    source: Arc<dyn PageSource>,
    enricher: Arc<dyn PageEnricher>,
    config: &ConversionConfig,
) -> Result<Vec<String>, PageError> {
    let total = source.page_count();
    let workers = config.effective_workers();
    let progress = config.progress_callback.clone();
    if let Some(ref cb) = progress {
        cb.on_conversion_start(total);
    }
    debug!("Concurrent run: {} pages, {} workers", total, workers);

    let ctx = Arc::new(TaskContext {
        source,
        enricher,
        dpi: config.image_dpi,
        model: config.model.clone(),
        prompt: config.prompt().to_string(),
        progress: progress.clone(),
        total,
    });
    let slots = Arc::new(PageSlots::new(total));
    let gate = AdmissionGate::new(workers);
    let (cancel, signal) = cancel_pair();

    let mut tasks = JoinSet::new();
    let mut pages_by_task = HashMap::with_capacity(total);
    for page in 0..total {
        let ctx = Arc::clone(&ctx);
        let slots = Arc::clone(&slots);
        let gate = gate.clone();
        let signal = signal.clone();
        let handle = tasks.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = signal.cancelled() => return Err(PageError::Cancelled { page }),
                permit = gate.acquire() => permit,
            };
            if permit.is_none() {
                return Err(PageError::Cancelled { page });
            }

            let markdown = process_page(&ctx, page, &signal).await?;
            slots.write(page, markdown);
            Ok(())
        });
        pages_by_task.insert(handle.id(), page);
    }

    let mut first_error: Option<PageError> = None;
    let mut succeeded = 0usize;
    while let Some(joined) = tasks.join_next_with_id().await {
        let outcome = match joined {
            Ok((_, outcome)) => outcome,
            Err(join_err) => {
                let page = pages_by_task.get(&join_err.id()).copied().unwrap_or(0);
                Err(PageError::Internal {
                    page,
                    detail: join_err.to_string(),
                })
            }
        };

        match outcome {
            Ok(()) => succeeded += 1,
            Err(e) if e.is_cancellation() => {
                debug!("Page {} skipped after cancellation", e.page());
            }
            Err(e) => {
                if let Some(ref cb) = progress {
                    cb.on_page_error(e.page(), total, &e.to_string());
                }
                if first_error.is_none() {
                    warn!("Page {} failed, cancelling remaining pages: {}", e.page(), e);
                    cancel.cancel();
                    first_error = Some(e);
                } else {
                    debug!("Additional failure after cancellation: {}", e);
                }
            }
        }
    }

    if let Some(ref cb) = progress {
        cb.on_conversion_complete(total, succeeded);
    }

    match first_error {
        Some(e) => Err(e),
        None => slots.take_ordered(),
    }
}

/// Extract, enrich and clean one page.
async fn process_page(
    ctx: &TaskContext,
    page: usize,
    signal: &CancelSignal,
) -> Result<String, PageError> {
    if let Some(ref cb) = ctx.progress {
        cb.on_page_start(page, ctx.total);
    }

    let text = ctx.source.extract_text(page).await?;
    let image = ctx.source.extract_image(page, ctx.dpi).await?;

    let request = EnrichRequest {
        page,
        text: &text,
        image: &image,
        model: &ctx.model,
        prompt: &ctx.prompt,
    };
    let enriched = tokio::select! {
        biased;
        _ = signal.cancelled() => return Err(PageError::Cancelled { page }),
        result = ctx.enricher.enrich(request) => result,
    }
    .map_err(|e| PageError::Enrichment {
        page,
        detail: e.to_string(),
    })?;

    let markdown = strip_fences(&enriched).to_string();
    if let Some(ref cb) = ctx.progress {
        cb.on_page_complete(page, ctx.total, markdown.len());
    }
    Ok(markdown)
}
