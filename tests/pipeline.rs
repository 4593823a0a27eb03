//! Page pipeline properties, checked against scripted in-memory documents
//! and enrichers. No pdfium and no network needed.

use futures::future::BoxFuture;
use markitdown::pipeline::assemble::assemble_document;
use markitdown::pipeline::run::{run_concurrent, run_sequential};
use markitdown::{
    ConversionConfig, ConversionProgressCallback, EnrichError, EnrichRequest, MarkitdownError,
    PageEnricher, PageError, PageSource, PdfConverter,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// In-memory document whose text or image extraction can fail on chosen
/// pages.
struct ScriptedDocument {
    texts: Vec<String>,
    fail_text_on: HashSet<usize>,
    fail_image_on: HashSet<usize>,
    text_calls: AtomicUsize,
}

impl ScriptedDocument {
    fn new<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
            fail_text_on: HashSet::new(),
            fail_image_on: HashSet::new(),
            text_calls: AtomicUsize::new(0),
        }
    }

    fn numbered(n: usize) -> Self {
        Self::new((0..n).map(|i| format!("text {i}")))
    }

    fn failing_text_on(mut self, page: usize) -> Self {
        self.fail_text_on.insert(page);
        self
    }

    fn failing_image_on(mut self, page: usize) -> Self {
        self.fail_image_on.insert(page);
        self
    }
}

impl PageSource for ScriptedDocument {
    fn page_count(&self) -> usize {
        self.texts.len()
    }

    fn extract_text(&self, page: usize) -> BoxFuture<'_, Result<String, PageError>> {
        Box::pin(async move {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_text_on.contains(&page) {
                return Err(PageError::TextExtraction {
                    page,
                    detail: "scripted failure".into(),
                });
            }
            Ok(self.texts[page].clone())
        })
    }

    fn extract_image(&self, page: usize, dpi: u32) -> BoxFuture<'_, Result<Vec<u8>, PageError>> {
        Box::pin(async move {
            if self.fail_image_on.contains(&page) {
                return Err(PageError::ImageExtraction {
                    page,
                    detail: "scripted failure".into(),
                });
            }
            Ok(format!("png:{page}@{dpi}").into_bytes())
        })
    }
}

type Reply = Box<dyn Fn(usize, &str) -> Result<String, EnrichError> + Send + Sync>;

/// Enricher that records concurrency and answers from a script.
struct ScriptedEnricher {
    reply: Reply,
    delay: fn(usize) -> Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedEnricher {
    fn new(reply: impl Fn(usize, &str) -> Result<String, EnrichError> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            delay: |_| Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn echo() -> Self {
        Self::new(|page, text| Ok(format!("p{page}:{text}")))
    }

    fn with_delay(mut self, delay: fn(usize) -> Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl PageEnricher for ScriptedEnricher {
    fn enrich<'a>(&'a self, req: EnrichRequest<'a>) -> BoxFuture<'a, Result<String, EnrichError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = (self.delay)(req.page);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (self.reply)(req.page, req.text)
        })
    }
}

fn config(workers: usize) -> ConversionConfig {
    ConversionConfig::builder()
        .num_workers(workers)
        .build()
        .unwrap()
}

fn staggered(page: usize) -> Duration {
    Duration::from_millis(((page * 7) % 5) as u64)
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_results_follow_page_order() {
    for n in [0usize, 1, 2, 7, 25] {
        for w in [1usize, 2, 3, 8, 32] {
            let doc = Arc::new(ScriptedDocument::numbered(n));
            let enricher = Arc::new(ScriptedEnricher::echo().with_delay(staggered));

            let out = run_concurrent(doc, enricher, &config(w)).await.unwrap();

            let expected: Vec<String> = (0..n).map(|i| format!("p{i}:text {i}")).collect();
            assert_eq!(out, expected, "n={n} w={w}");
        }
    }
}

#[tokio::test]
async fn concurrent_matches_sequential_extraction() {
    let doc = Arc::new(ScriptedDocument::numbered(9));
    let sequential = run_sequential(doc.as_ref(), None).await.unwrap();

    let identity = Arc::new(ScriptedEnricher::new(|_, text| Ok(text.to_string())));
    let concurrent = run_concurrent(doc, identity, &config(4)).await.unwrap();

    assert_eq!(sequential, concurrent);
}

// ── Admission bound ──────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn in_flight_enrichments_never_exceed_workers() {
    for w in [1usize, 2, 5] {
        let doc = Arc::new(ScriptedDocument::numbered(20));
        let enricher = Arc::new(
            ScriptedEnricher::echo().with_delay(|_| Duration::from_millis(15)),
        );

        run_concurrent(doc, Arc::clone(&enricher) as Arc<dyn PageEnricher>, &config(w))
            .await
            .unwrap();

        let max = enricher.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= w, "w={w} but saw {max} concurrent calls");
        assert!(max >= 1);
        assert_eq!(enricher.calls.load(Ordering::SeqCst), 20);
    }
}

#[tokio::test]
async fn zero_workers_still_makes_progress() {
    let mut cfg = config(1);
    cfg.num_workers = 0;
    let out = run_concurrent(
        Arc::new(ScriptedDocument::numbered(3)),
        Arc::new(ScriptedEnricher::echo()),
        &cfg,
    )
    .await
    .unwrap();
    assert_eq!(out.len(), 3);
}

// ── Failure and cancellation ─────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_page_fails_the_whole_run() {
    let doc = Arc::new(ScriptedDocument::numbered(5));
    let enricher = Arc::new(ScriptedEnricher::new(|page, text| {
        if page == 3 {
            Err(EnrichError::Provider("HTTP 500".into()))
        } else {
            Ok(text.to_string())
        }
    }));

    let err = run_concurrent(doc, enricher, &config(2)).await.unwrap_err();
    assert_eq!(err.page(), 3);
    assert!(matches!(err, PageError::Enrichment { .. }));
    assert!(err.to_string().contains("page 3"));
}

#[tokio::test]
async fn extraction_failure_is_reported_with_its_page() {
    for page in 0..4 {
        let doc = Arc::new(ScriptedDocument::numbered(4).failing_text_on(page));
        let err = run_concurrent(doc, Arc::new(ScriptedEnricher::echo()), &config(2))
            .await
            .unwrap_err();
        assert_eq!(err, PageError::TextExtraction {
            page,
            detail: "scripted failure".into()
        });
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn render_failure_is_reported_with_its_page() {
    let doc = Arc::new(ScriptedDocument::numbered(6).failing_image_on(4));
    let enricher = Arc::new(ScriptedEnricher::echo());

    let err = run_concurrent(doc, Arc::clone(&enricher) as Arc<dyn PageEnricher>, &config(3))
        .await
        .unwrap_err();

    assert!(
        matches!(err, PageError::ImageExtraction { page: 4, .. }),
        "got: {err:?}"
    );
    assert!(enricher.calls.load(Ordering::SeqCst) < 6);
}

#[tokio::test]
async fn failure_stops_pending_enrichments() {
    let doc = Arc::new(ScriptedDocument::numbered(20));
    let enricher = Arc::new(
        ScriptedEnricher::new(|page, text| {
            if page == 0 {
                Err(EnrichError::Provider("boom".into()))
            } else {
                Ok(text.to_string())
            }
        })
        .with_delay(|page| {
            if page == 0 {
                Duration::ZERO
            } else {
                Duration::from_millis(50)
            }
        }),
    );

    let err = run_concurrent(
        doc,
        Arc::clone(&enricher) as Arc<dyn PageEnricher>,
        &config(1),
    )
    .await
    .unwrap_err();

    assert_eq!(err.page(), 0);
    let calls = enricher.calls.load(Ordering::SeqCst);
    assert!(calls <= 2, "expected remaining pages to be cancelled, saw {calls} calls");
}

#[tokio::test]
async fn sequential_aborts_on_first_failure() {
    let doc = ScriptedDocument::numbered(5).failing_text_on(1);
    let err = run_sequential(&doc, None).await.unwrap_err();
    assert_eq!(err.page(), 1);
    assert_eq!(doc.text_calls.load(Ordering::SeqCst), 2);
}

// ── Converter-level behaviour ────────────────────────────────────────────────

#[tokio::test]
async fn zero_pages_yield_empty_document_in_both_modes() {
    let doc = Arc::new(ScriptedDocument::numbered(0));

    let plain = PdfConverter::new(&config(3));
    assert_eq!(plain.convert_document(doc.clone()).await.unwrap(), "");

    let enriched = PdfConverter::new(
        &ConversionConfig::builder()
            .enricher(Arc::new(ScriptedEnricher::echo()))
            .build()
            .unwrap(),
    );
    assert_eq!(enriched.convert_document(doc).await.unwrap(), "");
}

#[tokio::test]
async fn text_only_pages_are_joined_with_blank_lines() {
    let converter = PdfConverter::new(&ConversionConfig::default());
    let md = converter
        .convert_document(Arc::new(ScriptedDocument::new(["A", "B", "C"])))
        .await
        .unwrap();
    assert_eq!(md, "A\n\nB\n\nC");
}

#[tokio::test]
async fn enriched_output_has_fences_stripped() {
    let enricher = ScriptedEnricher::new(|page, _| {
        Ok(if page == 0 {
            "```markdown\nHello\n```".to_string()
        } else {
            "World".to_string()
        })
    });
    let config = ConversionConfig::builder()
        .num_workers(1)
        .enricher(Arc::new(enricher))
        .build()
        .unwrap();

    let md = PdfConverter::new(&config)
        .convert_document(Arc::new(ScriptedDocument::numbered(2)))
        .await
        .unwrap();
    assert_eq!(md, "Hello\n\nWorld");
}

#[tokio::test]
async fn page_failure_surfaces_as_page_failed() {
    let config = ConversionConfig::builder()
        .num_workers(2)
        .enricher(Arc::new(ScriptedEnricher::new(|page, _| {
            if page == 3 {
                Err(EnrichError::Timeout { secs: 30 })
            } else {
                Ok("ok".into())
            }
        })))
        .build()
        .unwrap();

    let err = PdfConverter::new(&config)
        .convert_document(Arc::new(ScriptedDocument::numbered(5)))
        .await
        .unwrap_err();

    match err {
        MarkitdownError::PageFailed { page, source } => {
            assert_eq!(page, 3);
            assert!(source.to_string().contains("timed out"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn render_failure_surfaces_as_page_failed() {
    let config = ConversionConfig::builder()
        .num_workers(2)
        .enricher(Arc::new(ScriptedEnricher::echo()))
        .build()
        .unwrap();

    let err = PdfConverter::new(&config)
        .convert_document(Arc::new(ScriptedDocument::numbered(3).failing_image_on(1)))
        .await
        .unwrap_err();

    match err {
        MarkitdownError::PageFailed { page, source } => {
            assert_eq!(page, 1);
            assert!(matches!(source, PageError::ImageExtraction { page: 1, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_conversions_are_identical() {
    let config = ConversionConfig::builder()
        .num_workers(3)
        .enricher(Arc::new(ScriptedEnricher::echo().with_delay(staggered)))
        .build()
        .unwrap();
    let converter = PdfConverter::new(&config);
    let doc = Arc::new(ScriptedDocument::numbered(12));

    let first = converter.convert_document(doc.clone()).await.unwrap();
    let second = converter.convert_document(doc).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first,
        assemble_document(&(0..12).map(|i| format!("p{i}:text {i}")).collect::<Vec<_>>())
    );
}

#[tokio::test]
async fn enricher_receives_configured_request() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    struct Recording(Arc<Mutex<Vec<(usize, String, Vec<u8>, String, String)>>>);
    impl PageEnricher for Recording {
        fn enrich<'a>(
            &'a self,
            req: EnrichRequest<'a>,
        ) -> BoxFuture<'a, Result<String, EnrichError>> {
            Box::pin(async move {
                self.0.lock().unwrap().push((
                    req.page,
                    req.text.to_string(),
                    req.image.to_vec(),
                    req.model.to_string(),
                    req.prompt.to_string(),
                ));
                Ok(String::new())
            })
        }
    }

    let config = ConversionConfig::builder()
        .image_dpi(150)
        .model("vision-model")
        .prompt("custom prompt")
        .enricher(Arc::new(Recording(Arc::clone(&seen))))
        .build()
        .unwrap();

    PdfConverter::new(&config)
        .convert_document(Arc::new(ScriptedDocument::new(["only page"])))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (page, text, image, model, prompt) = &seen[0];
    assert_eq!(*page, 0);
    assert_eq!(text, "only page");
    assert_eq!(image, b"png:0@150");
    assert_eq!(model, "vision-model");
    assert_eq!(prompt, "custom prompt");
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl ConversionProgressCallback for Events {
    fn on_conversion_start(&self, total_pages: usize) {
        self.0.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_complete(&self, page: usize, _total: usize, _len: usize) {
        self.0.lock().unwrap().push(format!("done {page}"));
    }
    fn on_page_error(&self, page: usize, _total: usize, _error: &str) {
        self.0.lock().unwrap().push(format!("error {page}"));
    }
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("complete {success_count}/{total_pages}"));
    }
}

#[tokio::test]
async fn progress_reports_every_page() {
    let events = Arc::new(Events::default());
    let config = ConversionConfig::builder()
        .num_workers(2)
        .progress_callback(events.clone())
        .build()
        .unwrap();

    run_concurrent(
        Arc::new(ScriptedDocument::numbered(3)),
        Arc::new(ScriptedEnricher::echo()),
        &config,
    )
    .await
    .unwrap();

    let events = events.0.lock().unwrap();
    assert_eq!(events.first().map(String::as_str), Some("start 3"));
    assert_eq!(events.last().map(String::as_str), Some("complete 3/3"));
    for page in 0..3 {
        assert!(events.contains(&format!("done {page}")));
    }
}

#[test]
fn sequential_progress_reports_failure() {
    let events = Arc::new(Events::default());
    let cb: markitdown::ProgressCallback = events.clone();
    let doc = ScriptedDocument::numbered(3).failing_text_on(2);

    let result = tokio_test::block_on(run_sequential(&doc, Some(&cb)));
    assert!(result.is_err());

    let events = events.0.lock().unwrap();
    assert_eq!(
        *events,
        vec!["start 3", "done 0", "done 1", "error 2", "complete 2/3"]
    );
}
