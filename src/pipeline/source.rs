//! Page sources: per-page text and image extraction.
//!
//! [`PageSource`] is the seam between the page pipeline and whatever renders
//! the document. The pipeline only ever asks for a page count, the text of a
//! page, and a PNG of a page at some resolution.
//!
//! ## The pdfium thread
//!
//! pdfium keeps global state and must never be entered from two threads at
//! once. The library is bound once per process, on first use, by a
//! dedicated `pdfium` thread that also owns every open document.
//! [`PdfiumDocument`] is a handle: it sends page requests to that thread
//! and awaits the replies. Each document is parsed once, when opened, and
//! released when its handle is dropped. Rendered pages come back as images
//! and are PNG-encoded on the blocking pool, off the pdfium thread.

use crate::error::{MarkitdownError, PageError};
use crate::pipeline::encode;
use futures::future::BoxFuture;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// A multi-page document the pipeline can read page by page.
///
/// Page indices are 0-based and always `< page_count()`.
pub trait PageSource: Send + Sync {
    /// Number of pages, fixed once the document is open.
    fn page_count(&self) -> usize;

    /// Extract the text layer of one page.
    fn extract_text(&self, page: usize) -> BoxFuture<'_, Result<String, PageError>>;

    /// Rasterise one page at `dpi` and return it PNG-encoded.
    fn extract_image(&self, page: usize, dpi: u32) -> BoxFuture<'_, Result<Vec<u8>, PageError>>;
}

/// Bind to a pdfium library.
///
/// Search order: `PDFIUM_LIB_PATH`, the working directory, the system
/// library path.
pub fn bind_pdfium() -> Result<Pdfium, MarkitdownError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| MarkitdownError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

type Reply<T> = oneshot::Sender<Result<T, String>>;

/// Work for the pdfium thread.
enum Command {
    Open {
        id: u64,
        bytes: Vec<u8>,
        password: Option<String>,
        reply: oneshot::Sender<Result<usize, MarkitdownError>>,
    },
    Text {
        id: u64,
        page: usize,
        reply: Reply<String>,
    },
    Render {
        id: u64,
        page: usize,
        scale: f32,
        reply: Reply<DynamicImage>,
    },
    Close {
        id: u64,
    },
}

static PDFIUM_THREAD: OnceCell<mpsc::Sender<Command>> = OnceCell::new();
static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(0);

/// The command queue of the pdfium thread, starting it on first use.
///
/// Blocks while the library is bound. A failed binding is not cached, so a
/// later call tries again.
fn pdfium_thread() -> Result<&'static mpsc::Sender<Command>, MarkitdownError> {
    PDFIUM_THREAD.get_or_try_init(|| {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (commands, queue) = mpsc::channel();

        std::thread::Builder::new()
            .name("pdfium".into())
            .spawn(move || match bind_pdfium() {
                Ok(pdfium) => {
                    let _ = ready_tx.send(Ok(()));
                    serve(&pdfium, queue);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| {
                MarkitdownError::Internal(format!("Failed to start pdfium thread: {}", e))
            })?;

        ready_rx.recv().map_err(|_| thread_gone())??;
        info!("pdfium library bound");
        Ok(commands)
    })
}

fn thread_gone() -> MarkitdownError {
    MarkitdownError::Internal("pdfium thread has exited".into())
}

/// Body of the pdfium thread. Runs until every sender is gone.
fn serve(pdfium: &Pdfium, queue: mpsc::Receiver<Command>) {
    let mut documents: HashMap<u64, PdfDocument<'_>> = HashMap::new();

    while let Ok(command) = queue.recv() {
        match command {
            Command::Open {
                id,
                bytes,
                password,
                reply,
            } => {
                let loaded = pdfium
                    .load_pdf_from_byte_vec(bytes, password.as_deref())
                    .map_err(|e| open_error(&e, password.is_some()));
                let _ = reply.send(loaded.map(|document| {
                    let pages = document.pages().len() as usize;
                    documents.insert(id, document);
                    pages
                }));
            }
            Command::Text { id, page, reply } => {
                let _ = reply.send(with_page(&documents, id, page, |p| {
                    p.text().map(|t| t.all()).map_err(|e| format!("{:?}", e))
                }));
            }
            Command::Render {
                id,
                page,
                scale,
                reply,
            } => {
                let _ = reply.send(with_page(&documents, id, page, |p| {
                    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
                    p.render_with_config(&render_config)
                        .map(|bitmap| bitmap.as_image())
                        .map_err(|e| format!("{:?}", e))
                }));
            }
            Command::Close { id } => {
                if documents.remove(&id).is_some() {
                    debug!("Closed document {}", id);
                }
            }
        }
    }
}

fn with_page<T>(
    documents: &HashMap<u64, PdfDocument<'_>>,
    id: u64,
    page: usize,
    f: impl FnOnce(&PdfPage<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let document = documents
        .get(&id)
        .ok_or_else(|| format!("document {} is not open", id))?;
    let pdf_page = document
        .pages()
        .get(page as u16)
        .map_err(|e| format!("{:?}", e))?;
    f(&pdf_page)
}

/// A PDF opened through pdfium.
pub struct PdfiumDocument {
    id: u64,
    commands: mpsc::Sender<Command>,
    page_count: usize,
}

impl std::fmt::Debug for PdfiumDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumDocument")
            .field("id", &self.id)
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl PdfiumDocument {
    /// Parse a PDF from memory and read its page count.
    pub async fn open(bytes: Vec<u8>, password: Option<String>) -> Result<Self, MarkitdownError> {
        let commands = tokio::task::spawn_blocking(|| pdfium_thread().cloned())
            .await
            .map_err(|e| MarkitdownError::Internal(format!("Open task panicked: {}", e)))??;

        let id = NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed);
        let (reply, opened) = oneshot::channel();
        commands
            .send(Command::Open {
                id,
                bytes,
                password,
                reply,
            })
            .map_err(|_| thread_gone())?;
        let page_count = opened.await.map_err(|_| thread_gone())??;

        info!("PDF loaded: {} pages", page_count);
        Ok(Self {
            id,
            commands,
            page_count,
        })
    }

    /// Send one request to the pdfium thread and wait for its answer.
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, String> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| "pdfium thread has exited".to_string())?;
        answer
            .await
            .map_err(|_| "pdfium thread dropped the request".to_string())?
    }
}

impl Drop for PdfiumDocument {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Close { id: self.id });
    }
}

impl PageSource for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn extract_text(&self, page: usize) -> BoxFuture<'_, Result<String, PageError>> {
        Box::pin(async move {
            let id = self.id;
            let text = self
                .request(|reply| Command::Text { id, page, reply })
                .await
                .map_err(|detail| PageError::TextExtraction { page, detail })?;
            debug!("Extracted {} chars of text from page {}", text.len(), page);
            Ok(text)
        })
    }

    fn extract_image(&self, page: usize, dpi: u32) -> BoxFuture<'_, Result<Vec<u8>, PageError>> {
        Box::pin(async move {
            let id = self.id;
            let scale = dpi as f32 / 72.0;
            let image_error = |detail: String| PageError::ImageExtraction { page, detail };

            let image = self
                .request(|reply| Command::Render {
                    id,
                    page,
                    scale,
                    reply,
                })
                .await
                .map_err(image_error)?;

            tokio::task::spawn_blocking(move || encode::encode_png(&image))
                .await
                .map_err(|e| image_error(format!("encode task panicked: {}", e)))?
                .map_err(|e| image_error(e.to_string()))
        })
    }
}

/// Map a pdfium load failure to a readable open error.
fn open_error(err: &PdfiumError, had_password: bool) -> MarkitdownError {
    let detail = format!("{:?}", err);
    let detail = if !detail.contains("Password") && !detail.contains("password") {
        detail
    } else if had_password {
        "wrong password".to_string()
    } else {
        "document is encrypted and requires a password".to_string()
    };
    MarkitdownError::OpenFailed { detail }
}
