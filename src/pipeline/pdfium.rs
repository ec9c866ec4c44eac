//! pdfium-backed decoder: text layers and page rasterisation.
//!
//! ## Why a worker thread?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and must not be driven from async worker threads. Each
//! opened document therefore lives on one dedicated OS thread that owns the
//! `Pdfium` binding and the parsed document for as long as any
//! [`PdfiumDocument`] handle exists. Page requests travel over a channel and
//! come back through oneshot replies. Dropping the last handle closes the
//! channel, the thread leaves its loop, and pdfium frees the document.

use super::document::{PdfDecoder, PdfDocument};
use crate::error::ExtractError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::{PdfPages, PdfRenderConfig, Pdfium, PdfiumError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Opens PDFs with pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumDecoder {
    lib_path: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumDecoder {
    pub fn new(lib_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self { lib_path, password }
    }
}

/// Bind to pdfium: explicit library path, else `./`, else the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, ExtractError> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path.to_string_lossy().to_string()),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

enum PageRequest {
    Text {
        page: usize,
        reply: oneshot::Sender<Result<Vec<String>, ExtractError>>,
    },
    Render {
        page: usize,
        scale: f32,
        reply: oneshot::Sender<Result<DynamicImage, ExtractError>>,
    },
}

/// Handle to a document held open by a pdfium worker thread.
#[derive(Debug)]
pub struct PdfiumDocument {
    page_count: usize,
    requests: mpsc::UnboundedSender<PageRequest>,
}

impl std::fmt::Debug for PageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageRequest::Text { page, .. } => write!(f, "Text({page})"),
            PageRequest::Render { page, scale, .. } => write!(f, "Render({page}, {scale})"),
        }
    }
}

#[async_trait]
impl PdfDecoder for PdfiumDecoder {
    async fn open(&self, name: &str, bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, ExtractError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let lib_path = self.lib_path.clone();
        let password = self.password.clone();
        let name = name.to_string();

        std::thread::Builder::new()
            .name("pdfium-worker".into())
            .spawn(move || serve_document(&name, bytes, lib_path, password, ready_tx, rx))
            .map_err(|e| ExtractError::Internal(format!("Failed to start pdfium worker: {}", e)))?;

        let page_count = ready_rx.await.map_err(|_| worker_gone())??;
        info!("PDF loaded: {} pages", page_count);

        Ok(Arc::new(PdfiumDocument {
            page_count,
            requests: tx,
        }))
    }
}

#[async_trait]
impl PdfDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn text_content(&self, page: usize) -> Result<Vec<String>, ExtractError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(PageRequest::Text { page, reply })
            .map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())?
    }

    async fn render(&self, page: usize, scale: f32) -> Result<DynamicImage, ExtractError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(PageRequest::Render { page, scale, reply })
            .map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())?
    }
}

fn worker_gone() -> ExtractError {
    ExtractError::Internal("pdfium worker exited unexpectedly".into())
}

/// Worker thread body: open the document, report the page count, then answer
/// page requests until every handle is dropped.
fn serve_document(
    name: &str,
    bytes: Vec<u8>,
    lib_path: Option<PathBuf>,
    password: Option<String>,
    ready: oneshot::Sender<Result<usize, ExtractError>>,
    mut requests: mpsc::UnboundedReceiver<PageRequest>,
) {
    let pdfium = match bind_pdfium(lib_path.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let document = match pdfium.load_pdf_from_byte_vec(bytes, password.as_deref()) {
        Ok(d) => d,
        Err(e) => {
            let _ = ready.send(Err(map_load_error(name, e, password.is_some())));
            return;
        }
    };

    let pages = document.pages();
    let total = pages.len() as usize;
    if ready.send(Ok(total)).is_err() {
        return;
    }

    while let Some(request) = requests.blocking_recv() {
        debug!("pdfium worker: {:?}", request);
        match request {
            PageRequest::Text { page, reply } => {
                let _ = reply.send(page_text(&pages, page, total));
            }
            PageRequest::Render { page, scale, reply } => {
                let _ = reply.send(render_page(&pages, page, total, scale));
            }
        }
    }

    debug!("pdfium worker released '{}'", name);
}

fn map_load_error(name: &str, e: PdfiumError, had_password: bool) -> ExtractError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            ExtractError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            ExtractError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            name: name.to_string(),
            detail: err_str,
        }
    }
}

fn check_range(page: usize, total: usize) -> Result<u16, ExtractError> {
    if page == 0 || page > total {
        return Err(ExtractError::PageOutOfRange { page, total });
    }
    Ok((page - 1) as u16)
}

/// Text layer of one page, one fragment per line.
fn page_text(pages: &PdfPages<'_>, page: usize, total: usize) -> Result<Vec<String>, ExtractError> {
    let index = check_range(page, total)?;
    let failed = |e: PdfiumError| ExtractError::TextContentFailed {
        page,
        detail: format!("{:?}", e),
    };

    let pdf_page = pages.get(index).map_err(failed)?;
    let text = pdf_page.text().map_err(failed)?.all();

    Ok(text.lines().map(str::to_owned).collect())
}

fn render_page(
    pages: &PdfPages<'_>,
    page: usize,
    total: usize,
    scale: f32,
) -> Result<DynamicImage, ExtractError> {
    let index = check_range(page, total)?;
    let failed = |e: PdfiumError| ExtractError::RenderFailed {
        page,
        detail: format!("{:?}", e),
    };

    let pdf_page = pages.get(index).map_err(failed)?;
    debug!(
        "Page {} viewport {:.0}x{:.0} pt at scale {}",
        page,
        pdf_page.width().value,
        pdf_page.height().value,
        scale
    );

    let config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = pdf_page.render_with_config(&config).map_err(failed)?;
    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page,
        image.width(),
        image.height()
    );

    Ok(image)
}
