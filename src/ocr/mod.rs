//! OCR of images and rendered PDF pages.
//!
//! Text is read with Tesseract; PDF pages are rasterized with `pdftoppm`
//! first. Both are system binaries located through `PATH`, so an
//! [`OcrEngine`] only exists when Tesseract is installed.

mod backend;
mod pdf_utils;
mod tesseract;
mod tools;

use std::path::Path;

use tempfile::TempDir;

pub use backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
pub use pdf_utils::{find_page_image, PageRenderer, PdftoppmRenderer};
pub use tesseract::TesseractBackend;
pub use tools::{check_binary, ToolStatus};

/// An OCR backend paired with a PDF page renderer.
pub struct OcrEngine {
    backend: Box<dyn OcrBackend>,
    renderer: Box<dyn PageRenderer>,
}

impl OcrEngine {
    pub fn new(backend: Box<dyn OcrBackend>, renderer: Box<dyn PageRenderer>) -> Self {
        Self { backend, renderer }
    }

    /// Locate the system engines.
    ///
    /// Returns `None` when Tesseract is missing. A missing `pdftoppm` still
    /// yields an engine; PDF extraction then fails per file.
    pub fn locate(config: &OcrConfig) -> Option<Self> {
        let backend = TesseractBackend::with_config(config);
        if !backend.is_available() {
            tracing::info!("{}", backend.availability_hint());
            return None;
        }

        let renderer = PdftoppmRenderer::with_config(config);
        if !renderer.is_available() {
            tracing::info!("{}", renderer.availability_hint());
        }

        tracing::debug!("OCR engine located (language {})", config.language);
        Some(Self::new(Box::new(backend), Box::new(renderer)))
    }

    /// Report availability of the default system tools.
    pub fn tool_status(config: &OcrConfig) -> Vec<ToolStatus> {
        let backend = TesseractBackend::with_config(config);
        let renderer = PdftoppmRenderer::with_config(config);
        vec![
            ToolStatus {
                name: "tesseract",
                available: backend.is_available(),
                hint: backend.availability_hint(),
            },
            ToolStatus {
                name: renderer.name(),
                available: renderer.is_available(),
                hint: renderer.availability_hint(),
            },
        ]
    }

    /// OCR a single image file.
    pub fn ocr_image(&self, image_path: &Path) -> Result<String, OcrError> {
        let result = self.backend.ocr_image(image_path)?;
        tracing::debug!(
            "{} OCR of {} took {}ms",
            result.backend,
            image_path.display(),
            result.processing_time_ms
        );
        Ok(result.text)
    }

    /// Render and OCR the first `max_pages` pages of a PDF.
    ///
    /// Rendering stops quietly at the end of a short document; failing on
    /// the first page is an error.
    pub fn ocr_pdf(&self, pdf_path: &Path, max_pages: u32) -> Result<String, OcrError> {
        let temp_dir = TempDir::new()?;
        let mut pages = Vec::new();

        for page in 1..=max_pages.max(1) {
            let image = match self.renderer.render_page(pdf_path, page, temp_dir.path()) {
                Ok(image) => image,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::debug!("Stopping PDF render at page {}: {}", page, e);
                    break;
                }
            };
            let text = self.ocr_image(&image)?;
            let text = text.trim();
            if !text.is_empty() {
                pages.push(text.to_string());
            }
        }

        Ok(pages.join("\n"))
    }
}
