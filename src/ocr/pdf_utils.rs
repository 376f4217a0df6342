//! PDF page rasterization for OCR.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::backend::{OcrConfig, OcrError};
use super::tools::{check_binary, PDFTOPPM_NOT_FOUND};

/// Renders single PDF pages to image files.
pub trait PageRenderer: Send + Sync {
    /// Tool name for reporting.
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    fn availability_hint(&self) -> String;

    /// Render `page` (1-based) of `pdf_path` into `output_dir`, returning the
    /// image path.
    fn render_page(&self, pdf_path: &Path, page: u32, output_dir: &Path)
        -> Result<PathBuf, OcrError>;
}

/// Renderer backed by poppler's `pdftoppm`.
pub struct PdftoppmRenderer {
    dpi: u32,
}

impl PdftoppmRenderer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi: dpi.max(1) }
    }

    pub fn with_config(config: &OcrConfig) -> Self {
        Self::new(config.render_dpi)
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::with_config(&OcrConfig::default())
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    fn is_available(&self) -> bool {
        check_binary("pdftoppm")
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            "pdftoppm is available".to_string()
        } else {
            PDFTOPPM_NOT_FOUND.to_string()
        }
    }

    fn render_page(
        &self,
        pdf_path: &Path,
        page: u32,
        output_dir: &Path,
    ) -> Result<PathBuf, OcrError> {
        let page_str = page.to_string();
        let dpi_str = self.dpi.to_string();
        let output_prefix = output_dir.join("page");

        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(&output_prefix)
            .status();

        match status {
            Ok(s) if s.success() => find_page_image(output_dir, page)
                .ok_or_else(|| OcrError::RenderFailed(format!("No image generated for page {}", page))),
            Ok(_) => Err(OcrError::RenderFailed(format!(
                "pdftoppm failed to convert page {}",
                page
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(PDFTOPPM_NOT_FOUND.to_string()),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

/// Find the image file for a specific page number.
///
/// pdftoppm names files like page-01.png, page-02.png, etc.
/// The padding width varies based on total page count.
pub fn find_page_image(temp_path: &Path, page_num: u32) -> Option<PathBuf> {
    for digits in [1, 2, 3, 4] {
        let filename = format!("page-{:0width$}.png", page_num, width = digits);
        let path = temp_path.join(&filename);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_page_image_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(find_page_image(temp.path(), 1).is_none());
    }

    #[test]
    fn test_find_page_image_with_2_digit_padding() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("page-02.png");
        std::fs::write(&path, b"fake png").unwrap();

        assert_eq!(find_page_image(temp.path(), 2), Some(path));
    }

    #[test]
    fn test_find_page_image_unpadded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("page-1.png");
        std::fs::write(&path, b"fake png").unwrap();

        assert_eq!(find_page_image(temp.path(), 1), Some(path));
    }

    #[test]
    fn test_dpi_never_zero() {
        let renderer = PdftoppmRenderer::new(0);
        assert_eq!(renderer.dpi, 1);
    }
}
