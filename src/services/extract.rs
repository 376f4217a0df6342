//! Content extraction: OCR excerpts for images and leading PDF pages.
//!
//! Extraction is best-effort. Unsupported files, oversized images, missing
//! engines and OCR failures all produce an empty [`Extraction`], leaving the
//! file to be classified by its name.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::categorizer::CategorizerService;
use crate::config::ExtractionConfig;
use crate::models::UploadFile;
use crate::ocr::{OcrEngine, OcrError};
use crate::utils::{detect_file_kind, FileKind};

/// Text sample taken from a file, plus the category it suggests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub excerpt: String,
    /// Category matched by the excerpt alone.
    pub category: Option<String>,
    pub confidence: f32,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.excerpt.is_empty()
    }
}

/// Capability to pull text out of an uploaded file.
///
/// Implementations never fail; anything that goes wrong yields an empty
/// extraction.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, file: &UploadFile) -> Extraction;
}

/// Extractor used when OCR is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExtractor;

#[async_trait]
impl ContentExtractor for NoopExtractor {
    async fn extract(&self, _file: &UploadFile) -> Extraction {
        Extraction::default()
    }
}

/// Extractor backed by the system OCR engines.
///
/// The engines are located on first use. When Tesseract is missing every
/// extraction is empty.
pub struct OcrContentExtractor {
    config: ExtractionConfig,
    categorizer: Arc<CategorizerService>,
    engine: OnceCell<Option<Arc<OcrEngine>>>,
}

impl OcrContentExtractor {
    pub fn new(config: ExtractionConfig, categorizer: Arc<CategorizerService>) -> Self {
        Self {
            config,
            categorizer,
            engine: OnceCell::new(),
        }
    }

    /// Use a specific engine instead of locating the system one.
    pub fn with_engine(
        config: ExtractionConfig,
        categorizer: Arc<CategorizerService>,
        engine: OcrEngine,
    ) -> Self {
        Self {
            config,
            categorizer,
            engine: OnceCell::new_with(Some(Some(Arc::new(engine)))),
        }
    }

    async fn engine(&self) -> Option<Arc<OcrEngine>> {
        self.engine
            .get_or_init(|| async {
                let ocr_config = self.config.ocr_config();
                OcrEngine::locate(&ocr_config).map(Arc::new)
            })
            .await
            .clone()
    }

    async fn read_text(
        &self,
        engine: Arc<OcrEngine>,
        kind: FileKind,
        file: &UploadFile,
    ) -> Result<String, OcrError> {
        let suffix = match kind {
            FileKind::Pdf => ".pdf".to_string(),
            _ => match file.file_type().as_str() {
                "" => ".img".to_string(),
                ext => format!(".{}", ext),
            },
        };
        let bytes = file.bytes.clone();
        let max_pages = self.config.pdf_max_pages;

        tokio::task::spawn_blocking(move || {
            let mut tmp = tempfile::Builder::new()
                .prefix("lilac-ocr-")
                .suffix(&suffix)
                .tempfile()?;
            tmp.write_all(&bytes)?;
            tmp.flush()?;

            match kind {
                FileKind::Pdf => engine.ocr_pdf(tmp.path(), max_pages),
                _ => engine.ocr_image(tmp.path()),
            }
        })
        .await
        .map_err(|e| OcrError::OcrFailed(format!("OCR task failed: {}", e)))?
    }
}

#[async_trait]
impl ContentExtractor for OcrContentExtractor {
    async fn extract(&self, file: &UploadFile) -> Extraction {
        if !self.config.enabled {
            return Extraction::default();
        }

        let kind = detect_file_kind(&file.name, &file.bytes, file.mime_type.as_deref());
        match kind {
            FileKind::Other => return Extraction::default(),
            FileKind::Image if file.size() > self.config.image_max_bytes => {
                tracing::debug!(
                    "Skipping OCR for {}: {} bytes exceeds {}",
                    file.name,
                    file.size(),
                    self.config.image_max_bytes
                );
                return Extraction::default();
            }
            _ => {}
        }

        let Some(engine) = self.engine().await else {
            return Extraction::default();
        };

        let text = match self.read_text(engine, kind, file).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Content extraction failed for {}: {}", file.name, e);
                return Extraction::default();
            }
        };

        let excerpt = make_excerpt(&text, self.config.excerpt_chars);
        if excerpt.is_empty() {
            return Extraction::default();
        }

        let classification = self.categorizer.classify("", &excerpt);
        tracing::debug!(
            "Extracted {} chars from {} ({})",
            excerpt.chars().count(),
            file.name,
            kind.as_str()
        );
        Extraction {
            excerpt,
            category: classification.category,
            confidence: classification.confidence,
        }
    }
}

/// Collapse whitespace runs and cut to `max_chars` characters.
pub fn make_excerpt(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryDefinition;
    use crate::ocr::{OcrBackend, OcrBackendType, PageRenderer};
    use std::path::{Path, PathBuf};

    struct FixedBackend(&'static str);

    impl OcrBackend for FixedBackend {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        fn run_ocr(&self, _image_path: &Path) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingBackend;

    impl OcrBackend for FailingBackend {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        fn run_ocr(&self, _image_path: &Path) -> Result<String, OcrError> {
            Err(OcrError::OcrFailed("unreadable".to_string()))
        }
    }

    struct CopyRenderer;

    impl PageRenderer for CopyRenderer {
        fn name(&self) -> &'static str {
            "copy"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        fn render_page(
            &self,
            pdf_path: &Path,
            page: u32,
            output_dir: &Path,
        ) -> Result<PathBuf, OcrError> {
            let out = output_dir.join(format!("page-{}.png", page));
            std::fs::copy(pdf_path, &out)?;
            Ok(out)
        }
    }

    fn categorizer() -> Arc<CategorizerService> {
        Arc::new(CategorizerService::from_definitions([
            CategoryDefinition::new("MOUs & MOAs", 9).with_keywords(["memorandum of understanding"]),
        ]))
    }

    fn extractor(backend: Box<dyn OcrBackend>, config: ExtractionConfig) -> OcrContentExtractor {
        OcrContentExtractor::with_engine(
            config,
            categorizer(),
            OcrEngine::new(backend, Box::new(CopyRenderer)),
        )
    }

    fn png(name: &str, len: usize) -> UploadFile {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(len.max(bytes.len()), 0);
        UploadFile::new(name, bytes)
    }

    #[tokio::test]
    async fn test_image_excerpt_is_classified() {
        let extractor = extractor(
            Box::new(FixedBackend("This  Memorandum of\nUnderstanding is entered")),
            ExtractionConfig::default(),
        );
        let result = extractor.extract(&png("scan.png", 64)).await;
        assert_eq!(
            result.excerpt,
            "This Memorandum of Understanding is entered"
        );
        assert_eq!(result.category.as_deref(), Some("MOUs & MOAs"));
    }

    #[tokio::test]
    async fn test_excerpt_truncated() {
        let config = ExtractionConfig {
            excerpt_chars: 10,
            ..Default::default()
        };
        let extractor = extractor(Box::new(FixedBackend("abcdefghijklmnop")), config);
        let result = extractor.extract(&png("scan.png", 64)).await;
        assert_eq!(result.excerpt, "abcdefghij");
        assert_eq!(result.category, None);
    }

    #[tokio::test]
    async fn test_oversized_image_skipped() {
        let config = ExtractionConfig {
            image_max_bytes: 32,
            ..Default::default()
        };
        let extractor = extractor(Box::new(FixedBackend("memorandum of understanding")), config);
        assert!(extractor.extract(&png("big.png", 64)).await.is_empty());
    }

    #[tokio::test]
    async fn test_reported_mime_type_selects_image_ocr() {
        let extractor = extractor(
            Box::new(FixedBackend("memorandum of understanding")),
            ExtractionConfig::default(),
        );
        let unnamed = UploadFile::new("scan", b"raw scanner bytes".to_vec());
        assert!(extractor.extract(&unnamed).await.is_empty());

        let reported = unnamed.with_mime_type("image/png");
        let result = extractor.extract(&reported).await;
        assert_eq!(result.category.as_deref(), Some("MOUs & MOAs"));
    }

    #[tokio::test]
    async fn test_pdf_pages_are_read() {
        let extractor = extractor(
            Box::new(FixedBackend("memorandum of understanding")),
            ExtractionConfig::default(),
        );
        let pdf = UploadFile::new("MOU.pdf", b"%PDF-1.7\n".to_vec());
        let result = extractor.extract(&pdf).await;
        assert_eq!(
            result.excerpt,
            "memorandum of understanding memorandum of understanding"
        );
        assert_eq!(result.category.as_deref(), Some("MOUs & MOAs"));
    }

    #[tokio::test]
    async fn test_failures_and_unsupported_types_are_empty() {
        let failing = extractor(Box::new(FailingBackend), ExtractionConfig::default());
        assert!(failing.extract(&png("scan.png", 64)).await.is_empty());

        let fixed = extractor(
            Box::new(FixedBackend("memorandum of understanding")),
            ExtractionConfig::default(),
        );
        let docx = UploadFile::new("notes.docx", b"PK".to_vec());
        assert!(fixed.extract(&docx).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_and_noop() {
        let config = ExtractionConfig {
            enabled: false,
            ..Default::default()
        };
        let disabled = extractor(Box::new(FixedBackend("memorandum of understanding")), config);
        assert!(disabled.extract(&png("scan.png", 64)).await.is_empty());
        assert!(NoopExtractor.extract(&png("scan.png", 64)).await.is_empty());
    }
}
