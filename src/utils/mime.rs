//! File kind detection for uploaded files.
//!
//! Magic bytes win over the filename extension, which wins over whatever MIME
//! type the caller reported.

/// What the content extractor can do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Raster image that can be OCR'd directly.
    Image,
    /// PDF whose first pages can be rendered and OCR'd.
    Pdf,
    /// Anything else; classified by filename only.
    Other,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Other => "other",
        }
    }

    fn from_mime(mime: &str) -> Self {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or(mime)
            .trim()
            .to_lowercase();
        if mime == "application/pdf" {
            Self::Pdf
        } else if mime.starts_with("image/") && mime != "image/svg+xml" {
            Self::Image
        } else {
            Self::Other
        }
    }
}

/// Best MIME type for a file.
pub fn detect_mime_type(filename: &str, bytes: &[u8], reported: Option<&str>) -> String {
    if let Some(detected) = infer::get(bytes) {
        return detected.mime_type().to_string();
    }
    if let Some(guess) = mime_guess::from_path(filename).first() {
        return guess.essence_str().to_string();
    }
    reported
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Detect the kind of an uploaded file.
pub fn detect_file_kind(filename: &str, bytes: &[u8], reported: Option<&str>) -> FileKind {
    FileKind::from_mime(&detect_mime_type(filename, bytes, reported))
}
