//! Locating the external OCR and rendering tools.

pub const TESSERACT_NOT_FOUND: &str =
    "Tesseract not installed. Install with: apt install tesseract-ocr (or brew install tesseract)";

pub const PDFTOPPM_NOT_FOUND: &str =
    "pdftoppm not found (install poppler-utils, or brew install poppler)";

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Availability of one external tool, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub name: &'static str,
    pub available: bool,
    pub hint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        assert!(!check_binary("lilac-definitely-not-a-real-binary"));
    }
}
