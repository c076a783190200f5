use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available — build with the `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over the external text-recognition engine. Implementations
/// take encoded image bytes and return whatever text the engine saw; the
/// pipeline makes no assumption beyond newline-separated UTF-8-ish output.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

// ── Mock backend ─────────────────────────────────────────────────────────────

/// Returns a preset string regardless of input. Lets every pipeline test run
/// without a Tesseract installation.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract backend (optional) ─────────────────────────────────────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use divvy_core::OcrConfig;
    use leptess::LepTess;

    /// Real OCR via libtesseract, tuned by [`OcrConfig`] (language and page
    /// segmentation mode; receipts read best as a single uniform block).
    pub struct TesseractRecognizer {
        data_path: Option<String>,
        config: OcrConfig,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, config: OcrConfig) -> Self {
            Self { data_path, config }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.config.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(
                leptess::Variable::TesseditPagesegMode,
                &self.config.psm.to_string(),
            )
            .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
