//! OCR engine abstraction.
//!
//! The production engine is Tesseract (via `leptess`), compiled in behind
//! the `tesseract` cargo feature because it links against native
//! leptonica/tesseract libraries. A fixed-text engine is selectable from
//! configuration for development and is what the test suite runs against.

use crate::config::OcrConfig;
use image::DynamicImage;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, OcrError>;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("{0}")]
    Recognition(String),
}

/// Trait for OCR engine backends
pub trait OcrEngine: Send + Sync {
    /// Engine identifier for logs (e.g., "tesseract")
    fn name(&self) -> &'static str;

    /// Extract text from a decoded image
    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

// ============================================================================
// Tesseract Implementation
// ============================================================================

/// Tesseract OCR backend.
///
/// A fresh `LepTess` is created per call: the handle is not shareable
/// across threads, and a per-call instance keeps the engine `Sync` without
/// a lock around recognition.
#[cfg(feature = "tesseract")]
pub struct TesseractOcr {
    languages: String,
}

#[cfg(feature = "tesseract")]
impl TesseractOcr {
    pub fn new(languages: impl Into<String>) -> Self {
        Self {
            languages: languages.into(),
        }
    }
}

#[cfg(feature = "tesseract")]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let mut tess =
            leptess::LepTess::new(None, &self.languages).map_err(|e| OcrError::Init(e.to_string()))?;

        // Feed leptonica a PNG re-encoding of the already-decoded image, so
        // recognition never depends on the original upload format.
        let mut png = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| OcrError::Recognition(format!("image encode: {e}")))?;

        tess.set_image_from_mem(png.get_ref())
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        tess.get_utf8_text().map_err(|e| OcrError::Recognition(e.to_string()))
    }
}

// ============================================================================
// Static Implementation
// ============================================================================

/// Engine that returns the same text for every image.
///
/// Lets the whole pipeline run on machines without the native Tesseract
/// libraries; the test suite is built on it.
pub struct StaticOcr {
    text: String,
}

impl StaticOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrEngine for StaticOcr {
    fn name(&self) -> &'static str {
        "static"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<String> {
        Ok(self.text.clone())
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create an OCR engine based on configuration
pub fn create_ocr_engine(config: &OcrConfig) -> anyhow::Result<Arc<dyn OcrEngine>> {
    match config {
        OcrConfig::Tesseract { languages } => {
            #[cfg(feature = "tesseract")]
            {
                tracing::info!("Creating tesseract OCR engine (languages: {})", languages);
                Ok(Arc::new(TesseractOcr::new(languages.clone())))
            }
            #[cfg(not(feature = "tesseract"))]
            {
                let _ = languages;
                anyhow::bail!(
                    "The tesseract OCR engine is configured but the feature is not enabled. \
                     Rebuild with --features tesseract to use it."
                );
            }
        }
        OcrConfig::Static { text } => {
            tracing::info!("Creating static OCR engine");
            Ok(Arc::new(StaticOcr::new(text.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_engine_ignores_the_image() {
        let engine = StaticOcr::new("2 + 2");
        let image = DynamicImage::new_rgb8(4, 4);
        assert_eq!(engine.recognize(&image).unwrap(), "2 + 2");
        assert_eq!(engine.name(), "static");
    }

    #[test]
    fn factory_builds_static_engine() {
        let engine = create_ocr_engine(&OcrConfig::Static {
            text: "x + 1".to_string(),
        })
        .unwrap();
        assert_eq!(engine.name(), "static");
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn factory_rejects_tesseract_without_the_feature() {
        let result = create_ocr_engine(&OcrConfig::Tesseract {
            languages: "eng".to_string(),
        });
        let message = result.err().expect("factory should fail").to_string();
        assert!(message.contains("--features tesseract"));
    }
}
