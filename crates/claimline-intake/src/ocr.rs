//! Text-layer OCR for local runs

use claimline_domain::traits::{ObjectStore, OcrLine, OcrOutput, OcrService};
use claimline_domain::ServiceError;
use std::sync::Arc;

/// Reads the text layer of UTF-8 objects as OCR output
///
/// Each non-blank line becomes an OCR line at confidence 100. Binary
/// objects (scans, photos, audio) have no text layer and yield nothing.
pub struct TextLayerOcr {
    objects: Arc<dyn ObjectStore>,
}

impl TextLayerOcr {
    /// Create a new text-layer reader
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    fn read(&self, object_key: &str) -> Result<OcrOutput, ServiceError> {
        let object = self.objects.get(object_key)?;
        let Ok(text) = String::from_utf8(object.body) else {
            return Ok(OcrOutput::default());
        };

        let lines: Vec<OcrLine> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| OcrLine {
                text: l.trim_end().to_string(),
                confidence: 100.0,
            })
            .collect();
        let pages = if lines.is_empty() { 0 } else { text.matches('\u{c}').count() + 1 };

        Ok(OcrOutput { lines, pages })
    }
}

impl OcrService for TextLayerOcr {
    fn analyze(&self, object_key: &str) -> Result<OcrOutput, ServiceError> {
        self.read(object_key)
    }

    fn detect_text(&self, object_key: &str) -> Result<OcrOutput, ServiceError> {
        self.read(object_key)
    }
}
