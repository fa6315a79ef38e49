use crate::error::OcrError;
use std::path::Path;

/// One fragment of recognized text with the engine's confidence in it
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Trait that all text recognizers must implement.
///
/// The extraction pipeline hands each row strip to the engine as an image
/// file in the request workspace and treats the engine as a black box.
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text fragments in an image file, in reading order
    fn recognize(&self, path: &Path) -> Result<Vec<RecognizedText>, OcrError>;

    /// Get supported MIME types
    fn supported_formats(&self) -> Vec<String>;
}
