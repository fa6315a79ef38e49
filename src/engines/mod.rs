//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::text::SubstitutionTable;
use serde::Serialize;
use std::sync::Arc;

/// Information about the active engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_formats: Vec<String>,
}

impl EngineInfo {
    pub fn of(engine: &dyn OcrEngine) -> Self {
        Self {
            name: engine.name(),
            description: engine.description(),
            supported_formats: engine.supported_formats(),
        }
    }
}

/// Initialize the engine selected at build time, scoring against the
/// substitution table the pipeline corrects with
#[cfg(feature = "engine-ocrs")]
pub fn default_engine(substitutions: &SubstitutionTable) -> Result<Arc<dyn OcrEngine>, OcrError> {
    tracing::info!("Initializing ocrs engine...");
    Ok(Arc::new(ocrs::OcrsEngine::new(substitutions.clone())?))
}

#[cfg(not(feature = "engine-ocrs"))]
pub fn default_engine(_substitutions: &SubstitutionTable) -> Result<Arc<dyn OcrEngine>, OcrError> {
    Err(OcrError::InitializationError(
        "No OCR engines available. Build with --features engine-ocrs".to_string(),
    ))
}
