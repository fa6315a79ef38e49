use super::steps::content::{ContentFilter, FilteredStrip};
use super::steps::locate::{BoxLocator, Strategy};
use super::steps::segment::segment;
use super::workspace::Workspace;
use crate::config::ExtractionSettings;
use crate::engine::{OcrEngine, RecognizedText};
use crate::error::OcrError;
use crate::text::{parse, AggregatedResult, RowResult};
use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Timing information for a single pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Everything one extraction run produced
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub request_id: Uuid,
    pub result: AggregatedResult,
    /// Strategy that located the box
    pub strategy: Strategy,
    /// Rows that survived the content filter
    pub rows_detected: usize,
    /// Rows for which the recognizer returned any text
    pub rows_recognized: usize,
    pub warnings: Vec<String>,
    pub steps: Vec<StepTiming>,
    pub total_time_ms: u64,
}

/// Outcome of recognizing and parsing one row
struct RowOutcome {
    row: RowResult,
    recognized: bool,
    warning: Option<String>,
}

/// Runs the full photo-to-dimensions pipeline against a recognizer
pub struct Extractor {
    engine: Arc<dyn OcrEngine>,
    settings: ExtractionSettings,
    locator: BoxLocator,
}

impl Extractor {
    pub fn new(engine: Arc<dyn OcrEngine>, settings: ExtractionSettings) -> Result<Self, OcrError> {
        settings.validate()?;
        Ok(Self {
            engine,
            settings,
            locator: BoxLocator::default(),
        })
    }

    /// Replace the box-detection chain
    pub fn with_locator(mut self, locator: BoxLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    fn content_filter(&self) -> ContentFilter {
        ContentFilter {
            dark_threshold: self.settings.dark_threshold,
            crop_threshold: self.settings.crop_threshold,
            min_dark_pixels: self.settings.min_dark_pixels,
            padding: self.settings.padding,
            margin: self.settings.margin,
        }
    }

    /// Decode an image file and extract from it
    pub fn extract_file(
        &self,
        path: &Path,
        workspace: &Workspace,
    ) -> Result<ExtractionReport, OcrError> {
        let image = image::open(path)
            .map_err(|e| OcrError::ImageDecode(format!("Failed to load image: {}", e)))?;
        self.extract(&image, workspace)
    }

    /// Locate, rectify, slice, filter, recognize and parse one photo
    pub fn extract(
        &self,
        image: &DynamicImage,
        workspace: &Workspace,
    ) -> Result<ExtractionReport, OcrError> {
        let start = Instant::now();
        let mut steps = Vec::new();
        let rgb = image.to_rgb8();

        let detection = run_step("locate", &mut steps, || self.locator.locate(&rgb))?;
        let rectified = run_step("rectify", &mut steps, || detection.quad.rectify(&rgb))?;
        let strips = run_step("segment", &mut steps, || {
            Ok(segment(&rectified, self.settings.row_count))
        })?;
        let filtered = run_step("filter", &mut steps, || {
            Ok(self.content_filter().filter(&strips))
        })?;
        tracing::info!(
            "Kept {} of {} rows after content filter",
            filtered.len(),
            strips.len()
        );

        let outcomes = run_step("recognize", &mut steps, || {
            Ok(filtered
                .par_iter()
                .map(|strip| self.process_row(strip, workspace))
                .collect::<Vec<_>>())
        })?;

        let rows_recognized = outcomes.iter().filter(|o| o.recognized).count();
        let mut warnings = Vec::new();
        let mut rows = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            warnings.extend(outcome.warning);
            rows.push(outcome.row);
        }

        let result = run_step("aggregate", &mut steps, || Ok(AggregatedResult::from_rows(rows)))?;
        let total_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Extracted {} tokens from {} rows in {}ms",
            result.len(),
            filtered.len(),
            total_time_ms
        );

        Ok(ExtractionReport {
            request_id: workspace.id(),
            result,
            strategy: detection.strategy,
            rows_detected: filtered.len(),
            rows_recognized,
            warnings,
            steps,
            total_time_ms,
        })
    }

    /// Recognize one strip and parse its text; recognition failures yield an
    /// empty row
    fn process_row(&self, strip: &FilteredStrip, workspace: &Workspace) -> RowOutcome {
        let (fragments, warning) = match self.recognize_strip(strip, workspace) {
            Ok(fragments) => (fragments, None),
            Err(e) => {
                tracing::warn!("Recognition failed for row {}: {}", strip.index, e);
                (Vec::new(), Some(format!("Row {}: {}", strip.index, e)))
            }
        };

        let raw: Vec<String> = fragments
            .into_iter()
            .filter(|f| f.confidence >= self.settings.min_confidence)
            .map(|f| f.text)
            .collect();
        let corrected = self.settings.substitutions.apply_all(&raw);
        tracing::debug!("Row {}: {:?} -> {:?}", strip.index, raw, corrected);

        RowOutcome {
            recognized: !raw.is_empty(),
            row: RowResult {
                index: strip.index,
                lines: parse(&corrected),
            },
            warning,
        }
    }

    fn recognize_strip(
        &self,
        strip: &FilteredStrip,
        workspace: &Workspace,
    ) -> Result<Vec<RecognizedText>, OcrError> {
        let path = workspace.strip_path(strip.index);
        self.settings
            .enhancement
            .apply(&strip.image)
            .save(&path)
            .map_err(|e| OcrError::Internal(format!("Failed to write row image: {}", e)))?;

        catch_unwind(AssertUnwindSafe(|| self.engine.recognize(&path))).unwrap_or_else(|_| {
            Err(OcrError::ProcessingError(
                "recognizer panicked".to_string(),
            ))
        })
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> Result<T, OcrError>
where
    F: FnOnce() -> Result<T, OcrError>,
{
    let step_start = Instant::now();
    let result = step_fn()?;
    let time_ms = step_start.elapsed().as_millis() as u64;
    tracing::debug!("Step {} took {}ms", name, time_ms);
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms,
    });
    Ok(result)
}
