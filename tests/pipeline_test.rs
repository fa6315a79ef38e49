use image::{DynamicImage, Rgb, RgbImage};
use logsheet_ocr::config::ExtractionSettings;
use logsheet_ocr::engine::{OcrEngine, RecognizedText};
use logsheet_ocr::error::OcrError;
use logsheet_ocr::extraction::{BoxLocator, Enhancement, Extractor, Strategy, Workspace};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// What the scripted engine does for one row image
#[derive(Clone)]
enum Reply {
    Text(Vec<(&'static str, f32)>),
    Fail,
    Panic,
}

/// Recognizer double that answers by row image file name
struct ScriptedEngine {
    replies: HashMap<String, Reply>,
    seen: Mutex<Vec<(String, (u32, u32))>>,
}

impl ScriptedEngine {
    fn new(replies: &[(usize, Reply)]) -> Arc<Self> {
        Arc::new(Self {
            replies: replies
                .iter()
                .map(|(row, reply)| (format!("line_{}.png", row), reply.clone()))
                .collect(),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn description(&self) -> &'static str {
        "Replies from a fixed script keyed by row"
    }

    fn recognize(&self, path: &Path) -> Result<Vec<RecognizedText>, OcrError> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        let dimensions = image::open(path).unwrap().to_rgb8().dimensions();
        self.seen.lock().unwrap().push((name.clone(), dimensions));

        match self.replies.get(&name) {
            Some(Reply::Text(fragments)) => Ok(fragments
                .iter()
                .map(|(text, confidence)| RecognizedText::new(*text, *confidence))
                .collect()),
            Some(Reply::Fail) => Err(OcrError::ProcessingError("model timed out".to_string())),
            Some(Reply::Panic) => panic!("recognizer crashed on {}", name),
            None => Ok(Vec::new()),
        }
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["image/png".to_string()]
    }
}

/// A 700x560 photo with a red frame around (50,50)-(650,510) and a short
/// ink stroke inside each of the given 1-based rows
fn log_sheet(ink_rows: &[u32]) -> DynamicImage {
    let mut img = RgbImage::from_pixel(700, 560, Rgb([255, 255, 255]));
    for y in 50..510 {
        for x in 50..650 {
            if x < 56 || x >= 644 || y < 56 || y >= 504 {
                img.put_pixel(x, y, Rgb([220, 20, 20]));
            }
        }
    }
    for &row in ink_rows {
        let y0 = 50 + (row - 1) * 460 / 30 + 5;
        for y in y0..y0 + 4 {
            for x in 150 + row * 5..230 + row * 5 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

fn extractor(engine: Arc<ScriptedEngine>) -> Extractor {
    Extractor::new(engine, ExtractionSettings::default()).unwrap()
}

#[test]
fn test_tokens_follow_row_order() {
    let engine = ScriptedEngine::new(&[
        (2, Reply::Text(vec![("12x5", 0.9)])),
        (5, Reply::Text(vec![("34.5", 0.9)])),
        (17, Reply::Text(vec![("ZO", 0.9), ("7", 0.9)])),
    ]);
    let workspace = Workspace::create(None).unwrap();

    let report = extractor(engine.clone())
        .extract(&log_sheet(&[17, 2, 5]), &workspace)
        .unwrap();

    assert_eq!(report.strategy, Strategy::Color);
    assert_eq!(report.rows_detected, 3);
    assert_eq!(report.rows_recognized, 3);
    assert_eq!(
        report.result.tokens(),
        ["1.2", "5", "3.0", "4.5", "2.0", "7"]
    );
    assert_eq!(report.result.get("1"), Some("1.2"));
    assert_eq!(report.result.get("6"), Some("7"));
    assert_eq!(report.request_id, workspace.id());
    assert!(report.warnings.is_empty());
    assert_eq!(
        engine.seen_names(),
        vec!["line_17.png", "line_2.png", "line_5.png"]
    );
}

#[test]
fn test_step_timings_cover_every_stage() {
    let engine = ScriptedEngine::new(&[]);
    let workspace = Workspace::create(None).unwrap();

    let report = extractor(engine).extract(&log_sheet(&[4]), &workspace).unwrap();

    let names: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["locate", "rectify", "segment", "filter", "recognize", "aggregate"]
    );
}

#[test]
fn test_blank_sheet_yields_empty_result() {
    let engine = ScriptedEngine::new(&[]);
    let workspace = Workspace::create(None).unwrap();

    let report = extractor(engine.clone())
        .extract(&log_sheet(&[]), &workspace)
        .unwrap();

    assert_eq!(report.rows_detected, 0);
    assert!(report.result.is_empty());
    assert_eq!(serde_json::to_string(&report.result).unwrap(), "{}");
    assert!(engine.seen_names().is_empty());
}

#[test]
fn test_failing_row_is_empty_and_others_continue() {
    let engine = ScriptedEngine::new(&[
        (3, Reply::Text(vec![("125", 0.9)])),
        (8, Reply::Fail),
        (12, Reply::Panic),
        (20, Reply::Text(vec![("9", 0.9)])),
    ]);
    let workspace = Workspace::create(None).unwrap();

    let report = extractor(engine)
        .extract(&log_sheet(&[3, 8, 12, 20]), &workspace)
        .unwrap();

    assert_eq!(report.rows_detected, 4);
    assert_eq!(report.rows_recognized, 2);
    assert_eq!(report.result.tokens(), ["1.2", "5", "9"]);
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().any(|w| w.starts_with("Row 8:")));
    assert!(report.warnings.iter().any(|w| w.starts_with("Row 12:")));
}

#[test]
fn test_low_confidence_fragments_are_dropped() {
    let engine = ScriptedEngine::new(&[(6, Reply::Text(vec![("12", 0.2), ("3", 0.8)]))]);
    let settings = ExtractionSettings {
        min_confidence: 0.5,
        ..ExtractionSettings::default()
    };
    let workspace = Workspace::create(None).unwrap();

    let report = Extractor::new(engine, settings)
        .unwrap()
        .extract(&log_sheet(&[6]), &workspace)
        .unwrap();

    assert_eq!(report.result.tokens(), ["3"]);
}

#[test]
fn test_enhancement_is_applied_before_recognition() {
    let engine = ScriptedEngine::new(&[]);
    let settings = ExtractionSettings {
        enhancement: Enhancement::Upscale,
        ..ExtractionSettings::default()
    };
    let workspace = Workspace::create(None).unwrap();

    Extractor::new(engine.clone(), settings)
        .unwrap()
        .extract(&log_sheet(&[9]), &workspace)
        .unwrap();

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (width, height) = seen[0].1;
    // a cropped row is a few dozen pixels tall before the 3x upscale
    assert_eq!(width % 3, 0);
    assert_eq!(height % 3, 0);
    assert!(height > 60, "expected an upscaled strip, got {}", height);
}

#[test]
fn test_undetectable_box_is_an_error() {
    let engine = ScriptedEngine::new(&[]);
    let workspace = Workspace::create(None).unwrap();
    let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(90, 90, Rgb([128, 128, 128])));

    let result = extractor(engine.clone()).extract(&blank, &workspace);

    assert!(matches!(result, Err(OcrError::DetectionError)));
    assert!(engine.seen_names().is_empty());
}

#[test]
fn test_locator_chain_can_be_restricted() {
    // A black frame is invisible to the colour strategy alone
    let mut img = RgbImage::from_pixel(700, 560, Rgb([255, 255, 255]));
    for y in 50..510 {
        for x in 50..650 {
            if x < 56 || x >= 644 || y < 56 || y >= 504 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
    }
    let engine = ScriptedEngine::new(&[]);
    let workspace = Workspace::create(None).unwrap();

    let result = extractor(engine)
        .with_locator(BoxLocator::new(vec![Strategy::Color]))
        .extract(&DynamicImage::ImageRgb8(img), &workspace);

    assert!(matches!(result, Err(OcrError::DetectionError)));
}

#[test]
fn test_extract_file_and_workspace_cleanup() {
    let input_dir = tempfile::tempdir().unwrap();
    let input = input_dir.path().join("sheet.png");
    log_sheet(&[1, 30]).save(&input).unwrap();

    let work_root = tempfile::tempdir().unwrap();
    let engine = ScriptedEngine::new(&[
        (1, Reply::Text(vec![("5", 0.9)])),
        (30, Reply::Text(vec![("6", 0.9)])),
    ]);

    let report = {
        let workspace = Workspace::create(Some(work_root.path())).unwrap();
        let report = extractor(engine).extract_file(&input, &workspace).unwrap();
        assert!(workspace.strip_path(1).exists());
        assert!(workspace.strip_path(30).exists());
        report
    };

    assert_eq!(report.result.tokens(), ["5", "6"]);
    assert_eq!(std::fs::read_dir(work_root.path()).unwrap().count(), 0);
}

#[test]
fn test_workspace_is_removed_after_failed_extraction() {
    let work_root = tempfile::tempdir().unwrap();
    let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(90, 90, Rgb([128, 128, 128])));

    {
        let workspace = Workspace::create(Some(work_root.path())).unwrap();
        assert_eq!(std::fs::read_dir(work_root.path()).unwrap().count(), 1);

        let result = extractor(ScriptedEngine::new(&[])).extract(&blank, &workspace);
        assert!(matches!(result, Err(OcrError::DetectionError)));
    }

    assert_eq!(std::fs::read_dir(work_root.path()).unwrap().count(), 0);
}

#[test]
fn test_extract_file_rejects_non_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, b"not an image").unwrap();
    let workspace = Workspace::create(None).unwrap();

    let result = extractor(ScriptedEngine::new(&[])).extract_file(&path, &workspace);

    assert!(matches!(result, Err(OcrError::ImageDecode(_))));
}
