use crate::error::OcrError;
use crate::extraction::steps::enhance::Enhancement;
use crate::text::SubstitutionTable;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logsheet-ocr-server")]
#[command(about = "Extracts dimension measurements from photographed log sheets")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum file size in bytes (default: 50MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Number of rows the log sheet is sliced into
    #[arg(long, env = "OCR_ROW_COUNT", default_value = "30")]
    pub row_count: u32,

    /// Luma below which a pixel counts as ink when discarding empty rows
    #[arg(long, env = "OCR_DARK_THRESHOLD", default_value = "50")]
    pub dark_threshold: u8,

    /// Luma below which a pixel counts as ink when cropping rows
    #[arg(long, env = "OCR_CROP_THRESHOLD", default_value = "70")]
    pub crop_threshold: u8,

    /// Rows with fewer ink pixels than this are discarded
    #[arg(long, env = "OCR_MIN_DARK_PIXELS", default_value = "10")]
    pub min_dark_pixels: u32,

    /// Horizontal padding kept around the ink of each row
    #[arg(long, env = "OCR_CROP_PADDING", default_value = "10")]
    pub padding: u32,

    /// Blank margin added above and below each cropped row
    #[arg(long, env = "OCR_STRIP_MARGIN", default_value = "7")]
    pub margin: u32,

    /// Recognized fragments below this confidence are dropped
    #[arg(long, env = "OCR_MIN_CONFIDENCE", default_value = "0.0")]
    pub min_confidence: f32,

    /// Also map slash, backslash and pipe to "1"
    #[arg(long, env = "OCR_STRICT_SUBSTITUTIONS")]
    pub strict_substitutions: bool,

    /// Strip enhancement before recognition (none, upscale, binarize)
    #[arg(long, env = "OCR_ENHANCEMENT", default_value = "none")]
    pub enhancement: String,

    /// Parent directory for per-request working areas (system temp dir if unset)
    #[arg(long, env = "OCR_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory to persist each result as JSON (disabled if unset)
    #[arg(long, env = "OCR_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub work_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub extraction: ExtractionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9292,
            max_file_size: 52_428_800,
            work_dir: None,
            output_dir: None,
            extraction: ExtractionSettings::default(),
        }
    }
}

impl TryFrom<Args> for Config {
    type Error = OcrError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let enhancement = Enhancement::from_str(&args.enhancement).ok_or_else(|| {
            OcrError::InvalidConfig(format!("unknown enhancement '{}'", args.enhancement))
        })?;

        let substitutions = if args.strict_substitutions {
            SubstitutionTable::strict()
        } else {
            SubstitutionTable::standard()
        };

        let extraction = ExtractionSettings {
            row_count: args.row_count,
            dark_threshold: args.dark_threshold,
            crop_threshold: args.crop_threshold,
            min_dark_pixels: args.min_dark_pixels,
            padding: args.padding,
            margin: args.margin,
            min_confidence: args.min_confidence,
            enhancement,
            substitutions,
        };
        extraction.validate()?;

        Ok(Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            work_dir: args.work_dir,
            output_dir: args.output_dir,
            extraction,
        })
    }
}

/// Tunables of the extraction pipeline
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub row_count: u32,
    pub dark_threshold: u8,
    pub crop_threshold: u8,
    pub min_dark_pixels: u32,
    pub padding: u32,
    pub margin: u32,
    pub min_confidence: f32,
    pub enhancement: Enhancement,
    pub substitutions: SubstitutionTable,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            row_count: 30,
            dark_threshold: 50,
            crop_threshold: 70,
            min_dark_pixels: 10,
            padding: 10,
            margin: 7,
            min_confidence: 0.0,
            enhancement: Enhancement::None,
            substitutions: SubstitutionTable::standard(),
        }
    }
}

impl ExtractionSettings {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.row_count == 0 {
            return Err(OcrError::InvalidConfig(
                "row count must be at least 1".to_string(),
            ));
        }
        if self.margin > u16::MAX as u32 || self.padding > u16::MAX as u32 {
            return Err(OcrError::InvalidConfig(
                "padding and margin must fit in 16 bits".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(OcrError::InvalidConfig(format!(
                "min confidence {} is outside 0.0..=1.0",
                self.min_confidence
            )));
        }
        Ok(())
    }
}
