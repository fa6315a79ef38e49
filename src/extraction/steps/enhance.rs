use super::threshold::adaptive_inverse;
use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, RgbImage};
use imageproc::filter::{filter3x3, median_filter};

/// Upscale factor applied before recognition
const SCALE_FACTOR: u32 = 3;
/// 11x11 neighbourhood for the strip binarization
const BINARIZE_RADIUS: u32 = 5;
const BINARIZE_C: f64 = 2.0;

/// Optional clean-up of a row strip before it is handed to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enhancement {
    /// Pass strips through untouched
    #[default]
    None,
    /// 3x cubic upscale
    Upscale,
    /// 3x upscale, grayscale, adaptive threshold, median denoise, sharpen
    Binarize,
}

impl Enhancement {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "upscale" => Some(Self::Upscale),
            "binarize" => Some(Self::Binarize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Upscale => "upscale",
            Self::Binarize => "binarize",
        }
    }

    pub fn apply(&self, strip: &RgbImage) -> DynamicImage {
        match self {
            Self::None => DynamicImage::ImageRgb8(strip.clone()),
            Self::Upscale => DynamicImage::ImageRgb8(upscale(strip)),
            Self::Binarize => {
                let gray = imageops::grayscale(&upscale(strip));
                // Black ink on white: invert the foreground mask
                let mut binary = adaptive_inverse(&gray, BINARIZE_RADIUS, BINARIZE_C);
                imageops::invert(&mut binary);
                let denoised = median_filter(&binary, 1, 1);
                DynamicImage::ImageLuma8(sharpen(&denoised))
            }
        }
    }
}

fn upscale(strip: &RgbImage) -> RgbImage {
    imageops::resize(
        strip,
        strip.width() * SCALE_FACTOR,
        strip.height() * SCALE_FACTOR,
        FilterType::CatmullRom,
    )
}

/// Strong 3x3 sharpen: centre 9, every neighbour -1
fn sharpen(gray: &GrayImage) -> GrayImage {
    let kernel: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];
    filter3x3(gray, &kernel)
}
