use super::segment::LineStrip;
use image::{imageops, GrayImage, Rgb, RgbImage};

/// A row strip that contains ink, cropped to it and given blank margins
#[derive(Debug, Clone)]
pub struct FilteredStrip {
    /// 1-based row number of the source strip
    pub index: usize,
    /// Ink pixels counted at the discard threshold
    pub dark_pixels: u32,
    /// Horizontal span kept from the source strip, end exclusive
    pub columns: (u32, u32),
    pub image: RgbImage,
}

/// Drops strips without enough ink and crops the rest around it
#[derive(Debug, Clone, Copy)]
pub struct ContentFilter {
    /// Luma strictly below this counts as ink for the discard test
    pub dark_threshold: u8,
    /// Luma strictly below this counts as ink when finding the crop span
    pub crop_threshold: u8,
    pub min_dark_pixels: u32,
    pub padding: u32,
    pub margin: u32,
}

impl ContentFilter {
    /// Filter and crop each strip independently, keeping the input order
    pub fn filter(&self, strips: &[LineStrip]) -> Vec<FilteredStrip> {
        strips.iter().filter_map(|s| self.filter_one(s)).collect()
    }

    pub fn filter_one(&self, strip: &LineStrip) -> Option<FilteredStrip> {
        let gray = imageops::grayscale(&strip.image);
        let dark_pixels = count_dark(&gray, self.dark_threshold);
        if dark_pixels < self.min_dark_pixels {
            tracing::debug!(
                "Dropped row {} ({} dark pixels)",
                strip.index,
                dark_pixels
            );
            return None;
        }

        let width = strip.image.width();
        let columns = match dark_column_span(&gray, self.crop_threshold) {
            Some((first, last)) => (
                first.saturating_sub(self.padding),
                last.saturating_add(self.padding).saturating_add(1).min(width),
            ),
            None => (0, width),
        };

        let cropped = imageops::crop_imm(
            &strip.image,
            columns.0,
            0,
            columns.1 - columns.0,
            strip.image.height(),
        )
        .to_image();

        Some(FilteredStrip {
            index: strip.index,
            dark_pixels,
            columns,
            image: add_vertical_margin(&cropped, self.margin),
        })
    }
}

fn count_dark(gray: &GrayImage, threshold: u8) -> u32 {
    gray.pixels().filter(|p| p.0[0] < threshold).count() as u32
}

/// First and last column holding a pixel darker than `threshold`
fn dark_column_span(gray: &GrayImage, threshold: u8) -> Option<(u32, u32)> {
    let mut span: Option<(u32, u32)> = None;
    for (x, _, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < threshold {
            span = Some(match span {
                Some((first, last)) => (first.min(x), last.max(x)),
                None => (x, x),
            });
        }
    }
    span
}

/// White canvas `margin` pixels taller on each side with `image` in the middle
fn add_vertical_margin(image: &RgbImage, margin: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(
        image.width(),
        image.height() + 2 * margin,
        Rgb([255u8, 255, 255]),
    );
    imageops::replace(&mut canvas, image, 0, margin as i64);
    canvas
}
