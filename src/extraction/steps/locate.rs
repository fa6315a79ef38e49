//! Region-of-interest detection.
//!
//! The log sheet's table is framed by a red/orange box. It is found with a
//! fixed chain of classical detectors; the first one that yields a usable
//! quadrilateral wins.

use super::quad::Quadrilateral;
use super::threshold::{adaptive_inverse, otsu_inverse};
use crate::error::OcrError;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length, min_area_rect};
use imageproc::morphology::{close, dilate};
use imageproc::point::Point;
use std::time::Instant;

/// Contours at or below this area are never the box
const MIN_CONTOUR_AREA: f64 = 10_000.0;
/// Polygon approximation tolerance when screening contours, as a fraction of perimeter
const SCREEN_EPSILON: f64 = 0.04;
/// Polygon approximation tolerance when extracting corners
const CORNER_EPSILON: f64 = 0.02;
/// 5x5 square structuring element
const KERNEL_RADIUS: u8 = 2;
/// Gaussian sigma equivalent to a 5x5 kernel
const BLUR_SIGMA: f32 = 1.1;
const CANNY_LOW: f32 = 30.0;
const CANNY_HIGH: f32 = 150.0;
/// 11x11 neighbourhood
const ADAPTIVE_RADIUS: u32 = 5;
const ADAPTIVE_C: f64 = 2.0;
const FALLBACK_CANDIDATES: usize = 5;
const FALLBACK_MIN_SIDE: u32 = 100;

/// Hue bands (OpenCV scale, 0..180) covering red/orange around the wrap
const HUE_BANDS: [(u8, u8); 2] = [(0, 20), (150, 180)];
const MIN_SATURATION: u8 = 40;
const MIN_VALUE: u8 = 60;

/// One box-detection method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Red/orange hue mask
    Color,
    /// Canny edges of the blurred grayscale image
    Edge,
    /// Largest roughly rectangular contour of an adaptive threshold
    AdaptiveThreshold,
    /// First large rectangle among the biggest Otsu contours
    Otsu,
}

impl Strategy {
    /// The full chain in the order it is tried
    pub const CHAIN: [Strategy; 4] = [
        Strategy::Color,
        Strategy::Edge,
        Strategy::AdaptiveThreshold,
        Strategy::Otsu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Edge => "edge",
            Self::AdaptiveThreshold => "adaptive-threshold",
            Self::Otsu => "otsu",
        }
    }

    pub fn detect(&self, image: &RgbImage) -> Option<Quadrilateral> {
        match self {
            Self::Color => {
                let mask = red_mask(image);
                let mask = close(&mask, Norm::LInf, KERNEL_RADIUS);
                let mask = dilate(&mask, Norm::LInf, KERNEL_RADIUS);
                largest_box(external_contours(&mask))
            }
            Self::Edge => {
                let gray = image::imageops::grayscale(image);
                let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
                let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
                let edges = dilate(&edges, Norm::LInf, KERNEL_RADIUS);
                largest_box(external_contours(&edges))
            }
            Self::AdaptiveThreshold => {
                let gray = image::imageops::grayscale(image);
                let binary = adaptive_inverse(&gray, ADAPTIVE_RADIUS, ADAPTIVE_C);
                let best = all_contours(&binary)
                    .into_iter()
                    .map(|c| (polygon_area(&c), c))
                    .filter(|(area, c)| {
                        *area > MIN_CONTOUR_AREA
                            && (4..=8).contains(&approximate(c, SCREEN_EPSILON).len())
                    })
                    .max_by(|a, b| a.0.total_cmp(&b.0))?;
                corners_of(&best.1)
            }
            Self::Otsu => {
                let gray = image::imageops::grayscale(image);
                let binary = otsu_inverse(&gray);
                let mut contours: Vec<_> = external_contours(&binary)
                    .into_iter()
                    .map(|c| (polygon_area(&c), c))
                    .collect();
                contours.sort_by(|a, b| b.0.total_cmp(&a.0));

                contours
                    .into_iter()
                    .take(FALLBACK_CANDIDATES)
                    .find_map(|(_, contour)| {
                        let approx = approximate(&contour, SCREEN_EPSILON);
                        if approx.len() < 4 {
                            return None;
                        }
                        let quad = bounding_quad(&approx);
                        let (width, height) = quad.target_size();
                        (width > FALLBACK_MIN_SIDE && height > FALLBACK_MIN_SIDE).then_some(quad)
                    })
            }
        }
    }
}

/// A located box and the strategy that found it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub quad: Quadrilateral,
    pub strategy: Strategy,
}

/// Tries each strategy in order until one finds the box
#[derive(Debug, Clone)]
pub struct BoxLocator {
    strategies: Vec<Strategy>,
}

impl Default for BoxLocator {
    fn default() -> Self {
        Self::new(Strategy::CHAIN.to_vec())
    }
}

impl BoxLocator {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn locate(&self, image: &RgbImage) -> Result<Detection, OcrError> {
        for &strategy in &self.strategies {
            let start = Instant::now();
            match strategy.detect(image) {
                Some(quad) => {
                    tracing::info!(
                        "Box located by {} strategy in {}ms",
                        strategy.as_str(),
                        start.elapsed().as_millis()
                    );
                    return Ok(Detection { quad, strategy });
                }
                None => {
                    tracing::debug!("{} strategy found no box", strategy.as_str());
                }
            }
        }

        tracing::warn!("All box detection strategies failed");
        Err(OcrError::DetectionError)
    }
}

/// Largest contour passing the area and vertex screen, reduced to its corners
fn largest_box(contours: Vec<Vec<Point<i32>>>) -> Option<Quadrilateral> {
    let (_, best) = contours
        .into_iter()
        .map(|c| (polygon_area(&c), c))
        .filter(|(area, c)| *area > MIN_CONTOUR_AREA && approximate(c, SCREEN_EPSILON).len() >= 4)
        .max_by(|a, b| a.0.total_cmp(&b.0))?;
    corners_of(&best)
}

/// Four corners of an accepted contour: its 2% polygon if that is already a
/// quadrilateral, otherwise the minimum-area rectangle around the polygon
fn corners_of(contour: &[Point<i32>]) -> Option<Quadrilateral> {
    let approx = approximate(contour, CORNER_EPSILON);
    match approx.len() {
        4 => Some(Quadrilateral::from_points([
            to_corner(approx[0]),
            to_corner(approx[1]),
            to_corner(approx[2]),
            to_corner(approx[3]),
        ])),
        n if n > 4 => Some(bounding_quad(&approx)),
        _ => None,
    }
}

fn bounding_quad(points: &[Point<i32>]) -> Quadrilateral {
    Quadrilateral::from_points(min_area_rect(points).map(to_corner))
}

fn to_corner(p: Point<i32>) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Closed-curve polygon approximation with tolerance `fraction` of the perimeter
fn approximate(contour: &[Point<i32>], fraction: f64) -> Vec<Point<i32>> {
    if contour.len() < 3 {
        return contour.to_vec();
    }
    let epsilon = fraction * arc_length(contour, true);
    if epsilon <= 0.0 {
        return contour.to_vec();
    }

    let mut approx = approximate_polygon_dp(contour, epsilon, true);
    if approx.len() > 1 && approx.first() == approx.last() {
        approx.pop();
    }
    approx
}

/// Shoelace area of a closed contour
fn polygon_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
        })
        .sum();
    twice.abs() / 2.0
}

/// Outer borders that are not nested in any other contour
fn external_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

fn all_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .map(|c| c.points)
        .collect()
}

/// 255 where the pixel falls in a red/orange hue band, 0 elsewhere
fn red_mask(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let in_band = HUE_BANDS.iter().any(|&(lo, hi)| (lo..=hi).contains(&h));
        if in_band && s >= MIN_SATURATION && v >= MIN_VALUE {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// RGB to HSV in the 8-bit OpenCV convention: hue 0..180, saturation and
/// value 0..255
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
    let hue_degrees = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let hue_degrees = if hue_degrees < 0.0 {
        hue_degrees + 360.0
    } else {
        hue_degrees
    };

    (
        (hue_degrees / 2.0).round().min(180.0) as u8,
        s.round() as u8,
        max as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn framed(width: u32, height: u32, frame: Rgb<u8>, rect: (u32, u32, u32, u32)) -> RgbImage {
        let (x0, y0, x1, y1) = rect;
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for y in y0..y1 {
            for x in x0..x1 {
                let on_border = x < x0 + 6 || x >= x1 - 6 || y < y0 + 6 || y >= y1 - 6;
                if on_border {
                    img.put_pixel(x, y, frame);
                }
            }
        }
        img
    }

    fn assert_near(actual: (f32, f32), expected: (f32, f32), tolerance: f32) {
        assert!(
            (actual.0 - expected.0).abs() <= tolerance && (actual.1 - expected.1).abs() <= tolerance,
            "expected {:?} within {}, got {:?}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn test_hsv_matches_opencv_convention() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), (120, 255, 255));
        assert_eq!(rgb_to_hsv(255, 255, 255), (0, 0, 255));
        // magenta-red wraps to the high band
        assert_eq!(rgb_to_hsv(255, 0, 64).0, 172);
    }

    #[test]
    fn test_red_mask_ignores_gray_and_blue() {
        let mut img = RgbImage::from_pixel(3, 1, Rgb([128, 128, 128]));
        img.put_pixel(1, 0, Rgb([230, 90, 30]));
        img.put_pixel(2, 0, Rgb([20, 40, 220]));

        let mask = red_mask(&img);

        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(1, 0).0[0], 255);
        assert_eq!(mask.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn test_polygon_area_of_rectangle() {
        let pts = [
            Point::new(0, 0),
            Point::new(200, 0),
            Point::new(200, 100),
            Point::new(0, 100),
        ];
        assert_eq!(polygon_area(&pts), 20_000.0);
    }

    #[test]
    fn test_color_strategy_finds_red_frame() {
        let img = framed(640, 480, Rgb([220, 30, 20]), (100, 80, 540, 400));

        let quad = Strategy::Color.detect(&img).expect("red frame should be found");

        assert_near(quad.top_left(), (100.0, 80.0), 6.0);
        assert_near(quad.top_right(), (539.0, 80.0), 6.0);
        assert_near(quad.bottom_right(), (539.0, 399.0), 6.0);
        assert_near(quad.bottom_left(), (100.0, 399.0), 6.0);
    }

    #[test]
    fn test_color_strategy_ignores_black_frame() {
        let img = framed(640, 480, Rgb([0, 0, 0]), (100, 80, 540, 400));
        assert!(Strategy::Color.detect(&img).is_none());
    }

    fn assert_frame_corners(quad: Quadrilateral, tolerance: f32) {
        assert_near(quad.top_left(), (100.0, 80.0), tolerance);
        assert_near(quad.top_right(), (539.0, 80.0), tolerance);
        assert_near(quad.bottom_right(), (539.0, 399.0), tolerance);
        assert_near(quad.bottom_left(), (100.0, 399.0), tolerance);
    }

    #[test]
    fn test_edge_strategy_finds_black_frame() {
        let img = framed(640, 480, Rgb([0, 0, 0]), (100, 80, 540, 400));
        let quad = Strategy::Edge.detect(&img).expect("edges of the frame should be found");
        assert_frame_corners(quad, 6.0);
    }

    #[test]
    fn test_adaptive_threshold_strategy_finds_black_frame() {
        let img = framed(640, 480, Rgb([0, 0, 0]), (100, 80, 540, 400));
        let quad = Strategy::AdaptiveThreshold
            .detect(&img)
            .expect("thresholded frame should be found");
        assert_frame_corners(quad, 3.0);
    }

    #[test]
    fn test_otsu_strategy_finds_black_frame() {
        let img = framed(640, 480, Rgb([0, 0, 0]), (100, 80, 540, 400));
        let quad = Strategy::Otsu.detect(&img).expect("Otsu frame should be found");
        assert_frame_corners(quad, 3.0);
    }

    #[test]
    fn test_otsu_strategy_rejects_frames_under_minimum_side() {
        // 94px outer, 82px interior: below the 100px minimum side
        let img = framed(200, 200, Rgb([0, 0, 0]), (50, 50, 144, 144));
        assert!(Strategy::Otsu.detect(&img).is_none());
    }

    #[test]
    fn test_chain_falls_back_for_black_frame() {
        let img = framed(640, 480, Rgb([0, 0, 0]), (100, 80, 540, 400));

        let detection = BoxLocator::default().locate(&img).unwrap();

        assert_ne!(detection.strategy, Strategy::Color);
        let (width, height) = detection.quad.target_size();
        assert!(width > 400 && height > 280, "got {}x{}", width, height);
    }

    #[test]
    fn test_small_image_is_detection_error() {
        let img = RgbImage::from_pixel(60, 60, Rgb([255, 255, 255]));
        let result = BoxLocator::default().locate(&img);
        assert!(matches!(result, Err(OcrError::DetectionError)));
    }

    #[test]
    fn test_empty_chain_is_detection_error() {
        let img = framed(640, 480, Rgb([220, 30, 20]), (100, 80, 540, 400));
        let result = BoxLocator::new(vec![]).locate(&img);
        assert!(matches!(result, Err(OcrError::DetectionError)));
    }
}
