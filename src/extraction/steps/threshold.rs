use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Inverse adaptive threshold: a pixel becomes foreground (255) unless it is
/// brighter than the mean of its `(2 * radius + 1)` square window minus `c`.
///
/// Lines and ink darker than their surroundings come out white on black,
/// ready for contour tracing.
pub fn adaptive_inverse(img: &GrayImage, radius: u32, c: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let integral = compute_integral_image(img);

    GrayImage::from_fn(width, height, |x, y| {
        let x1 = x.saturating_sub(radius);
        let y1 = y.saturating_sub(radius);
        let x2 = (x + radius).min(width - 1);
        let y2 = (y + radius).min(height - 1);

        let mean = window_mean(&integral, width, x1, y1, x2, y2);
        let pixel = img.get_pixel(x, y).0[0] as f64;
        if pixel > mean - c {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    })
}

/// Inverse binary threshold at the Otsu level: dark pixels become 255
pub fn otsu_inverse(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    tracing::debug!(level, "Otsu level computed");
    inverse_binary(img, level)
}

/// Pixels at or below `level` become 255, the rest 0
pub fn inverse_binary(img: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y).0[0] <= level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Summed-area table with a zero row and column, `(width + 1) * (height + 1)`
fn compute_integral_image(img: &GrayImage) -> Vec<u64> {
    let (width, height) = img.dimensions();
    let stride = width as usize + 1;
    let mut table = vec![0u64; stride * (height as usize + 1)];

    for y in 0..height as usize {
        let mut row_sum = 0u64;
        for x in 0..width as usize {
            row_sum += img.get_pixel(x as u32, y as u32).0[0] as u64;
            table[(y + 1) * stride + x + 1] = row_sum + table[y * stride + x + 1];
        }
    }

    table
}

/// Mean over the inclusive window `[x1, x2] x [y1, y2]`
fn window_mean(integral: &[u64], width: u32, x1: u32, y1: u32, x2: u32, y2: u32) -> f64 {
    let stride = width as usize + 1;
    let (x1, y1, x2, y2) = (x1 as usize, y1 as usize, x2 as usize + 1, y2 as usize + 1);
    let area = ((x2 - x1) * (y2 - y1)) as f64;

    let sum = integral[y2 * stride + x2] + integral[y1 * stride + x1]
        - integral[y1 * stride + x2]
        - integral[y2 * stride + x1];

    sum as f64 / area
}
