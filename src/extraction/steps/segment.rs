use image::{imageops, RgbImage};

/// One horizontal band of the rectified sheet
#[derive(Debug, Clone)]
pub struct LineStrip {
    /// 1-based row number
    pub index: usize,
    /// First image row covered
    pub y_start: u32,
    /// One past the last image row covered
    pub y_end: u32,
    pub image: RgbImage,
}

impl LineStrip {
    pub fn height(&self) -> u32 {
        self.y_end - self.y_start
    }
}

/// Slice `image` into `row_count` full-width bands.
///
/// Band boundaries are `floor(i * height / row_count)`, so the bands tile the
/// image exactly and their heights differ by at most one pixel. Images shorter
/// than `row_count` produce some zero-height bands.
pub fn segment(image: &RgbImage, row_count: u32) -> Vec<LineStrip> {
    if row_count == 0 {
        return Vec::new();
    }

    let (width, height) = image.dimensions();
    // floor(i * height / row_count) in integers, free of float drift
    let boundary = |i: u32| (i as u64 * height as u64 / row_count as u64) as u32;

    (0..row_count)
        .map(|i| {
            let (y_start, y_end) = (boundary(i), boundary(i + 1));
            let band = imageops::crop_imm(image, 0, y_start, width, y_end - y_start).to_image();
            LineStrip {
                index: i as usize + 1,
                y_start,
                y_end,
                image: band,
            }
        })
        .collect()
}
