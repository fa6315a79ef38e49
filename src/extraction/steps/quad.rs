use crate::error::OcrError;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use std::cmp::Ordering;

pub type Corner = (f32, f32);

/// Four corners in top-left, top-right, bottom-right, bottom-left order.
///
/// The order is always derived from the coordinates themselves: the corner
/// with the smallest x+y is top-left, the largest x+y is bottom-right, the
/// smallest y-x is top-right and the largest y-x is bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    corners: [Corner; 4],
}

impl Quadrilateral {
    /// Build from four points in any order
    pub fn from_points(points: [Corner; 4]) -> Self {
        let sum = |p: &Corner| p.0 + p.1;
        let diff = |p: &Corner| p.1 - p.0;

        Self {
            corners: [
                extreme(&points, sum, Ordering::Less),
                extreme(&points, diff, Ordering::Less),
                extreme(&points, sum, Ordering::Greater),
                extreme(&points, diff, Ordering::Greater),
            ],
        }
    }

    pub fn corners(&self) -> [Corner; 4] {
        self.corners
    }

    pub fn top_left(&self) -> Corner {
        self.corners[0]
    }

    pub fn top_right(&self) -> Corner {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Corner {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Corner {
        self.corners[3]
    }

    /// Output size of the rectified region: the longer of each pair of
    /// opposite edges, truncated to whole pixels
    pub fn target_size(&self) -> (u32, u32) {
        let [tl, tr, br, bl] = self.corners;
        let width = distance(tl, tr).max(distance(br, bl));
        let height = distance(tl, bl).max(distance(tr, br));
        (width as u32, height as u32)
    }

    /// Warp the quadrilateral region of `image` into an axis-aligned rectangle
    pub fn rectify(&self, image: &RgbImage) -> Result<RgbImage, OcrError> {
        let (width, height) = self.target_size();
        if width == 0 || height == 0 {
            tracing::warn!("Degenerate quadrilateral {:?}", self.corners);
            return Err(OcrError::DetectionError);
        }

        let (w, h) = (width as f32, height as f32);
        let dest = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let projection =
            Projection::from_control_points(self.corners, dest).ok_or(OcrError::DetectionError)?;

        let mut output = RgbImage::new(width, height);
        warp_into(
            image,
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );

        tracing::debug!(width, height, "Rectified region of interest");
        Ok(output)
    }
}

/// Point with the smallest (`Less`) or largest (`Greater`) key; ties go to
/// the point that sorts first (or last) by x then y
fn extreme(points: &[Corner; 4], key: impl Fn(&Corner) -> f32, want: Ordering) -> Corner {
    let compare = |a: &&Corner, b: &&Corner| {
        key(a)
            .total_cmp(&key(b))
            .then(a.0.total_cmp(&b.0))
            .then(a.1.total_cmp(&b.1))
    };
    let found = match want {
        Ordering::Greater => points.iter().max_by(compare),
        _ => points.iter().min_by(compare),
    };
    // `points` is a fixed-size array of four, so there is always a candidate
    found.copied().unwrap_or(points[0])
}

fn distance(a: Corner, b: Corner) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
