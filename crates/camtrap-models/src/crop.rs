//! Pixel crop geometry for detection bounding boxes.

use serde::{Deserialize, Serialize};

/// A pixel rectangle, fully contained in the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge in pixels
    pub left: u32,
    /// Top edge in pixels
    pub top: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Map a normalized bounding box onto a pixel rectangle with border expansion.
///
/// `bounding_box` is `[x, y, w, h]` with every component normalized to the
/// image dimensions. The rectangle is expanded by `border_px` on each side and
/// clamped so it never leaves the image. When the expanded box would cross the
/// right (or bottom) edge, the width (or height) is cut to the edge instead.
///
/// Inputs are not validated: a box that is negative or out of range produces a
/// clamped rectangle, and keeping it meaningful is the caller's responsibility.
pub fn compute_crop_rect(
    image_width: u32,
    image_height: u32,
    bounding_box: [f64; 4],
    border_px: u32,
) -> CropRect {
    let [x, y, w, h] = bounding_box;
    let image_width = i64::from(image_width);
    let image_height = i64::from(image_height);
    let border = i64::from(border_px);

    let left = (x * image_width as f64).round() as i64;
    let top = (y * image_height as f64).round() as i64;
    let box_width = (w * image_width as f64).round() as i64;
    let box_height = (h * image_height as f64).round() as i64;

    let left_with_border = (left - border).max(0);
    let top_with_border = (top - border).max(0);

    let width_with_border = if box_width + left + border >= image_width {
        image_width - left_with_border
    } else {
        box_width + 2 * border
    };
    let height_with_border = if box_height + top + border >= image_height {
        image_height - top_with_border
    } else {
        box_height + 2 * border
    };

    CropRect {
        left: left_with_border as u32,
        top: top_with_border as u32,
        width: width_with_border.max(0) as u32,
        height: height_with_border.max(0) as u32,
    }
}
