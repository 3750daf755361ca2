//! Heatmap Rendering
//!
//! The reference visual treatment for a [`Heatmap`]: importance maps to
//! red intensity on a transparent background, so the image can sit as an
//! overlay on top of whatever the classifier looked at.
//!
//! ```text
//! pixel = (floor(v * 255), 0, 0, 150)
//! ```
//!
//! The fixed alpha of 150 keeps the underlying sample visible through
//! the overlay. Upscaling uses nearest-neighbor sampling so each
//! activation position stays a crisp block instead of bleeding into its
//! neighbors.

use crate::saliency::Heatmap;
use image::imageops::FilterType;
use image::{imageops, Rgba, RgbaImage};

/// Alpha applied to every overlay pixel
pub const OVERLAY_ALPHA: u8 = 150;

/// Render a heatmap as a red-intensity RGBA overlay at native resolution
///
/// One pixel per heatmap position: red `floor(v * 255)`, green and blue
/// zero, alpha [`OVERLAY_ALPHA`].
pub fn to_overlay(heatmap: &Heatmap) -> RgbaImage {
    let mut img = RgbaImage::new(heatmap.width as u32, heatmap.height as u32);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let v = heatmap.get(y as usize, x as usize);
        *pixel = Rgba([(v * 255.0).floor() as u8, 0, 0, OVERLAY_ALPHA]);
    }
    img
}

/// Render a heatmap as an overlay scaled to a display size
///
/// Nearest-neighbor upscaling, so a 26x26 map shown at 280x280 reads as
/// a grid of solid blocks.
pub fn to_overlay_scaled(heatmap: &Heatmap, width: u32, height: u32) -> RgbaImage {
    imageops::resize(&to_overlay(heatmap), width, height, FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_heatmap() -> Heatmap {
        Heatmap {
            height: 2,
            width: 2,
            data: vec![0.0, 0.25, 0.5, 1.0],
        }
    }

    #[test]
    fn test_red_channel_tracks_values() {
        let img = to_overlay(&sample_heatmap());
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, OVERLAY_ALPHA]);
        assert_eq!(img.get_pixel(1, 0).0, [63, 0, 0, OVERLAY_ALPHA]);
        assert_eq!(img.get_pixel(0, 1).0, [127, 0, 0, OVERLAY_ALPHA]);
        assert_eq!(img.get_pixel(1, 1).0, [255, 0, 0, OVERLAY_ALPHA]);
    }

    #[test]
    fn test_upscale_keeps_solid_blocks() {
        // 2x2 -> 4x4: output pixels 0..=1 sample source cell 0 and pixels
        // 2..=3 sample source cell 1, per axis
        let img = to_overlay_scaled(&sample_heatmap(), 4, 4);
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, OVERLAY_ALPHA]);
        assert_eq!(img.get_pixel(3, 0).0, [63, 0, 0, OVERLAY_ALPHA]);
        assert_eq!(img.get_pixel(0, 3).0, [127, 0, 0, OVERLAY_ALPHA]);
        // Every pixel of the bottom-right block comes from the same cell
        assert_eq!(img.get_pixel(2, 2).0, [255, 0, 0, OVERLAY_ALPHA]);
        assert_eq!(img.get_pixel(3, 3).0, [255, 0, 0, OVERLAY_ALPHA]);
    }
}
