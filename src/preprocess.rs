//! Input Preprocessing
//!
//! Turns an arbitrary decoded image into the tensor the digit classifier
//! expects: nearest-neighbor resize to 28x28, grayscale extraction, and
//! scaling into `[0, 1]`, packed as `[1, 28, 28, 1]`.
//!
//! Nearest-neighbor resampling is deliberate. The classifier was trained
//! on hard-edged strokes, and smoother filters wash thin strokes out at
//! this resolution.

use crate::tensor::Tensor;
use image::imageops::FilterType;
use image::DynamicImage;

/// Classifier input side length in pixels
pub const INPUT_SIZE: u32 = 28;

/// Convert a decoded image into a classifier input tensor
///
/// The image is resized to 28x28 with nearest-neighbor sampling,
/// collapsed to a single luma channel, and scaled so every value lies in
/// `[0, 1]`. Any input dimensions are accepted.
///
/// # Example
///
/// ```rust
/// use image::DynamicImage;
/// use inkling::preprocess::to_input_tensor;
///
/// let img = DynamicImage::new_luma8(280, 280);
/// let tensor = to_input_tensor(&img);
/// assert_eq!(tensor.shape, vec![1, 28, 28, 1]);
/// ```
pub fn to_input_tensor(img: &DynamicImage) -> Tensor {
    let gray = img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Nearest)
        .to_luma8();

    let data: Vec<f32> = gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
    Tensor::new(data, vec![1, INPUT_SIZE as usize, INPUT_SIZE as usize, 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_output_shape_and_range() {
        let img = DynamicImage::new_rgb8(100, 60);
        let tensor = to_input_tensor(&img);
        assert_eq!(tensor.shape, vec![1, 28, 28, 1]);
        assert!(tensor.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_white_maps_to_one_black_to_zero() {
        let mut img = GrayImage::new(28, 28);
        img.put_pixel(0, 0, Luma([255]));
        let tensor = to_input_tensor(&DynamicImage::ImageLuma8(img));
        assert_eq!(tensor.data[0], 1.0);
        assert_eq!(tensor.data[1], 0.0);
    }

    #[test]
    fn test_already_sized_image_passes_through() {
        // A 28x28 image should survive the resize untouched
        let mut img = GrayImage::new(28, 28);
        for (i, p) in img.pixels_mut().enumerate() {
            *p = Luma([(i % 256) as u8]);
        }
        let tensor = to_input_tensor(&DynamicImage::ImageLuma8(img));
        assert_eq!(tensor.data[5], 5.0 / 255.0);
        assert_eq!(tensor.data[300], (300 % 256) as f32 / 255.0);
    }
}
