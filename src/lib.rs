//! Inkling: Grad-CAM Saliency Maps for a Small Digit Classifier
//!
//! Answers "where did the network look?" for a small convolutional digit
//! classifier, implemented from scratch in Rust. The classifier's layers
//! carry explicit forward and backward passes, and the saliency module
//! splits the network at a named layer to backpropagate a class score
//! into a normalized 2-D heatmap.
//!
//! # Modules
//!
//! - [`tensor`] - Dense f32 tensors with the handful of ops the layers need
//! - [`layers`] - Convolution, pooling, flatten, and dense layers
//! - [`model`] - The named-layer sequential [`Classifier`]
//! - [`saliency`] - The Grad-CAM heatmap computation
//! - [`preprocess`] - Raw image to classifier input tensor
//! - [`render`] - Heatmap to red-intensity RGBA overlay
//! - [`error`] - Crate error type
//!
//! # Example
//!
//! ```rust
//! use inkling::{compute_heatmap, Classifier, Tensor};
//!
//! let model = Classifier::mnist(42);
//! let input = Tensor::new(vec![0.5; 28 * 28], vec![1, 28, 28, 1]);
//!
//! // Explain the predicted class at the conv layer's output
//! let heatmap = compute_heatmap(&model, &input, "conv", None).unwrap();
//! assert_eq!((heatmap.height, heatmap.width), (26, 26));
//! ```

pub mod error;
pub mod layers;
pub mod model;
pub mod preprocess;
pub mod render;
pub mod saliency;
pub mod tensor;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use layers::{Activation, Conv2d, Dense, Flatten, MaxPool2d};
pub use model::{Classifier, ClassifierBuilder, Layer};
pub use saliency::{compute_heatmap, Heatmap};
pub use tensor::Tensor;
