//! Classifier Layers
//!
//! This module contains the layer implementations for the digit
//! classifier. Each layer provides a forward pass plus the input-gradient
//! backward pass the saliency computation needs.
//!
//! ## Layers
//!
//! - **activation**: ReLU forward/backward and the softmax backward pass
//! - **conv2d**: valid-padding stride-1 convolution with fused ReLU
//! - **pool**: non-overlapping 2-D max pooling
//! - **flatten**: spatial-to-row reshape
//! - **dense**: fully connected layer with a fused activation
//!
//! ## Design Pattern
//!
//! Each layer follows a consistent pattern:
//!
//! ```rust,ignore
//! impl SomeLayer {
//!     pub fn forward(&self, x: &Tensor) -> (Tensor, Cache) { }
//!     pub fn backward(&self, grad: &Tensor, cache: &Cache) -> Tensor { }
//! }
//! ```
//!
//! `backward` returns the gradient with respect to the layer *input*
//! only. Parameter gradients are never needed here: the heatmap
//! computation differentiates a class score with respect to an
//! intermediate activation, and training is out of scope.

pub mod activation;
pub mod conv2d;
pub mod dense;
pub mod flatten;
pub mod pool;

// Re-export main types for convenience
pub use activation::{relu_backward, relu_forward, softmax_backward};
pub use conv2d::{Conv2d, Conv2dCache};
pub use dense::{Activation, Dense, DenseCache};
pub use flatten::{Flatten, FlattenCache};
pub use pool::{MaxPool2d, MaxPool2dCache};
