//! Error types for the crate.
//!
//! All fallible public operations return [`Result`], an alias over the
//! single crate-wide [`Error`] enum. The two saliency failure modes
//! (unknown layer name, out-of-range class index) are fatal to the call
//! and carry enough context for a caller to build a user-facing message.
//!
//! A degenerate gradient (all activations or gradients cancelling to
//! zero) is deliberately NOT an error: the heatmap computation returns an
//! all-zero map instead. See [`crate::saliency::compute_heatmap`].

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by classifier construction and heatmap computation.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested layer name does not exist in the classifier.
    #[error("layer not found: {0}")]
    LayerNotFound(String),

    /// The requested class index lies outside `[0, num_classes)`.
    #[error("invalid class index {index}: classifier has {num_classes} classes")]
    InvalidClassIndex {
        /// The index that was requested.
        index: usize,
        /// Number of classes the classifier predicts.
        num_classes: usize,
    },

    /// An input tensor did not have the shape an operation requires.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// A classifier could not be assembled from the given layers.
    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),
}
