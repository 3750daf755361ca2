//! Grad-CAM Saliency Heatmaps
//!
//! Given a classifier, one input sample, and the name of an intermediate
//! layer, this module produces a 2-D importance map over that layer's
//! spatial output: which positions of the activation pushed the network
//! toward a chosen class.
//!
//! ## Algorithm
//!
//! ```text
//! 1. Split the classifier at the target layer:
//!        head = layers[..=target]       tail = layers[target+1..]
//! 2. A = head(input)                    the target activation
//! 3. f(A') = tail(A')[class]            scalar class score
//! 4. G = df/dA' at A' = A               backprop a one-hot seed
//! 5. w[c] = mean over (h, w) of G       one weight per channel
//! 6. S[h,w] = sum over c of A[h,w,c] * w[c]
//! 7. S = max(S, 0)                      rectify
//! 8. S /= max(S) unless max(S) == 0     normalize into [0, 1]
//! ```
//!
//! The gradient in step 4 is computed by walking the tail's layers in
//! reverse with their cached forward values - the tail is short and its
//! layer vocabulary fixed, so explicit backpropagation is enough and no
//! autodiff machinery is involved.
//!
//! ## Degenerate maps
//!
//! When the rectified map is identically zero (gradients cancelled, or
//! the activation was all zero), the heatmap is returned as all zeros.
//! That is a deliberate "no salient region" answer, not a failure: no
//! error is raised and no NaN can escape the normalization.
//!
//! ## Example
//!
//! ```rust
//! use inkling::{compute_heatmap, Classifier, Tensor};
//!
//! let model = Classifier::mnist(7);
//! let input = Tensor::zeros(vec![1, 28, 28, 1]);
//! let heatmap = compute_heatmap(&model, &input, "conv", None).unwrap();
//!
//! // 3x3 valid convolution over 28x28 leaves 26x26
//! assert_eq!((heatmap.height, heatmap.width), (26, 26));
//! assert!(heatmap.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
//! ```

use crate::error::{Error, Result};
use crate::model::{Classifier, Layer};
use crate::tensor::Tensor;

/// A normalized 2-D importance map over an activation's spatial positions
///
/// Values lie in `[0, 1]`, one per spatial position of the target
/// layer's output; the channel dimension has been collapsed by the
/// weighted sum. Rendering (color mapping, upscaling) is a consumer
/// concern - see [`crate::render`] for the reference treatment.
#[derive(Clone, Debug, PartialEq)]
pub struct Heatmap {
    /// Number of rows
    pub height: usize,
    /// Number of columns
    pub width: usize,
    /// Row-major values, length `height * width`
    pub data: Vec<f32>,
}

impl Heatmap {
    /// Value at a spatial position
    ///
    /// # Panics
    ///
    /// Panics if `row >= height` or `col >= width`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(
            row < self.height && col < self.width,
            "Heatmap position ({row}, {col}) out of bounds for {}x{}",
            self.height,
            self.width
        );
        self.data[row * self.width + col]
    }
}

/// Compute a Grad-CAM heatmap for one input sample
///
/// # Arguments
///
/// * `classifier` - The trained classifier (shared, read-only)
/// * `input` - One preprocessed sample matching the classifier's input
///   shape (`[1, 28, 28, 1]` for the digit preset, values in `[0, 1]`)
/// * `target_layer` - Name of the layer whose activation is explained
/// * `class_index` - Class to explain; `None` means the class the full
///   classifier predicts for `input`
///
/// # Errors
///
/// * [`Error::LayerNotFound`] - no layer has the requested name
/// * [`Error::InvalidClassIndex`] - explicit index outside
///   `[0, num_classes)`; the index is never clamped
/// * [`Error::ShapeMismatch`] - `input` does not fit the first layer
///
/// # Determinism
///
/// A pure function of its arguments: identical inputs produce
/// bit-identical heatmaps, and concurrent calls never share mutable
/// state.
pub fn compute_heatmap(
    classifier: &Classifier,
    input: &Tensor,
    target_layer: &str,
    class_index: Option<usize>,
) -> Result<Heatmap> {
    let target = classifier
        .layer_index(target_layer)
        .ok_or_else(|| Error::LayerNotFound(target_layer.to_string()))?;

    let num_classes = classifier.num_classes();
    if let Some(index) = class_index {
        if index >= num_classes {
            return Err(Error::InvalidClassIndex { index, num_classes });
        }
    }

    check_input_shape(classifier, input)?;

    // Head: run the input up to and including the target layer.
    let mut activation = input.clone();
    for i in 0..=target {
        let (y, _) = classifier.layer(i).forward(&activation);
        activation = y;
    }

    // Tail: the remaining layers, with caches kept for the backward walk.
    // An empty tail (target is the last layer) degenerates to the
    // identity: the output IS the activation and the one-hot seed below
    // is already the gradient.
    let mut caches = Vec::with_capacity(classifier.num_layers() - target - 1);
    let mut output = activation.clone();
    for i in target + 1..classifier.num_layers() {
        let (y, cache) = classifier.layer(i).forward(&output);
        caches.push(cache);
        output = y;
    }

    let class = match class_index {
        Some(index) => index,
        None => output.argmax(),
    };

    // Seed d(score)/d(output) = e_class and backpropagate through the tail.
    let mut grad = Tensor::zeros(output.shape.clone());
    grad.data[class] = 1.0;
    for i in (target + 1..classifier.num_layers()).rev() {
        grad = classifier.layer(i).backward(&grad, &caches[i - target - 1]);
    }

    let (height, width, channels) = spatial_dims(&activation);

    // One weight per channel: spatial mean of the gradient.
    let mut weights = vec![0.0f32; channels];
    for pos in 0..height * width {
        for (c, w) in weights.iter_mut().enumerate() {
            *w += grad.data[pos * channels + c];
        }
    }
    let denom = (height * width) as f32;
    for w in &mut weights {
        *w /= denom;
    }

    // Weighted channel sum, rectified.
    let mut data = vec![0.0f32; height * width];
    for (pos, v) in data.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (c, w) in weights.iter().enumerate() {
            sum += activation.data[pos * channels + c] * w;
        }
        *v = sum.max(0.0);
    }

    // Normalize into [0, 1]; an all-zero map stays all-zero.
    let max = data.iter().fold(0.0f32, |a, &b| a.max(b));
    if max != 0.0 {
        for v in &mut data {
            *v /= max;
        }
    }

    Ok(Heatmap {
        height,
        width,
        data,
    })
}

/// Spatial extent and channel count of an activation
///
/// `[1, h, w, c]` activations map to `(h, w, c)`. Dense activations
/// `[1, n]` have no spatial extent; they are treated as a single 1x1
/// position with `n` channels, so the channel dimension still collapses
/// in the weighted sum.
fn spatial_dims(activation: &Tensor) -> (usize, usize, usize) {
    match activation.shape.len() {
        4 => (
            activation.shape[1],
            activation.shape[2],
            activation.shape[3],
        ),
        _ => (1, 1, activation.len()),
    }
}

/// Validate the sample against the first layer's expected input
fn check_input_shape(classifier: &Classifier, input: &Tensor) -> Result<()> {
    let mismatch = |expected: String| Error::ShapeMismatch {
        expected,
        got: format!("{:?}", input.shape),
    };

    match classifier.layer(0) {
        Layer::Conv2d(conv) => {
            // Spatial extent must cover at least one kernel placement,
            // otherwise the valid-padding output size underflows
            let k = conv.kernel;
            if input.shape.len() != 4
                || input.shape[0] != 1
                || input.shape[1] < k
                || input.shape[2] < k
                || input.shape[3] != conv.in_channels
            {
                return Err(mismatch(format!(
                    "[1, h>={k}, w>={k}, {}]",
                    conv.in_channels
                )));
            }
        }
        Layer::MaxPool2d(_) | Layer::Flatten(_) => {
            if input.shape.len() != 4 || input.shape[0] != 1 {
                return Err(mismatch("[1, h, w, c]".to_string()));
            }
        }
        Layer::Dense(dense) => {
            if input.shape != vec![1, dense.in_features] {
                return Err(mismatch(format!("[1, {}]", dense.in_features)));
            }
        }
    }
    Ok(())
}
