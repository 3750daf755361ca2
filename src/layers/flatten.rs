//! Flatten Layer
//!
//! Collapses a `[1, h, w, c]` activation into a `[1, h*w*c]` row vector so
//! the dense head can consume it. Data is already stored row-major in
//! (h, w, c) order, so the forward pass is a reshape; the backward pass is
//! the inverse reshape.

use crate::tensor::Tensor;

/// Flattens spatial activations into a single feature row
pub struct Flatten;

impl Flatten {
    /// Create a flatten layer
    pub fn new() -> Self {
        Self
    }

    /// Forward pass: `[1, h, w, c]` -> `[1, h*w*c]`
    pub fn forward(&self, x: &Tensor) -> (Tensor, FlattenCache) {
        assert!(
            !x.shape.is_empty() && x.shape[0] == 1,
            "Flatten expects a batch-1 tensor, got shape {:?}",
            x.shape
        );
        let features: usize = x.shape.iter().skip(1).product();
        let out = x.reshape(&[1, features]);
        (
            out,
            FlattenCache {
                input_shape: x.shape.clone(),
            },
        )
    }

    /// Backward pass: restore the cached input shape
    pub fn backward(&self, grad_out: &Tensor, cache: &FlattenCache) -> Tensor {
        grad_out.reshape(&cache.input_shape)
    }
}

impl Default for Flatten {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache for the flatten backward pass
pub struct FlattenCache {
    /// Shape of the forward input
    pub input_shape: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_shape() {
        let flatten = Flatten::new();
        let x = Tensor::zeros(vec![1, 13, 13, 32]);
        let (y, _) = flatten.forward(&x);
        assert_eq!(y.shape, vec![1, 13 * 13 * 32]);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let flatten = Flatten::new();
        let x = Tensor::new((0..12).map(|v| v as f32).collect(), vec![1, 2, 3, 2]);
        let (y, cache) = flatten.forward(&x);
        assert_eq!(y.data, x.data);

        let grad = flatten.backward(&y, &cache);
        assert_eq!(grad.shape, x.shape);
        assert_eq!(grad.data, x.data);
    }
}
