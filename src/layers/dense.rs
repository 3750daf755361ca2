//! Dense Layer (Fully Connected)
//!
//! An affine transformation with a fused activation:
//! `y = act(x @ W + b)`.
//!
//! ## Forward Pass
//!
//! ```text
//! Input:  x [1, in_features]
//! Weight: W [in_features, out_features]
//! Bias:   b [out_features]
//! Output: y = act(x @ W + b) [1, out_features]
//! ```
//!
//! ## Backward Pass
//!
//! Only the input gradient is produced (this crate never trains). The
//! incoming gradient passes through the activation's input-Jacobian
//! first, then through the affine map:
//!
//! ```text
//! grad_x = grad_pre @ W^T
//! ```
//!
//! where `grad_pre` is the ReLU mask, the softmax Jacobian-vector
//! product, or the unchanged gradient for an identity activation.

use crate::layers::activation::{relu_backward, relu_forward, softmax_backward};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Activation fused onto a dense layer's output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// `max(x, 0)`
    Relu,
    /// Row-wise softmax (the classification head)
    Softmax,
    /// No activation
    Identity,
}

/// Dense (fully connected) layer with a fused activation
pub struct Dense {
    /// Weight matrix, layout `[in_features, out_features]`
    pub weight: Tensor,
    /// Bias vector, layout `[out_features]`
    pub bias: Tensor,
    /// Fused output activation
    pub activation: Activation,
    /// Input width
    pub in_features: usize,
    /// Output width
    pub out_features: usize,
}

impl Dense {
    /// Create a new dense layer with He initialization
    ///
    /// Weights are drawn from `Normal(0, sqrt(2 / in_features))`; biases
    /// start at zero.
    ///
    /// # Arguments
    ///
    /// * `in_features` - Input dimension
    /// * `out_features` - Output dimension
    /// * `activation` - Fused output activation
    /// * `rng` - Seeded generator, so construction is reproducible
    pub fn new(
        in_features: usize,
        out_features: usize,
        activation: Activation,
        rng: &mut StdRng,
    ) -> Self {
        let scale = (2.0 / in_features as f32).sqrt();
        let normal = Normal::new(0.0, scale).unwrap();

        let weight_data: Vec<f32> = (0..in_features * out_features)
            .map(|_| normal.sample(rng))
            .collect();

        Self {
            weight: Tensor::new(weight_data, vec![in_features, out_features]),
            bias: Tensor::zeros(vec![out_features]),
            activation,
            in_features,
            out_features,
        }
    }

    /// Create a dense layer from explicit weights and bias
    pub fn from_weights(weight: Tensor, bias: Tensor, activation: Activation) -> Self {
        assert_eq!(weight.shape.len(), 2, "Dense weight must be 2-D");
        assert_eq!(
            bias.shape,
            vec![weight.shape[1]],
            "Dense bias must have one entry per output"
        );
        let in_features = weight.shape[0];
        let out_features = weight.shape[1];
        Self {
            weight,
            bias,
            activation,
            in_features,
            out_features,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor `[1, in_features]`
    ///
    /// # Returns
    ///
    /// Tuple of (output `[1, out_features]`, cache for backward)
    pub fn forward(&self, x: &Tensor) -> (Tensor, DenseCache) {
        assert_eq!(
            x.shape,
            vec![1, self.in_features],
            "Dense expects input [1, {}], got {:?}",
            self.in_features,
            x.shape
        );

        let pre = x.matmul(&self.weight).add(&self.bias);
        let out = match self.activation {
            Activation::Relu => relu_forward(&pre),
            Activation::Softmax => pre.softmax(),
            Activation::Identity => pre.clone(),
        };

        let cache = DenseCache {
            pre,
            out: out.clone(),
        };
        (out, cache)
    }

    /// Backward pass (input gradient only)
    ///
    /// # Arguments
    ///
    /// * `grad_out` - Gradient w.r.t. the layer output `[1, out_features]`
    /// * `cache` - Cached values from the forward pass
    ///
    /// # Returns
    ///
    /// Gradient w.r.t. the layer input `[1, in_features]`
    pub fn backward(&self, grad_out: &Tensor, cache: &DenseCache) -> Tensor {
        let grad_pre = match self.activation {
            Activation::Relu => relu_backward(grad_out, &cache.pre),
            Activation::Softmax => softmax_backward(grad_out, &cache.out),
            Activation::Identity => grad_out.clone(),
        };

        // grad_x = grad_pre @ W^T
        grad_pre.matmul(&self.weight.transpose())
    }
}

/// Cache for the dense backward pass
pub struct DenseCache {
    /// Pre-activation values (for the ReLU mask)
    pub pre: Tensor,
    /// Post-activation values (for the softmax Jacobian)
    pub out: Tensor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_known_values() {
        // [1, 2] @ [[1, 0], [0, 1]] + [0.5, -0.5] = [1.5, 1.5]
        let dense = Dense::from_weights(
            Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]),
            Tensor::new(vec![0.5, -0.5], vec![2]),
            Activation::Identity,
        );
        let x = Tensor::new(vec![1.0, 2.0], vec![1, 2]);
        let (y, _) = dense.forward(&x);
        assert_eq!(y.data, vec![1.5, 1.5]);
    }

    #[test]
    fn test_softmax_head_sums_to_one() {
        let dense = Dense::from_weights(
            Tensor::new(vec![1.0, -1.0, 2.0, 0.5, 0.0, -0.5], vec![2, 3]),
            Tensor::zeros(vec![3]),
            Activation::Softmax,
        );
        let x = Tensor::new(vec![0.3, -0.7], vec![1, 2]);
        let (y, _) = dense.forward(&x);
        let sum: f32 = y.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(y.data.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_backward_identity_finite_difference() {
        let dense = Dense::from_weights(
            Tensor::new(
                (0..6).map(|i| 0.4 * ((i % 3) as f32 - 1.0)).collect(),
                vec![3, 2],
            ),
            Tensor::new(vec![0.1, -0.2], vec![2]),
            Activation::Identity,
        );
        let x_vals = [0.5f32, -0.3, 0.8];
        let x = Tensor::new(x_vals.to_vec(), vec![1, 3]);

        let (out, cache) = dense.forward(&x);
        // f(x) = out[0]
        let mut seed = Tensor::zeros(out.shape.clone());
        seed.data[0] = 1.0;
        let grad = dense.backward(&seed, &cache);

        let eps = 1e-2f32;
        for i in 0..3 {
            let mut plus = x_vals.to_vec();
            plus[i] += eps;
            let mut minus = x_vals.to_vec();
            minus[i] -= eps;
            let (op, _) = dense.forward(&Tensor::new(plus, vec![1, 3]));
            let (om, _) = dense.forward(&Tensor::new(minus, vec![1, 3]));
            let fd = (op.data[0] - om.data[0]) / (2.0 * eps);
            assert!(
                (grad.data[i] - fd).abs() < 1e-3,
                "element {i}: analytic {} vs fd {fd}",
                grad.data[i]
            );
        }
    }

    #[test]
    fn test_backward_softmax_finite_difference() {
        let dense = Dense::from_weights(
            Tensor::new(
                (0..9).map(|i| 0.25 * ((i % 4) as f32 - 1.5)).collect(),
                vec![3, 3],
            ),
            Tensor::zeros(vec![3]),
            Activation::Softmax,
        );
        let x_vals = [0.2f32, 0.9, -0.4];
        let x = Tensor::new(x_vals.to_vec(), vec![1, 3]);
        let k = 2;

        let (out, cache) = dense.forward(&x);
        let mut seed = Tensor::zeros(out.shape.clone());
        seed.data[k] = 1.0;
        let grad = dense.backward(&seed, &cache);

        let eps = 1e-2f32;
        for i in 0..3 {
            let mut plus = x_vals.to_vec();
            plus[i] += eps;
            let mut minus = x_vals.to_vec();
            minus[i] -= eps;
            let (op, _) = dense.forward(&Tensor::new(plus, vec![1, 3]));
            let (om, _) = dense.forward(&Tensor::new(minus, vec![1, 3]));
            let fd = (op.data[k] - om.data[k]) / (2.0 * eps);
            assert!(
                (grad.data[i] - fd).abs() < 1e-3,
                "element {i}: analytic {} vs fd {fd}",
                grad.data[i]
            );
        }
    }

    #[test]
    fn test_activation_serde_round_trip() {
        let json = serde_json::to_string(&Activation::Softmax).unwrap();
        let decoded: Activation = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, Activation::Softmax);
    }
}
