//! Activation Functions
//!
//! This module provides the activation functions used by the classifier
//! layers, together with the pieces of their derivatives the backward
//! passes need.
//!
//! ## ReLU (Rectified Linear Unit)
//!
//! ```text
//! ReLU(x) = max(x, 0)
//! ```
//!
//! The derivative is 1 where the pre-activation was positive and 0
//! elsewhere, so the backward pass is a mask applied to the incoming
//! gradient.
//!
//! ## Softmax
//!
//! Softmax itself lives on [`Tensor::softmax`](crate::tensor::Tensor::softmax);
//! this module supplies its backward pass. For `s = softmax(z)` the
//! Jacobian-vector product with an incoming gradient `g` collapses to:
//!
//! ```text
//! grad_z[j] = s[j] * (g[j] - dot(g, s))
//! ```
//!
//! which avoids materializing the full n x n Jacobian. With a one-hot
//! incoming gradient `e_k` (the saliency case) this reduces to the
//! familiar `s_k * (delta_jk - s_j)` column.

use crate::tensor::Tensor;
use rayon::prelude::*;

/// ReLU activation (forward pass)
///
/// # Example
///
/// ```rust
/// # use inkling::Tensor;
/// # use inkling::layers::activation::relu_forward;
/// let x = Tensor::new(vec![-1.0, 0.0, 2.0], vec![1, 3]);
/// let y = relu_forward(&x);
/// assert_eq!(y.data, vec![0.0, 0.0, 2.0]);
/// ```
pub fn relu_forward(x: &Tensor) -> Tensor {
    let result = x.data.par_iter().map(|&val| val.max(0.0)).collect();
    Tensor::new(result, x.shape.clone())
}

/// ReLU derivative (backward pass)
///
/// Masks the incoming gradient by the sign of the pre-activation:
/// positions where `pre <= 0` contribute nothing downstream.
///
/// # Arguments
///
/// * `grad_out` - Gradient from the next layer
/// * `pre` - Pre-activation values cached in the forward pass
pub fn relu_backward(grad_out: &Tensor, pre: &Tensor) -> Tensor {
    assert_eq!(
        grad_out.shape, pre.shape,
        "Gradient and pre-activation shapes must match"
    );
    let grad_data: Vec<f32> = pre
        .data
        .par_iter()
        .zip(&grad_out.data)
        .map(|(&p, &g)| if p > 0.0 { g } else { 0.0 })
        .collect();
    Tensor::new(grad_data, pre.shape.clone())
}

/// Softmax derivative (backward pass)
///
/// Computes the Jacobian-vector product of softmax with the incoming
/// gradient, using the cached softmax output rather than the logits:
///
/// ```text
/// grad_z[j] = s[j] * (g[j] - dot(g, s))
/// ```
///
/// # Arguments
///
/// * `grad_out` - Gradient from the next stage (w.r.t. the softmax output)
/// * `softmax_out` - Softmax values cached in the forward pass
pub fn softmax_backward(grad_out: &Tensor, softmax_out: &Tensor) -> Tensor {
    assert_eq!(
        grad_out.shape, softmax_out.shape,
        "Gradient and softmax output shapes must match"
    );

    let dot: f32 = grad_out
        .data
        .iter()
        .zip(&softmax_out.data)
        .map(|(&g, &s)| g * s)
        .sum();

    let grad_data: Vec<f32> = softmax_out
        .data
        .iter()
        .zip(&grad_out.data)
        .map(|(&s, &g)| s * (g - dot))
        .collect();

    Tensor::new(grad_data, softmax_out.shape.clone())
}
