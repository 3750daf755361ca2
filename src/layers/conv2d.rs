//! 2-D Convolution Layer
//!
//! Valid-padding, stride-1 convolution over `[1, h, w, channels]` tensors
//! with an optionally fused ReLU, matching the deployed classifier's first
//! stage (32 filters of 3x3 over a grayscale input).
//!
//! ## Forward Pass
//!
//! ```text
//! Input:  x [1, h, w, in_c]
//! Weight: W [kh, kw, in_c, out_c]
//! Bias:   b [out_c]
//! Output: y[0,i,j,o] = act( sum over (ky,kx,c) of
//!                           x[0,i+ky,j+kx,c] * W[ky,kx,c,o] + b[o] )
//! ```
//!
//! Output spatial size is `(h - k + 1, w - k + 1)` (valid padding, no
//! stride), so a 3x3 kernel over 28x28 yields 26x26.
//!
//! ## Backward Pass
//!
//! Only the input gradient is produced (this crate never trains). The
//! incoming gradient first passes through the ReLU mask, then each input
//! position accumulates contributions from every kernel placement that
//! covered it, a full correlation with the kernel:
//!
//! ```text
//! grad_x[0,iy,ix,c] = sum over (ky,kx,o) of
//!                     grad_pre[0,iy-ky,ix-kx,o] * W[ky,kx,c,o]
//! ```
//!
//! with out-of-range placements skipped.

use crate::layers::activation::relu_backward;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

/// 2-D convolution with valid padding, stride 1, and optional fused ReLU
pub struct Conv2d {
    /// Kernel weights, layout `[kh, kw, in_c, out_c]`
    pub weight: Tensor,
    /// Per-filter bias, layout `[out_c]`
    pub bias: Tensor,
    /// Square kernel side length
    pub kernel: usize,
    /// Input channel count
    pub in_channels: usize,
    /// Output channel count (number of filters)
    pub out_channels: usize,
    /// Whether a ReLU is fused onto the output
    pub relu: bool,
}

impl Conv2d {
    /// Create a new convolution layer with He initialization
    ///
    /// Weights are drawn from `Normal(0, sqrt(2 / fan_in))` where
    /// `fan_in = kernel * kernel * in_channels`; biases start at zero.
    ///
    /// # Arguments
    ///
    /// * `in_channels` - Input channel count
    /// * `out_channels` - Number of filters
    /// * `kernel` - Square kernel side length
    /// * `relu` - Fuse a ReLU onto the output
    /// * `rng` - Seeded generator, so construction is reproducible
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        relu: bool,
        rng: &mut StdRng,
    ) -> Self {
        let fan_in = kernel * kernel * in_channels;
        let scale = (2.0 / fan_in as f32).sqrt();
        let normal = Normal::new(0.0, scale).unwrap();

        let weight_data: Vec<f32> = (0..fan_in * out_channels)
            .map(|_| normal.sample(rng))
            .collect();

        Self {
            weight: Tensor::new(
                weight_data,
                vec![kernel, kernel, in_channels, out_channels],
            ),
            bias: Tensor::zeros(vec![out_channels]),
            kernel,
            in_channels,
            out_channels,
            relu,
        }
    }

    /// Create a convolution layer from explicit weights and bias
    ///
    /// Weight layout must be `[kh, kw, in_c, out_c]` with `kh == kw`.
    pub fn from_weights(weight: Tensor, bias: Tensor, relu: bool) -> Self {
        assert_eq!(weight.shape.len(), 4, "Conv2d weight must be 4-D");
        assert_eq!(
            weight.shape[0], weight.shape[1],
            "Conv2d kernel must be square"
        );
        assert_eq!(
            bias.shape,
            vec![weight.shape[3]],
            "Conv2d bias must have one entry per filter"
        );
        let kernel = weight.shape[0];
        let in_channels = weight.shape[2];
        let out_channels = weight.shape[3];
        Self {
            weight,
            bias,
            kernel,
            in_channels,
            out_channels,
            relu,
        }
    }

    /// Spatial output size for a given input size
    pub fn output_size(&self, h: usize, w: usize) -> (usize, usize) {
        (h - self.kernel + 1, w - self.kernel + 1)
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor `[1, h, w, in_c]`
    ///
    /// # Returns
    ///
    /// Tuple of (output `[1, out_h, out_w, out_c]`, cache for backward)
    pub fn forward(&self, x: &Tensor) -> (Tensor, Conv2dCache) {
        assert_eq!(x.shape.len(), 4, "Conv2d expects 4-D input");
        assert_eq!(x.shape[0], 1, "Conv2d expects batch size 1");
        assert_eq!(
            x.shape[3], self.in_channels,
            "Conv2d expects {} input channels, got {}",
            self.in_channels, x.shape[3]
        );

        let h = x.shape[1];
        let w = x.shape[2];
        let in_c = self.in_channels;
        let out_c = self.out_channels;
        let k = self.kernel;
        let (out_h, out_w) = self.output_size(h, w);

        let mut pre_data = vec![0.0; out_h * out_w * out_c];

        // Parallelize over output rows; each row accumulates sequentially
        pre_data
            .par_chunks_mut(out_w * out_c)
            .enumerate()
            .for_each(|(y, row)| {
                for x_pos in 0..out_w {
                    for o in 0..out_c {
                        let mut sum = self.bias.data[o];
                        for ky in 0..k {
                            for kx in 0..k {
                                let in_base = (((y + ky) * w) + (x_pos + kx)) * in_c;
                                let w_base = ((ky * k + kx) * in_c) * out_c + o;
                                for c in 0..in_c {
                                    sum += x.data[in_base + c]
                                        * self.weight.data[w_base + c * out_c];
                                }
                            }
                        }
                        row[x_pos * out_c + o] = sum;
                    }
                }
            });

        let pre = Tensor::new(pre_data, vec![1, out_h, out_w, out_c]);
        let out = if self.relu {
            crate::layers::activation::relu_forward(&pre)
        } else {
            pre.clone()
        };

        (
            out,
            Conv2dCache {
                pre,
                input_shape: x.shape.clone(),
            },
        )
    }

    /// Backward pass (input gradient only)
    ///
    /// # Arguments
    ///
    /// * `grad_out` - Gradient w.r.t. the layer output `[1, out_h, out_w, out_c]`
    /// * `cache` - Cached values from the forward pass
    ///
    /// # Returns
    ///
    /// Gradient w.r.t. the layer input `[1, in_h, in_w, in_c]`
    pub fn backward(&self, grad_out: &Tensor, cache: &Conv2dCache) -> Tensor {
        let grad_pre = if self.relu {
            relu_backward(grad_out, &cache.pre)
        } else {
            grad_out.clone()
        };

        let in_h = cache.input_shape[1];
        let in_w = cache.input_shape[2];
        let out_h = grad_pre.shape[1];
        let out_w = grad_pre.shape[2];
        let in_c = self.in_channels;
        let out_c = self.out_channels;
        let k = self.kernel;

        let mut grad_in = vec![0.0; in_h * in_w * in_c];

        for iy in 0..in_h {
            for ix in 0..in_w {
                for c in 0..in_c {
                    let mut sum = 0.0;
                    for ky in 0..k {
                        if iy < ky || iy - ky >= out_h {
                            continue;
                        }
                        let y = iy - ky;
                        for kx in 0..k {
                            if ix < kx || ix - kx >= out_w {
                                continue;
                            }
                            let x = ix - kx;
                            let g_base = ((y * out_w) + x) * out_c;
                            let w_base = ((ky * k + kx) * in_c + c) * out_c;
                            for o in 0..out_c {
                                sum += grad_pre.data[g_base + o] * self.weight.data[w_base + o];
                            }
                        }
                    }
                    grad_in[((iy * in_w) + ix) * in_c + c] = sum;
                }
            }
        }

        Tensor::new(grad_in, vec![1, in_h, in_w, in_c])
    }
}

/// Cache for the convolution backward pass
pub struct Conv2dCache {
    /// Pre-activation output (needed for the ReLU mask)
    pub pre: Tensor,
    /// Shape of the forward input, for reconstructing the gradient
    pub input_shape: Vec<usize>,
}
