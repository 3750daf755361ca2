//! Max Pooling Layer
//!
//! Non-overlapping 2-D max pooling over `[1, h, w, channels]` tensors.
//! The deployed classifier uses a 2x2 window, halving each spatial
//! dimension after the convolution (26x26 -> 13x13).
//!
//! ## Forward Pass
//!
//! Each output position takes the maximum over its window, per channel.
//! Trailing rows/columns that do not fill a whole window are dropped
//! (floor semantics, matching the reference deployment).
//!
//! ## Backward Pass
//!
//! Max pooling routes gradient only to the element that won the forward
//! max: the cache records the flat input index of each winner and the
//! backward pass scatters the incoming gradient onto those positions.
//! Ties resolve to the first (row-major) position scanned, keeping the
//! computation deterministic.

use crate::tensor::Tensor;

/// 2-D max pooling with a square, non-overlapping window
pub struct MaxPool2d {
    /// Window side length (and stride)
    pub pool: usize,
}

impl MaxPool2d {
    /// Create a pooling layer with the given window size
    pub fn new(pool: usize) -> Self {
        assert!(pool > 0, "Pool window must be non-empty");
        Self { pool }
    }

    /// Spatial output size for a given input size (floor division)
    pub fn output_size(&self, h: usize, w: usize) -> (usize, usize) {
        (h / self.pool, w / self.pool)
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor `[1, h, w, c]`
    ///
    /// # Returns
    ///
    /// Tuple of (output `[1, h/p, w/p, c]`, cache of winning indices)
    pub fn forward(&self, x: &Tensor) -> (Tensor, MaxPool2dCache) {
        assert_eq!(x.shape.len(), 4, "MaxPool2d expects 4-D input");
        assert_eq!(x.shape[0], 1, "MaxPool2d expects batch size 1");

        let h = x.shape[1];
        let w = x.shape[2];
        let c = x.shape[3];
        let p = self.pool;
        let (out_h, out_w) = self.output_size(h, w);

        let mut out = vec![0.0; out_h * out_w * c];
        let mut argmax = vec![0usize; out_h * out_w * c];

        for oy in 0..out_h {
            for ox in 0..out_w {
                for ch in 0..c {
                    let mut best_val = f32::NEG_INFINITY;
                    let mut best_idx = 0;
                    for dy in 0..p {
                        for dx in 0..p {
                            let iy = oy * p + dy;
                            let ix = ox * p + dx;
                            let idx = ((iy * w) + ix) * c + ch;
                            if x.data[idx] > best_val {
                                best_val = x.data[idx];
                                best_idx = idx;
                            }
                        }
                    }
                    let out_idx = ((oy * out_w) + ox) * c + ch;
                    out[out_idx] = best_val;
                    argmax[out_idx] = best_idx;
                }
            }
        }

        (
            Tensor::new(out, vec![1, out_h, out_w, c]),
            MaxPool2dCache {
                argmax,
                input_shape: x.shape.clone(),
            },
        )
    }

    /// Backward pass (input gradient only)
    ///
    /// Scatters each incoming gradient element onto the input position
    /// that produced the forward maximum.
    pub fn backward(&self, grad_out: &Tensor, cache: &MaxPool2dCache) -> Tensor {
        assert_eq!(
            grad_out.len(),
            cache.argmax.len(),
            "Gradient size must match the pooled output"
        );

        let mut grad_in = Tensor::zeros(cache.input_shape.clone());
        for (out_idx, &in_idx) in cache.argmax.iter().enumerate() {
            grad_in.data[in_idx] += grad_out.data[out_idx];
        }
        grad_in
    }
}

/// Cache for the max pooling backward pass
pub struct MaxPool2dCache {
    /// Flat input index of the maximum for each output element
    pub argmax: Vec<usize>,
    /// Shape of the forward input, for reconstructing the gradient
    pub input_shape: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_picks_window_max() {
        let pool = MaxPool2d::new(2);
        // 4x4 single channel, blocks of 4 values each
        let input = Tensor::new(
            vec![
                1.0, 5.0, 2.0, 0.0, //
                3.0, 4.0, 8.0, 1.0, //
                0.0, 0.0, 1.0, 1.0, //
                9.0, 2.0, 1.0, 7.0,
            ],
            vec![1, 4, 4, 1],
        );
        let (out, _) = pool.forward(&input);
        assert_eq!(out.shape, vec![1, 2, 2, 1]);
        assert_eq!(out.data, vec![5.0, 8.0, 9.0, 7.0]);
    }

    #[test]
    fn test_forward_drops_partial_windows() {
        let pool = MaxPool2d::new(2);
        let input = Tensor::new((0..25).map(|v| v as f32).collect(), vec![1, 5, 5, 1]);
        let (out, _) = pool.forward(&input);
        assert_eq!(out.shape, vec![1, 2, 2, 1]);
    }

    #[test]
    fn test_backward_routes_to_argmax() {
        let pool = MaxPool2d::new(2);
        let input = Tensor::new(
            vec![
                1.0, 5.0, 2.0, 0.0, //
                3.0, 4.0, 8.0, 1.0, //
                0.0, 0.0, 1.0, 1.0, //
                9.0, 2.0, 1.0, 7.0,
            ],
            vec![1, 4, 4, 1],
        );
        let (_, cache) = pool.forward(&input);
        let grad_out = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![1, 2, 2, 1]);
        let grad_in = pool.backward(&grad_out, &cache);

        let mut expected = vec![0.0; 16];
        expected[1] = 1.0; // 5.0 won the top-left window
        expected[6] = 2.0; // 8.0 won the top-right window
        expected[12] = 3.0; // 9.0 won the bottom-left window
        expected[15] = 4.0; // 7.0 won the bottom-right window
        assert_eq!(grad_in.data, expected);
    }

    #[test]
    fn test_channels_pool_independently() {
        let pool = MaxPool2d::new(2);
        // 2x2 spatial, 2 channels: channel 0 ascending, channel 1 descending
        let input = Tensor::new(
            vec![1.0, 8.0, 2.0, 7.0, 3.0, 6.0, 4.0, 5.0],
            vec![1, 2, 2, 2],
        );
        let (out, _) = pool.forward(&input);
        assert_eq!(out.shape, vec![1, 1, 1, 2]);
        assert_eq!(out.data, vec![4.0, 8.0]);
    }
}
