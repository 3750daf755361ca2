//! Tensor Operations for the Classifier
//!
//! This module provides a minimal dense tensor type for the small
//! convolutional classifier and the saliency computation built on top of
//! it. Tensors store multi-dimensional arrays as flat row-major storage
//! plus a shape.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f32>` storing all elements in row-major order
//! - **Shape**: Dimensions of the tensor (e.g., `[batch, h, w, channels]`)
//!
//! ## Example
//!
//! ```rust
//! use inkling::Tensor;
//!
//! // Create a 2x3 matrix
//! let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let tensor = Tensor::new(data, vec![2, 3]);
//!
//! // Matrix multiplication
//! let other = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![3, 2]);
//! let result = tensor.matmul(&other);
//! assert_eq!(result.shape, vec![2, 2]);
//! ```
//!
//! ## Determinism
//!
//! Several operations use parallel processing via Rayon. Every parallel
//! pattern here is order-deterministic (indexed map/collect or per-chunk
//! sequential accumulation, never unordered floating-point reductions), so
//! repeated evaluation of the same inputs is bit-identical. The saliency
//! computation relies on this.

use rayon::prelude::*;

/// A multi-dimensional array for classifier computations
///
/// Tensors store data in a contiguous `Vec<f32>` alongside their shape.
/// All operations use row-major (C-style) memory layout.
///
/// # Memory Layout
///
/// For shape `[2, 3]`, data is stored as:
/// `[row0_col0, row0_col1, row0_col2, row1_col0, row1_col1, row1_col2]`
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    /// Flat storage of all tensor elements
    pub data: Vec<f32>,
    /// Shape of the tensor (dimensions)
    pub shape: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor with given data and shape
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal data length
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    /// assert_eq!(tensor.shape, vec![2, 2]);
    /// ```
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        let expected_size: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_size,
            "Data length ({}) doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_size
        );

        Self { data, shape }
    }

    /// Create a tensor filled with zeros
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let tensor = Tensor::zeros(vec![3, 4]);
    /// assert_eq!(tensor.data.len(), 12);
    /// assert!(tensor.data.iter().all(|&x| x == 0.0));
    /// ```
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        let data = vec![0.0; size];
        Self::new(data, shape)
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SIMD-friendly inner loop for matrix multiplication
    /// Computes: result[j] += a_val * b[j] for all j
    /// Structured as a simple zip so LLVM can auto-vectorize it
    #[inline(always)]
    fn matmul_inner_simd(a_val: f32, b: &[f32], result: &mut [f32]) {
        for (r, &b_val) in result.iter_mut().zip(b.iter()) {
            *r += a_val * b_val;
        }
    }

    /// 2-D matrix multiplication
    ///
    /// For `A @ B` where `A` is `[m, k]` and `B` is `[k, n]`:
    /// - Result shape: `[m, n]`
    /// - Each element `C[i,j] = sum(A[i,l] * B[l,j])` for all l
    ///
    /// # Performance
    ///
    /// - **Small matrices** (< 1K ops): Sequential computation
    /// - **Large matrices** (>= 1K ops): Parallel cache-blocked algorithm
    ///
    /// Both paths accumulate each output element in a fixed order, so the
    /// result is identical between them and across repeated calls.
    ///
    /// # Panics
    ///
    /// Panics if the operands are not 2-D or the inner dimensions differ
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    /// let b = Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
    /// let c = a.matmul(&b);
    /// assert_eq!(c.data, vec![1.0, 2.0, 3.0, 4.0]);
    /// ```
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert!(
            self.shape.len() == 2 && other.shape.len() == 2,
            "Unsupported matmul shapes: {:?} @ {:?}",
            self.shape,
            other.shape
        );
        assert_eq!(
            self.shape[1], other.shape[0],
            "Matrix dimensions incompatible: [{}, {}] @ [{}, {}]",
            self.shape[0], self.shape[1], other.shape[0], other.shape[1]
        );

        let m = self.shape[0];
        let n = other.shape[1];
        let k = self.shape[1];

        // Work threshold balancing parallel overhead against gains
        if m * n * k >= 1_000 {
            return self.matmul_parallel_blocked(other, m, n, k);
        }

        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0;
                for l in 0..k {
                    sum += self.data[i * k + l] * other.data[l * n + j];
                }
                result[i * n + j] = sum;
            }
        }

        Tensor::new(result, vec![m, n])
    }

    /// Parallel cache-blocked matrix multiplication
    ///
    /// 1. **Cache blocking**: Processes data in 8x8 blocks that fit in L1
    /// 2. **Parallel processing**: Distributes row blocks across cores
    /// 3. **Memory locality**: Inner loops access memory sequentially
    ///
    /// Each output element accumulates its k-blocks in ascending order, so
    /// the result is bit-identical across repeated calls.
    fn matmul_parallel_blocked(&self, other: &Tensor, m: usize, n: usize, k: usize) -> Tensor {
        const BLOCK_SIZE: usize = 8;

        let mut result = vec![0.0; m * n];

        result
            .par_chunks_mut(BLOCK_SIZE * n)
            .enumerate()
            .for_each(|(block_i, result_block)| {
                let i_start = block_i * BLOCK_SIZE;
                let i_end = (i_start + BLOCK_SIZE).min(m);

                for j_start in (0..n).step_by(BLOCK_SIZE) {
                    let j_end = (j_start + BLOCK_SIZE).min(n);

                    for k_start in (0..k).step_by(BLOCK_SIZE) {
                        let k_end = (k_start + BLOCK_SIZE).min(k);

                        for i in i_start..i_end {
                            let row_offset = (i - i_start) * n;
                            for k_idx in k_start..k_end {
                                let a_val = self.data[i * k + k_idx];

                                Self::matmul_inner_simd(
                                    a_val,
                                    &other.data[k_idx * n + j_start..k_idx * n + j_end],
                                    &mut result_block[row_offset + j_start..row_offset + j_end],
                                );
                            }
                        }
                    }
                }
            });

        Tensor::new(result, vec![m, n])
    }

    /// Softmax along the last axis
    ///
    /// Uses the numerically stable version:
    ///
    /// ```text
    /// softmax(x)[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))
    /// ```
    ///
    /// Subtracting the maximum prevents overflow in exp() while producing
    /// the same result (the max factors cancel out).
    ///
    /// For 2-D tensors each row is normalized independently, rows computed
    /// in parallel. Other ranks fall back to a global softmax.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0], vec![1, 3]);
    /// let result = tensor.softmax();
    /// let sum: f32 = result.data.iter().sum();
    /// assert!((sum - 1.0).abs() < 1e-6);
    /// ```
    pub fn softmax(&self) -> Tensor {
        // === 2-D SOFTMAX PER ROW (the classifier head case) ===
        if self.shape.len() == 2 {
            let rows = self.shape[0];
            let cols = self.shape[1];

            let result: Vec<f32> = (0..rows)
                .into_par_iter()
                .flat_map_iter(|i| {
                    let start = i * cols;
                    let end = start + cols;
                    let row = &self.data[start..end];

                    // Find max for numerical stability
                    let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

                    let exp_values: Vec<f32> = row.iter().map(|&x| (x - max).exp()).collect();

                    let sum: f32 = exp_values.iter().sum();
                    exp_values.into_iter().map(move |val| val / sum)
                })
                .collect();

            return Tensor::new(result, self.shape.clone());
        }

        // === FALLBACK: GLOBAL SOFTMAX ===
        let max = self.data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp_values: Vec<f32> = self.data.iter().map(|&x| (x - max).exp()).collect();
        let sum: f32 = exp_values.iter().sum();
        let result = exp_values.iter().map(|&x| x / sum).collect();

        Tensor::new(result, self.shape.clone())
    }

    /// Element-wise addition with broadcasting support
    ///
    /// Supports the two patterns the classifier needs:
    ///
    /// 1. **Exact match**: Same shape
    /// 2. **Broadcast last dim**: `[*, n] + [n]` (adding a bias vector)
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    /// let b = Tensor::new(vec![1.0, 1.0], vec![2]);
    /// let c = a.add(&b);
    /// assert_eq!(c.data, vec![2.0, 3.0, 4.0, 5.0]);
    /// ```
    pub fn add(&self, other: &Tensor) -> Tensor {
        // === EXACT MATCH: Same shape ===
        if self.shape == other.shape {
            let result = self
                .data
                .par_iter()
                .zip(&other.data)
                .map(|(a, b)| a + b)
                .collect();
            return Tensor::new(result, self.shape.clone());
        }

        // === BROADCAST LAST DIM: [*, n] + [n] (e.g., bias addition) ===
        if self.shape.len() > other.shape.len() {
            let last_dim = *self.shape.last().unwrap();
            if other.data.len() == last_dim {
                let result: Vec<f32> = (0..self.data.len())
                    .into_par_iter()
                    .map(|i| {
                        let other_idx = i % last_dim;
                        self.data[i] + other.data[other_idx]
                    })
                    .collect();
                return Tensor::new(result, self.shape.clone());
            }
        }

        panic!(
            "Unsupported broadcast for add: {:?} + {:?}",
            self.shape, other.shape
        );
    }

    /// Reshape tensor to new shape
    ///
    /// Total number of elements must remain the same.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    /// let reshaped = tensor.reshape(&[3, 2]);
    /// assert_eq!(reshaped.shape, vec![3, 2]);
    /// ```
    pub fn reshape(&self, new_shape: &[usize]) -> Tensor {
        let new_size: usize = new_shape.iter().product();
        assert_eq!(
            self.data.len(),
            new_size,
            "Cannot reshape: element count mismatch"
        );
        Tensor::new(self.data.clone(), new_shape.to_vec())
    }

    /// Transpose a 2-D tensor
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    /// let transposed = tensor.transpose();
    /// assert_eq!(transposed.shape, vec![3, 2]);
    /// assert_eq!(transposed.data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    /// ```
    pub fn transpose(&self) -> Tensor {
        assert_eq!(
            self.shape.len(),
            2,
            "transpose supports 2-D tensors, got shape {:?}",
            self.shape
        );

        let rows = self.shape[0];
        let cols = self.shape[1];
        let mut result = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                result[j * rows + i] = self.data[i * cols + j];
            }
        }

        Tensor::new(result, vec![cols, rows])
    }

    /// Index of the maximum element over the flattened data
    ///
    /// Ties resolve to the earliest index, so the result is deterministic.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use inkling::Tensor;
    /// let tensor = Tensor::new(vec![0.1, 0.7, 0.2], vec![1, 3]);
    /// assert_eq!(tensor.argmax(), 1);
    /// ```
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.data.iter().enumerate() {
            if v > self.data[best] {
                best = i;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_identity() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let eye = Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
        let c = a.matmul(&eye);
        assert_eq!(c.data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_known_values() {
        // [1 2; 3 4] @ [5 6; 7 8] = [19 22; 43 50]
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let b = Tensor::new(vec![5.0, 6.0, 7.0, 8.0], vec![2, 2]);
        let c = a.matmul(&b);
        assert_eq!(c.data, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_parallel_matches_sequential() {
        // Large enough to take the blocked parallel path
        let k = 64;
        let a_data: Vec<f32> = (0..2 * k).map(|i| (i % 7) as f32 * 0.25).collect();
        let b_data: Vec<f32> = (0..k * 32).map(|i| (i % 5) as f32 * 0.5 - 1.0).collect();
        let a = Tensor::new(a_data, vec![2, k]);
        let b = Tensor::new(b_data, vec![k, 32]);

        let fast = a.matmul(&b);

        // Naive reference
        let mut expected = vec![0.0f32; 2 * 32];
        for i in 0..2 {
            for j in 0..32 {
                let mut sum = 0.0;
                for l in 0..k {
                    sum += a.data[i * k + l] * b.data[l * 32 + j];
                }
                expected[i * 32 + j] = sum;
            }
        }

        for (got, want) in fast.data.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-3, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_add_broadcast_bias() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let bias = Tensor::new(vec![10.0, 20.0, 30.0], vec![3]);
        let y = x.add(&bias);
        assert_eq!(y.data, vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, -1.0, 0.0, 1.0], vec![2, 3]);
        let s = x.softmax();
        for row in 0..2 {
            let sum: f32 = s.data[row * 3..(row + 1) * 3].iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_softmax_large_values_stable() {
        let x = Tensor::new(vec![1000.0, 1001.0, 1002.0], vec![1, 3]);
        let s = x.softmax();
        assert!(s.data.iter().all(|v| v.is_finite()));
        let sum: f32 = s.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_transpose() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let t = x.transpose();
        assert_eq!(t.shape, vec![3, 2]);
        assert_eq!(t.data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_argmax_ties_resolve_to_first() {
        let x = Tensor::new(vec![0.5, 0.5, 0.1], vec![1, 3]);
        assert_eq!(x.argmax(), 0);
    }

    #[test]
    #[should_panic(expected = "Cannot reshape")]
    fn test_reshape_mismatch_panics() {
        let x = Tensor::zeros(vec![2, 3]);
        let _ = x.reshape(&[4, 2]);
    }
}
