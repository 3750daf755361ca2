//! Classifier Model
//!
//! This module assembles the layers into a strictly sequential, named
//! classifier. The architecture vocabulary is small and feed-forward, so
//! layers live in an ordered, immutable list and sub-networks are plain
//! index ranges over it - no graph structure is needed.
//!
//! ## Architecture Overview (the digit preset)
//!
//! ```text
//! Input [1, 28, 28, 1]
//!     |
//! conv: Conv2d 32 filters, 3x3, ReLU   -> [1, 26, 26, 32]
//!     |
//! pool: MaxPool2d 2x2                  -> [1, 13, 13, 32]
//!     |
//! flatten                              -> [1, 5408]
//!     |
//! dense: Dense 128, ReLU               -> [1, 128]
//!     |
//! softmax: Dense 10, softmax           -> [1, 10]
//! ```
//!
//! ## Sharing
//!
//! A `Classifier` is immutable after construction and holds no interior
//! mutability, so it can be shared freely across threads. Every forward
//! or backward call allocates its own activations and caches.
//!
//! ## Example
//!
//! ```rust
//! use inkling::{Classifier, Tensor};
//!
//! let model = Classifier::mnist(42);
//! let input = Tensor::zeros(vec![1, 28, 28, 1]);
//! let probs = model.forward(&input);
//! assert_eq!(probs.shape, vec![1, 10]);
//! ```

use crate::error::{Error, Result};
use crate::layers::{
    Activation, Conv2d, Conv2dCache, Dense, DenseCache, Flatten, FlattenCache, MaxPool2d,
    MaxPool2dCache,
};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A single classifier layer
///
/// The enum covers the full layer vocabulary of the deployed
/// architecture. Each variant dispatches to the corresponding layer
/// module's forward/backward pair.
pub enum Layer {
    /// Convolution with fused ReLU
    Conv2d(Conv2d),
    /// Max pooling
    MaxPool2d(MaxPool2d),
    /// Spatial-to-row reshape
    Flatten(Flatten),
    /// Fully connected layer with fused activation
    Dense(Dense),
}

/// Per-layer cache produced by [`Layer::forward`]
pub enum LayerCache {
    /// Cache for [`Layer::Conv2d`]
    Conv2d(Conv2dCache),
    /// Cache for [`Layer::MaxPool2d`]
    MaxPool2d(MaxPool2dCache),
    /// Cache for [`Layer::Flatten`]
    Flatten(FlattenCache),
    /// Cache for [`Layer::Dense`]
    Dense(DenseCache),
}

impl Layer {
    /// Forward pass through this layer
    pub fn forward(&self, x: &Tensor) -> (Tensor, LayerCache) {
        match self {
            Layer::Conv2d(l) => {
                let (y, c) = l.forward(x);
                (y, LayerCache::Conv2d(c))
            }
            Layer::MaxPool2d(l) => {
                let (y, c) = l.forward(x);
                (y, LayerCache::MaxPool2d(c))
            }
            Layer::Flatten(l) => {
                let (y, c) = l.forward(x);
                (y, LayerCache::Flatten(c))
            }
            Layer::Dense(l) => {
                let (y, c) = l.forward(x);
                (y, LayerCache::Dense(c))
            }
        }
    }

    /// Backward pass through this layer (input gradient only)
    ///
    /// # Panics
    ///
    /// Panics if `cache` was produced by a different layer kind; callers
    /// always pair a layer with its own cache.
    pub fn backward(&self, grad_out: &Tensor, cache: &LayerCache) -> Tensor {
        match (self, cache) {
            (Layer::Conv2d(l), LayerCache::Conv2d(c)) => l.backward(grad_out, c),
            (Layer::MaxPool2d(l), LayerCache::MaxPool2d(c)) => l.backward(grad_out, c),
            (Layer::Flatten(l), LayerCache::Flatten(c)) => l.backward(grad_out, c),
            (Layer::Dense(l), LayerCache::Dense(c)) => l.backward(grad_out, c),
            _ => panic!("Layer/cache kind mismatch in backward pass"),
        }
    }
}

/// A trained feed-forward classifier: an ordered sequence of named layers
///
/// Immutable after construction. Layer names are unique and are the
/// handle the saliency computation uses to pick its split point.
pub struct Classifier {
    layers: Vec<(String, Layer)>,
}

impl Classifier {
    /// The digit-recognizer preset with seeded random weights
    ///
    /// Architecture: conv(32 filters, 3x3, ReLU) -> maxpool(2) -> flatten
    /// -> dense(128, ReLU) -> dense(10, softmax), for 28x28x1 inputs.
    /// Weights come from a seeded He-scaled normal; the same seed always
    /// yields the same classifier. Training the weights is an external
    /// concern.
    pub fn mnist(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = vec![
            (
                "conv".to_string(),
                Layer::Conv2d(Conv2d::new(1, 32, 3, true, &mut rng)),
            ),
            ("pool".to_string(), Layer::MaxPool2d(MaxPool2d::new(2))),
            ("flatten".to_string(), Layer::Flatten(Flatten::new())),
            (
                "dense".to_string(),
                Layer::Dense(Dense::new(13 * 13 * 32, 128, Activation::Relu, &mut rng)),
            ),
            (
                "softmax".to_string(),
                Layer::Dense(Dense::new(128, 10, Activation::Softmax, &mut rng)),
            ),
        ];
        Self { layers }
    }

    /// Number of layers
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Layer names in definition order
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Position of a layer by name
    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|(n, _)| n == name)
    }

    /// Layer at a given position
    pub(crate) fn layer(&self, index: usize) -> &Layer {
        &self.layers[index].1
    }

    /// Number of output classes (width of the final dense layer)
    pub fn num_classes(&self) -> usize {
        match &self.layers.last().expect("classifier has layers").1 {
            Layer::Dense(d) => d.out_features,
            _ => unreachable!("builder guarantees a dense output layer"),
        }
    }

    /// Full forward pass: input tensor to class probabilities
    pub fn forward(&self, input: &Tensor) -> Tensor {
        let mut x = input.clone();
        for (_, layer) in &self.layers {
            let (y, _) = layer.forward(&x);
            x = y;
        }
        x
    }

    /// Predicted class: argmax of the full forward pass
    pub fn predict(&self, input: &Tensor) -> usize {
        self.forward(input).argmax()
    }
}

/// Builds a [`Classifier`] from named layers
///
/// # Example
///
/// ```rust
/// use inkling::{Activation, ClassifierBuilder, Dense, Layer, Tensor};
///
/// let model = ClassifierBuilder::new()
///     .layer(
///         "out",
///         Layer::Dense(Dense::from_weights(
///             Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]),
///             Tensor::zeros(vec![2]),
///             Activation::Softmax,
///         )),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(model.num_classes(), 2);
/// ```
#[derive(Default)]
pub struct ClassifierBuilder {
    layers: Vec<(String, Layer)>,
}

impl ClassifierBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a named layer
    pub fn layer(mut self, name: impl Into<String>, layer: Layer) -> Self {
        self.layers.push((name.into(), layer));
        self
    }

    /// Assemble the classifier
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchitecture`] when the layer list is
    /// empty, a name repeats, or the final layer is not dense (the class
    /// count would be undefined).
    pub fn build(self) -> Result<Classifier> {
        if self.layers.is_empty() {
            return Err(Error::InvalidArchitecture(
                "classifier needs at least one layer".to_string(),
            ));
        }

        for (i, (name, _)) in self.layers.iter().enumerate() {
            if self.layers[..i].iter().any(|(n, _)| n == name) {
                return Err(Error::InvalidArchitecture(format!(
                    "duplicate layer name: {name}"
                )));
            }
        }

        if !matches!(self.layers.last(), Some((_, Layer::Dense(_)))) {
            return Err(Error::InvalidArchitecture(
                "final layer must be dense so the class count is defined".to_string(),
            ));
        }

        Ok(Classifier {
            layers: self.layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnist_preset_shapes() {
        let model = Classifier::mnist(1);
        assert_eq!(
            model.layer_names(),
            vec!["conv", "pool", "flatten", "dense", "softmax"]
        );
        assert_eq!(model.num_classes(), 10);

        let input = Tensor::zeros(vec![1, 28, 28, 1]);
        let mut x = input;
        let expected_shapes: Vec<Vec<usize>> = vec![
            vec![1, 26, 26, 32],
            vec![1, 13, 13, 32],
            vec![1, 5408],
            vec![1, 128],
            vec![1, 10],
        ];
        for (i, want) in expected_shapes.iter().enumerate() {
            let (y, _) = model.layer(i).forward(&x);
            assert_eq!(&y.shape, want, "layer {i}");
            x = y;
        }
    }

    #[test]
    fn test_forward_outputs_probabilities() {
        let model = Classifier::mnist(3);
        let input = Tensor::new(vec![0.5; 28 * 28], vec![1, 28, 28, 1]);
        let probs = model.forward(&input);
        let sum: f32 = probs.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.data.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_predict_in_range() {
        let model = Classifier::mnist(5);
        let input = Tensor::new(
            (0..28 * 28).map(|i| (i % 256) as f32 / 255.0).collect(),
            vec![1, 28, 28, 1],
        );
        assert!(model.predict(&input) < 10);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = Classifier::mnist(99);
        let b = Classifier::mnist(99);
        let input = Tensor::new(
            (0..28 * 28).map(|i| ((i * 7) % 100) as f32 / 100.0).collect(),
            vec![1, 28, 28, 1],
        );
        assert_eq!(a.forward(&input).data, b.forward(&input).data);
    }

    #[test]
    fn test_layer_index_lookup() {
        let model = Classifier::mnist(0);
        assert_eq!(model.layer_index("conv"), Some(0));
        assert_eq!(model.layer_index("softmax"), Some(4));
        assert_eq!(model.layer_index("missing"), None);
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = ClassifierBuilder::new()
            .layer(
                "dense",
                Layer::Dense(Dense::new(4, 4, Activation::Relu, &mut rng)),
            )
            .layer(
                "dense",
                Layer::Dense(Dense::new(4, 2, Activation::Softmax, &mut rng)),
            )
            .build();
        assert!(matches!(result, Err(Error::InvalidArchitecture(_))));
    }

    #[test]
    fn test_builder_rejects_empty() {
        assert!(matches!(
            ClassifierBuilder::new().build(),
            Err(Error::InvalidArchitecture(_))
        ));
    }

    #[test]
    fn test_builder_rejects_non_dense_output() {
        let result = ClassifierBuilder::new()
            .layer("pool", Layer::MaxPool2d(MaxPool2d::new(2)))
            .build();
        assert!(matches!(result, Err(Error::InvalidArchitecture(_))));
    }
}
