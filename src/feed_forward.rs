//! A [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network).
//!
//! # Example
//!
//! Build a small classifier and run a batch of two examples through it:
//!
//! ```
//! # fn main() -> neurons::Result<()> {
//! use neurons::activator::Activator;
//! use neurons::feed_forward::Model;
//! use neurons::layers::{Dense, Softmax};
//! use neurons::loss::CategoricalCrossEntropy;
//! use neurons::matrix::Matrix;
//! use neurons::optimizer::Adam;
//!
//! let mut model = Model::new(2, CategoricalCrossEntropy, Adam::default());
//! model
//!     .add_layer(Dense::new(8, Activator::ReLU)?)?
//!     .add_layer(Dense::new(3, Activator::Linear)?)?
//!     .add_layer(Softmax::new(3)?)?;
//! model.init()?;
//!
//! let inputs = Matrix::from_rows(&[[0.1, 0.9], [0.7, 0.3]])?;
//! let predictions = model.predict(&inputs)?;
//! assert_eq!(predictions.shape(), (2, 3));
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::layers::{InitContext, Layer};
use crate::loss::Loss;
use crate::matrix::Matrix;
use crate::optimizer::Optimizer;
use crate::trainer::TrainingResults;

/// A Feedforward neural network
///
/// Layers are evaluated in the order they were added. A model must be
/// initialized with [`Model::init`] once all layers are in place, and only
/// then can it be fed forward or trained.
#[derive(Debug)]
pub struct Model {
    inputs: usize,
    layers: Vec<Box<dyn Layer>>,
    loss: Box<dyn Loss>,
    optimizer: Box<dyn Optimizer>,
    seed: u64,
    initialized: bool,
}

impl Model {
    /// Creates an empty model.
    ///
    /// Arguments:
    ///  * `inputs` - the number of values in each input example.
    ///  * `loss` - the loss minimized during training.
    ///  * `optimizer` - the update rule shared by every layer.
    pub fn new<L, O>(inputs: usize, loss: L, optimizer: O) -> Self
    where
        L: Loss + 'static,
        O: Optimizer + 'static,
    {
        Model {
            inputs,
            layers: Vec::new(),
            loss: Box::new(loss),
            optimizer: Box::new(optimizer),
            seed: 0,
            initialized: false,
        }
    }

    /// Sets the seed for parameter initialization. Defaults to 0.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Appends `layer` to the end of the network.
    pub fn add_layer<L>(&mut self, layer: L) -> Result<&mut Self>
    where
        L: Layer + 'static,
    {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        self.layers.push(Box::new(layer));
        Ok(self)
    }

    /// Wires every layer to the width of the one before it and seeds all
    /// parameters.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        if self.layers.is_empty() {
            return Err(Error::NoLayers);
        }
        if self.inputs < 1 {
            return Err(Error::InvalidLayer(format!(
                "model inputs must be at least 1, got {}",
                self.inputs
            )));
        }
        let mut context = InitContext::new(self.seed);
        let mut width = self.inputs;
        for layer in &mut self.layers {
            width = layer.init(width, &mut context)?;
        }
        let fused = self.loss.fused_with_softmax();
        if let Some(last) = self.layers.last_mut() {
            if !last.pair_with_loss(fused) {
                return Err(Error::InvalidConfig(format!(
                    "{:?} needs a Softmax output layer",
                    self.loss
                )));
            }
        }
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.inputs
    }

    /// Returns the size of the output layer from the network, or 0 if no
    /// layers have been added.
    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.output_len())
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    fn check_initialized(&self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    /// Feeds the provided `inputs` through the network, returning the
    /// inputs followed by the output of every layer.
    pub fn forward(&self, inputs: &Matrix) -> Result<Vec<Matrix>> {
        self.check_initialized()?;
        if inputs.cols() != self.inputs {
            return Err(Error::ShapeMismatch {
                op: "feed forward",
                left: inputs.shape(),
                right: (inputs.rows(), self.inputs),
            });
        }
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(inputs.clone());
        for (i, layer) in self.layers.iter().enumerate() {
            let outputs = layer.forward(&activations[i])?;
            activations.push(outputs);
        }
        Ok(activations)
    }

    /// Feeds the provided `inputs` through the network, returning only the
    /// output layer.
    pub fn predict(&self, inputs: &Matrix) -> Result<Matrix> {
        let mut activations = self.forward(inputs)?;
        activations.pop().ok_or(Error::NoLayers)
    }

    /// Returns the per-example loss of `predictions` against `targets`.
    pub fn loss(&self, predictions: &Matrix, targets: &Matrix) -> Result<Matrix> {
        self.loss.call(predictions, targets)
    }

    /// Returns the gradient of the loss with respect to `predictions`.
    pub fn loss_gradient(&self, predictions: &Matrix, targets: &Matrix) -> Result<Matrix> {
        self.loss.gradient(predictions, targets)
    }

    /// Feeds `errors` back through the network, updating every layer's
    /// parameters on the way.
    ///
    /// `activations` must be the result of [`Model::forward`] for the batch
    /// that produced `errors`. Returns the gradient with respect to the
    /// network inputs.
    pub fn backward(&mut self, activations: &[Matrix], errors: Matrix) -> Result<Matrix> {
        self.check_initialized()?;
        if activations.len() != self.layers.len() + 1 {
            return Err(Error::InvalidConfig(format!(
                "expected {} activations for backward pass, got {}",
                self.layers.len() + 1,
                activations.len()
            )));
        }
        let optimizer = self.optimizer.as_mut();
        let inputs = &activations[..self.layers.len()];
        let mut errors = errors;
        for (layer, inputs) in self.layers.iter_mut().zip(inputs).rev() {
            errors = layer.backward(inputs, &errors, optimizer)?;
        }
        Ok(errors)
    }

    /// Lets the optimizer react to the end of an epoch.
    pub fn advance_epoch(&mut self, epoch: usize, results: &TrainingResults) {
        self.optimizer.advance_epoch(epoch, results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use crate::initializer::Initializer;
    use crate::layers::{Activation, Dense, Softmax};
    use crate::loss::{CategoricalCrossEntropy, MeanSquaredError};
    use crate::optimizer::{Adam, Sgd};

    fn classifier() -> Model {
        let mut model = Model::new(2, CategoricalCrossEntropy, Adam::default()).with_seed(3);
        model
            .add_layer(Dense::new(8, Activator::Linear).unwrap())
            .unwrap()
            .add_layer(Activation::relu())
            .unwrap()
            .add_layer(Dense::new(3, Activator::Linear).unwrap())
            .unwrap()
            .add_layer(Softmax::new(3).unwrap())
            .unwrap();
        model
    }

    #[test]
    fn init_requires_layers() {
        let mut model = Model::new(2, CategoricalCrossEntropy, Adam::default());
        assert_eq!(model.init(), Err(Error::NoLayers));
    }

    #[test]
    fn init_only_once() {
        let mut model = classifier();
        model.init().unwrap();
        assert_eq!(model.init(), Err(Error::AlreadyInitialized));
        assert!(model.add_layer(Activation::relu()).is_err());
    }

    #[test]
    fn init_wires_layer_widths() {
        let mut model = classifier();
        model.init().unwrap();
        let widths: Vec<_> = model
            .layers()
            .iter()
            .map(|l| (l.input_len(), l.output_len()))
            .collect();
        assert_eq!(widths, vec![(2, 8), (8, 8), (8, 3), (3, 3)]);
        assert_eq!(model.output_len(), 3);
    }

    #[test]
    fn init_rejects_mismatched_softmax() {
        let mut model = Model::new(2, CategoricalCrossEntropy, Adam::default());
        model
            .add_layer(Dense::new(4, Activator::Linear).unwrap())
            .unwrap()
            .add_layer(Softmax::new(3).unwrap())
            .unwrap();
        assert!(matches!(model.init(), Err(Error::InvalidLayer(_))));
    }

    #[test]
    fn cross_entropy_requires_softmax_output() {
        let mut model = Model::new(1, CategoricalCrossEntropy, Sgd::new(1.0).unwrap());
        model
            .add_layer(
                Dense::new(2, Activator::Sigmoid)
                    .unwrap()
                    .initializer(Initializer::Const(0.5))
                    .without_bias(),
            )
            .unwrap();
        assert!(matches!(model.init(), Err(Error::InvalidConfig(_))));
        assert!(!model.is_initialized());

        let mut model = Model::new(2, CategoricalCrossEntropy, Adam::default());
        model
            .add_layer(Dense::new(2, Activator::Linear).unwrap())
            .unwrap()
            .add_layer(Softmax::new(2).unwrap())
            .unwrap()
            .add_layer(Activation::relu())
            .unwrap();
        assert!(matches!(model.init(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn mean_squared_error_accepts_any_output() {
        let mut model = Model::new(1, MeanSquaredError, Sgd::new(1.0).unwrap());
        model
            .add_layer(Dense::new(2, Activator::Sigmoid).unwrap())
            .unwrap();
        assert_eq!(model.init(), Ok(()));
    }

    #[test]
    fn forward_requires_init() {
        let model = classifier();
        let inputs = Matrix::new(1, 2).unwrap();
        assert_eq!(model.forward(&inputs), Err(Error::NotInitialized));
        assert_eq!(model.predict(&inputs), Err(Error::NotInitialized));
    }

    #[test]
    fn forward_records_every_activation() {
        let mut model = classifier();
        model.init().unwrap();
        let inputs = Matrix::from_rows(&[[0.5, -1.0], [2.0, 0.25], [0.0, 0.0]]).unwrap();
        let activations = model.forward(&inputs).unwrap();
        assert_eq!(activations.len(), 5);
        assert_eq!(activations[0], inputs);
        let shapes: Vec<_> = activations.iter().map(Matrix::shape).collect();
        assert_eq!(shapes, vec![(3, 2), (3, 8), (3, 8), (3, 3), (3, 3)]);
        assert_eq!(model.predict(&inputs).unwrap(), activations[4]);
    }

    #[test]
    fn forward_rejects_wrong_input_width() {
        let mut model = classifier();
        model.init().unwrap();
        assert!(model.forward(&Matrix::new(1, 3).unwrap()).is_err());
    }

    #[test]
    fn same_seed_same_predictions() {
        let inputs = Matrix::from_rows(&[[0.3, 0.6]]).unwrap();
        let mut a = classifier();
        let mut b = classifier();
        a.init().unwrap();
        b.init().unwrap();
        assert_eq!(a.predict(&inputs).unwrap(), b.predict(&inputs).unwrap());
    }

    #[test]
    fn backward_checks_activation_count() {
        let mut model = classifier();
        model.init().unwrap();
        let inputs = Matrix::new(1, 2).unwrap();
        let errors = Matrix::new(1, 3).unwrap();
        assert!(model.backward(&[inputs], errors).is_err());
    }

    #[test]
    fn backward_returns_gradient_for_inputs() {
        let mut model = Model::new(2, MeanSquaredError, Sgd::new(0.1).unwrap());
        model
            .add_layer(
                Dense::new(1, Activator::Linear)
                    .unwrap()
                    .initializer(Initializer::Const(2.0))
                    .without_bias(),
            )
            .unwrap();
        model.init().unwrap();
        let inputs = Matrix::from_rows(&[[1.0, 1.0]]).unwrap();
        let activations = model.forward(&inputs).unwrap();
        let errors = Matrix::from_rows(&[[1.0]]).unwrap();
        let grads = model.backward(&activations, errors).unwrap();
        assert_eq!(grads, Matrix::from_rows(&[[2.0, 2.0]]).unwrap());
    }

    #[test]
    fn one_step_reduces_loss() {
        let mut model = classifier();
        model.init().unwrap();
        let inputs = Matrix::from_rows(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
        let targets =
            Matrix::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]).unwrap();

        let loss_of = |model: &Model| {
            let predictions = model.predict(&inputs).unwrap();
            model.loss(&predictions, &targets).unwrap().mean()
        };
        let before = loss_of(&model);
        for _ in 0..20 {
            let activations = model.forward(&inputs).unwrap();
            let errors = model
                .loss_gradient(activations.last().unwrap(), &targets)
                .unwrap();
            model.backward(&activations, errors).unwrap();
        }
        assert!(loss_of(&model) < before);
    }
}
