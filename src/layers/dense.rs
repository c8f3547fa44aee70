use crate::activator::Activator;
use crate::error::{Error, Result};
use crate::initializer::Initializer;
use crate::layers::{self, InitContext, Param};
use crate::matrix::Matrix;
use crate::optimizer::Optimizer;

/// A wrapper for a fully connected layer of a neural network
///
/// The weights for every neuron are stored as a single `inputs x units`
/// matrix, with each neuron's weights stored as a column, so a whole batch is
/// fed forward with one matrix product.
#[derive(Debug)]
pub struct Dense {
    inputs: usize,
    units: usize,
    /// The activation function to be used for every neuron in the layer.
    activator: Activator,
    initializer: Initializer,
    /// `None` disables the bias term.
    bias_initializer: Option<Initializer>,
    weights: Option<Param>,
    biases: Option<Param>,
}

impl Dense {
    /// Creates a new, uninitialized layer with `units` outputs.
    ///
    /// Weights default to [`Initializer::Glorot`] and biases to
    /// [`Initializer::Zero`].
    pub fn new(units: usize, activator: Activator) -> Result<Self> {
        if units < 1 {
            return Err(Error::InvalidLayer(format!(
                "dense layer units must be at least 1, got {}",
                units
            )));
        }
        Ok(Dense {
            inputs: 0,
            units,
            activator,
            initializer: Initializer::Glorot,
            bias_initializer: Some(Initializer::Zero),
            weights: None,
            biases: None,
        })
    }

    /// Sets the scheme used to seed the weights.
    pub fn initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = initializer;
        self
    }

    /// Sets the scheme used to seed the biases.
    pub fn bias_initializer(mut self, initializer: Initializer) -> Self {
        self.bias_initializer = Some(initializer);
        self
    }

    /// Drops the bias term entirely.
    pub fn without_bias(mut self) -> Self {
        self.bias_initializer = None;
        self
    }

    /// Returns the weight matrix, once initialized.
    pub fn weights(&self) -> Option<&Matrix> {
        self.weights.as_ref().map(Param::value)
    }

    /// Returns the `1 x units` bias row, once initialized and if enabled.
    pub fn biases(&self) -> Option<&Matrix> {
        self.biases.as_ref().map(Param::value)
    }

    /// Computes `inputs * weights + biases`, before activation.
    fn pre_activation(&self, inputs: &Matrix) -> Result<Matrix> {
        let weights = self.weights.as_ref().ok_or(Error::NotInitialized)?;
        let mut z = inputs.product(weights.value())?;
        if let Some(biases) = &self.biases {
            z.add(biases.value())?;
        }
        Ok(z)
    }
}

impl layers::Layer for Dense {
    fn init(&mut self, inputs: usize, context: &mut InitContext) -> Result<usize> {
        self.inputs = inputs;
        let mut weights = Matrix::new(inputs, self.units)?;
        weights.initialize(&self.initializer, inputs, self.units, context.rng());
        self.weights = Some(context.param(weights));
        if let Some(initializer) = self.bias_initializer {
            let mut biases = Matrix::new(1, self.units)?;
            biases.initialize(&initializer, inputs, self.units, context.rng());
            self.biases = Some(context.param(biases));
        }
        Ok(self.units)
    }

    fn input_len(&self) -> usize {
        self.inputs
    }

    fn output_len(&self) -> usize {
        self.units
    }

    fn forward(&self, inputs: &Matrix) -> Result<Matrix> {
        let activator = self.activator;
        let mut outputs = self.pre_activation(inputs)?;
        outputs.activate_in_place(|x| activator.f(x));
        Ok(outputs)
    }

    fn backward(
        &mut self,
        inputs: &Matrix,
        output_errors: &Matrix,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        let activator = self.activator;
        let mut delta = self.pre_activation(inputs)?;
        delta
            .activate_in_place(|x| activator.fprime(x))
            .mult(output_errors)?;

        let weights = self.weights.as_mut().ok_or(Error::NotInitialized)?;
        let weight_gradient = inputs.t().product(&delta)?;
        // Must use the weights from the forward pass, so compute this first.
        let input_errors = delta.product(&weights.value().t())?;

        weights.update(&weight_gradient, optimizer)?;
        if let Some(biases) = &mut self.biases {
            biases.update(&delta.sum_cols(), optimizer)?;
        }
        Ok(input_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;
    use crate::optimizer::Sgd;

    fn initialized(layer: Dense, inputs: usize) -> Dense {
        let mut layer = layer;
        assert_eq!(
            layer.init(inputs, &mut InitContext::new(0)).unwrap(),
            layer.output_len()
        );
        layer
    }

    #[test]
    fn zero_units_rejected() {
        assert!(Dense::new(0, Activator::ReLU).is_err());
    }

    #[test]
    fn init_allocates_parameters() {
        let layer = initialized(Dense::new(4, Activator::ReLU).unwrap(), 3);
        assert_eq!(layer.input_len(), 3);
        assert_eq!(layer.weights().unwrap().shape(), (3, 4));
        assert_eq!(layer.biases().unwrap().shape(), (1, 4));

        let layer = initialized(Dense::new(4, Activator::ReLU).unwrap().without_bias(), 3);
        assert!(layer.biases().is_none());
    }

    #[test]
    fn forward_before_init_fails() {
        let layer = Dense::new(2, Activator::Linear).unwrap();
        let inputs = Matrix::new(1, 2).unwrap();
        assert_eq!(layer.forward(&inputs), Err(Error::NotInitialized));
    }

    #[test]
    fn zero_parameters_give_zero_output() {
        let layer = initialized(
            Dense::new(5, Activator::Linear)
                .unwrap()
                .initializer(Initializer::Const(0.0))
                .bias_initializer(Initializer::Const(0.0)),
            3,
        );
        let inputs = Matrix::from_rows(&[[1.0, -2.0, 3.0], [0.5, 8.0, -1.0]]).unwrap();
        let outputs = layer.forward(&inputs).unwrap();
        assert_eq!(outputs.shape(), (2, 5));
        assert!(outputs.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn forward_applies_bias_and_activation() {
        let layer = initialized(
            Dense::new(2, Activator::ReLU)
                .unwrap()
                .initializer(Initializer::Const(1.0))
                .bias_initializer(Initializer::Const(-2.0)),
            2,
        );
        let inputs = Matrix::from_rows(&[[1.0, 2.0], [0.5, 0.5]]).unwrap();
        let outputs = layer.forward(&inputs).unwrap();
        assert_eq!(
            outputs,
            Matrix::from_rows(&[[1.0, 1.0], [0.0, 0.0]]).unwrap()
        );
    }

    #[test]
    fn backward_returns_input_errors_and_updates_parameters() {
        let mut layer = initialized(
            Dense::new(1, Activator::Linear)
                .unwrap()
                .initializer(Initializer::Const(0.5))
                .bias_initializer(Initializer::Zero),
            2,
        );
        let inputs = Matrix::from_rows(&[[1.0, 2.0]]).unwrap();
        let errors = Matrix::from_rows(&[[1.0]]).unwrap();
        let mut sgd = Sgd::new(0.1).unwrap();

        let input_errors = layer.backward(&inputs, &errors, &mut sgd).unwrap();
        // Computed with the weights as they were before the update.
        assert_eq!(input_errors, Matrix::from_rows(&[[0.5, 0.5]]).unwrap());

        let weights = layer.weights().unwrap();
        assert!((weights.get(0, 0) - 0.4).abs() < 1e-12);
        assert!((weights.get(1, 0) - 0.3).abs() < 1e-12);
        assert!((layer.biases().unwrap().get(0, 0) + 0.1).abs() < 1e-12);
    }

    #[test]
    fn backward_masks_inactive_relu_units() {
        let mut layer = initialized(
            Dense::new(2, Activator::ReLU)
                .unwrap()
                .initializer(Initializer::Const(1.0))
                .without_bias(),
            1,
        );
        let before = layer.weights().unwrap().clone();
        // A negative input keeps both units inactive, so nothing flows back.
        let inputs = Matrix::from_rows(&[[-1.0]]).unwrap();
        let errors = Matrix::from_rows(&[[3.0, 4.0]]).unwrap();
        let mut sgd = Sgd::new(0.1).unwrap();
        let input_errors = layer.backward(&inputs, &errors, &mut sgd).unwrap();
        assert_eq!(input_errors, Matrix::from_rows(&[[0.0]]).unwrap());
        assert_eq!(layer.weights().unwrap(), &before);
    }
}
