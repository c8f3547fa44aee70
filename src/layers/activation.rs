use crate::activator::Activator;
use crate::error::Result;
use crate::layers::{self, InitContext};
use crate::matrix::Matrix;
use crate::optimizer::Optimizer;

/// A parameter-free layer applying an [`Activator`] to every value.
#[derive(Debug)]
pub struct Activation {
    units: usize,
    activator: Activator,
}

impl Activation {
    pub fn new(activator: Activator) -> Self {
        Activation {
            units: 0,
            activator,
        }
    }

    pub fn relu() -> Self {
        Activation::new(Activator::ReLU)
    }
}

impl layers::Layer for Activation {
    fn init(&mut self, inputs: usize, _: &mut InitContext) -> Result<usize> {
        self.units = inputs;
        Ok(self.units)
    }

    fn input_len(&self) -> usize {
        self.units
    }

    fn output_len(&self) -> usize {
        self.units
    }

    fn forward(&self, inputs: &Matrix) -> Result<Matrix> {
        let activator = self.activator;
        Ok(inputs.activate(|x| activator.f(x)))
    }

    fn backward(
        &mut self,
        inputs: &Matrix,
        output_errors: &Matrix,
        _: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        let mut input_errors = match self.activator {
            Activator::ReLU => inputs.non_zero(),
            activator => inputs.activate(|x| activator.fprime(x)),
        };
        input_errors.mult(output_errors)?;
        Ok(input_errors)
    }
}
