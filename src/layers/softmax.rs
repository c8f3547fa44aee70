use crate::error::{Error, Result};
use crate::layers::{self, InitContext};
use crate::matrix::Matrix;
use crate::optimizer::Optimizer;

use itertools::izip;

/// Row-wise softmax, normally the output layer of a classifier.
///
/// When this is the last layer of a model whose loss is
/// [`CategoricalCrossEntropy`](crate::loss::CategoricalCrossEntropy), the
/// loss already hands back the combined gradient `predicted - target` and
/// `backward` passes it through unchanged. That shortcut only holds for
/// that pairing; in every other position or with any other loss the full
/// softmax Jacobian is applied.
#[derive(Debug)]
pub struct Softmax {
    inputs: usize,
    outputs: usize,
    fused: bool,
}

impl Softmax {
    /// Creates a softmax layer over `outputs` classes.
    pub fn new(outputs: usize) -> Result<Self> {
        if outputs < 1 {
            return Err(Error::InvalidLayer(format!(
                "softmax outputs must be at least 1, got {}",
                outputs
            )));
        }
        Ok(Softmax {
            inputs: 0,
            outputs,
            fused: false,
        })
    }
}

impl layers::Layer for Softmax {
    fn init(&mut self, inputs: usize, _: &mut InitContext) -> Result<usize> {
        if inputs != self.outputs {
            return Err(Error::InvalidLayer(format!(
                "softmax over {} outputs cannot follow a layer with {} outputs",
                self.outputs, inputs
            )));
        }
        self.inputs = inputs;
        Ok(self.outputs)
    }

    fn input_len(&self) -> usize {
        self.inputs
    }

    fn output_len(&self) -> usize {
        self.outputs
    }

    fn forward(&self, inputs: &Matrix) -> Result<Matrix> {
        Ok(inputs.softmax())
    }

    fn backward(
        &mut self,
        inputs: &Matrix,
        output_errors: &Matrix,
        _: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        if self.fused {
            return Ok(output_errors.clone());
        }
        // dL/dz_j = s_j * (g_j - sum_k g_k * s_k)
        let probabilities = inputs.softmax();
        let mut input_errors = probabilities.clone();
        input_errors.mult(output_errors)?;
        let dots = input_errors.sum_rows();
        for (i, &dot) in dots.as_slice().iter().enumerate() {
            for (e, &s) in izip!(input_errors.row_mut(i), probabilities.row(i)) {
                *e -= s * dot;
            }
        }
        Ok(input_errors)
    }

    fn pair_with_loss(&mut self, fused_with_softmax: bool) -> bool {
        self.fused = fused_with_softmax;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;
    use crate::optimizer::Sgd;

    use approx::assert_abs_diff_eq;

    fn initialized(outputs: usize, fused: bool) -> Softmax {
        let mut layer = Softmax::new(outputs).unwrap();
        layer.init(outputs, &mut InitContext::new(0)).unwrap();
        assert!(layer.pair_with_loss(fused));
        layer
    }

    #[test]
    fn width_must_match_previous_layer() {
        let mut layer = Softmax::new(3).unwrap();
        assert!(layer.init(4, &mut InitContext::new(0)).is_err());
        assert!(Softmax::new(0).is_err());
    }

    #[test]
    fn forward_is_row_wise_softmax() {
        let layer = initialized(3, false);
        let inputs = Matrix::from_rows(&[[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]]).unwrap();
        let outputs = layer.forward(&inputs).unwrap();
        assert_eq!(outputs, inputs.softmax());
        assert_abs_diff_eq!(outputs.get(1, 0), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn fused_backward_passes_errors_through() {
        let mut layer = initialized(2, true);
        let inputs = Matrix::from_rows(&[[0.3, -0.2]]).unwrap();
        let errors = Matrix::from_rows(&[[0.25, -0.25]]).unwrap();
        let mut sgd = Sgd::new(0.1).unwrap();
        assert_eq!(layer.backward(&inputs, &errors, &mut sgd).unwrap(), errors);
    }

    #[test]
    fn unfused_backward_matches_finite_differences() {
        let mut layer = initialized(3, false);
        let inputs = Matrix::from_rows(&[[0.2, -1.0, 0.7], [1.5, 0.1, -0.4]]).unwrap();
        let errors = Matrix::from_rows(&[[1.0, -2.0, 0.5], [0.0, 3.0, -1.0]]).unwrap();
        let mut sgd = Sgd::new(0.1).unwrap();
        let analytic = layer.backward(&inputs, &errors, &mut sgd).unwrap();

        // Objective whose gradient with respect to the softmax output is `errors`.
        let objective = |z: &Matrix| {
            let mut s = z.softmax();
            s.mult(&errors).unwrap();
            s.sum()
        };
        let h = 1e-6;
        for i in 0..2 {
            for j in 0..3 {
                let mut plus = inputs.clone();
                plus.set(i, j, inputs.get(i, j) + h);
                let mut minus = inputs.clone();
                minus.set(i, j, inputs.get(i, j) - h);
                let numeric = (objective(&plus) - objective(&minus)) / (2.0 * h);
                assert_abs_diff_eq!(analytic.get(i, j), numeric, epsilon = 1e-6);
            }
        }
    }
}
