//! Loss functions comparing predictions against expected labels.
//!
//! Both arguments are `examples x outputs` matrices with one example per row.

use crate::error::{Error, Result};
use crate::matrix::Matrix;

use itertools::izip;
use std::fmt;

/// Guards `log2` against zero probabilities.
const EPSILON: f64 = 1e-5;

pub trait Loss: fmt::Debug {
    /// Returns a column holding the loss for each example.
    fn call(&self, observed: &Matrix, expected: &Matrix) -> Result<Matrix>;

    /// Returns the gradient of the loss with respect to `observed`.
    fn gradient(&self, observed: &Matrix, expected: &Matrix) -> Result<Matrix>;

    /// True if `gradient` is already the gradient with respect to the
    /// inputs of a softmax output layer, rather than its outputs.
    fn fused_with_softmax(&self) -> bool {
        false
    }
}

fn check(observed: &Matrix, expected: &Matrix) -> Result<()> {
    if observed.shape() != expected.shape() {
        return Err(Error::ShapeMismatch {
            op: "compute loss of",
            left: observed.shape(),
            right: expected.shape(),
        });
    }
    Ok(())
}

/// Cross entropy over one-hot labels, measured in bits.
///
/// Meant to follow a [`Softmax`](crate::layers::Softmax) output layer: its
/// gradient `observed - expected` is the gradient with respect to the
/// softmax inputs.
#[derive(Copy, Clone, Debug, Default)]
pub struct CategoricalCrossEntropy;

impl Loss for CategoricalCrossEntropy {
    fn call(&self, observed: &Matrix, expected: &Matrix) -> Result<Matrix> {
        check(observed, expected)?;
        let mut losses = Matrix::new(observed.rows(), 1)?;
        for i in 0..observed.rows() {
            let sum: f64 = izip!(observed.row(i), expected.row(i))
                .map(|(&o, &e)| e * (o + EPSILON).log2())
                .sum();
            losses.set(i, 0, -sum);
        }
        Ok(losses)
    }

    fn gradient(&self, observed: &Matrix, expected: &Matrix) -> Result<Matrix> {
        let mut grads = observed.clone();
        grads.sub(expected)?;
        Ok(grads)
    }

    fn fused_with_softmax(&self) -> bool {
        true
    }
}

/// Mean of the squared differences across each example's outputs.
#[derive(Copy, Clone, Debug, Default)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn call(&self, observed: &Matrix, expected: &Matrix) -> Result<Matrix> {
        let mut diff = observed.clone();
        diff.sub(expected)?.activate_in_place(|x| x * x);
        let means = diff.mean_rows();
        Matrix::from_vec(observed.rows(), 1, means.as_slice().to_vec())
    }

    fn gradient(&self, observed: &Matrix, expected: &Matrix) -> Result<Matrix> {
        let mut grads = observed.clone();
        grads.sub(expected)?.multn(2.0 / observed.cols() as f64);
        Ok(grads)
    }
}
