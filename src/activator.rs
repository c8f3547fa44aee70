//! Activation function types.

use serde_derive::{Deserialize, Serialize};

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
///
/// There is deliberately no softmax here: softmax needs a whole row at a
/// time, so it lives on [`Matrix::softmax`](crate::matrix::Matrix::softmax)
/// and in [`layers::Softmax`](crate::layers::Softmax).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activator {
    /// Rectified Linear Unit
    ReLU,
    /// The identity function
    Linear,
    /// Leaky Rectified Linear Unit
    ///
    /// Takes an `alpha` value to use for negative inputs, conventionally
    /// `0.01`.
    LeakyReLU(f64),
    /// Sigmoid function
    Sigmoid,
    /// Hyperbolic tan function
    TanH,
}

impl Activator {
    /// Evaluates `f(x)` for the selected activation function.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            Activator::ReLU => x.max(0.0),
            Activator::Linear => x,
            Activator::LeakyReLU(alpha) => if x >= 0.0 { x } else { alpha * x },
            Activator::Sigmoid => sigmoid(x),
            Activator::TanH => x.tanh(),
        }
    }

    /// Evaluates the derivative `f'(x)` at the pre-activation value `x`.
    pub fn fprime(&self, x: f64) -> f64 {
        match *self {
            Activator::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            Activator::Linear => 1.0,
            Activator::LeakyReLU(alpha) => if x >= 0.0 { 1.0 } else { alpha },
            Activator::Sigmoid => {
                let y = sigmoid(x);
                y * (1.0 - y)
            }
            Activator::TanH => {
                let y = x.tanh();
                1.0 - y * y
            }
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
