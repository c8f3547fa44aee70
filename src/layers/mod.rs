//! Layers that can be stacked into a [`Model`](crate::feed_forward::Model).
//!
//! Every layer discovers its input width at [`Layer::init`], transforms a
//! batch of activations (one example per row) in [`Layer::forward`], and
//! turns the error at its output into the error at its input in
//! [`Layer::backward`]. Layers owning parameters apply one optimizer step to
//! each of them during `backward`.

mod activation;
mod dense;
mod softmax;

pub use self::activation::Activation;
pub use self::dense::Dense;
pub use self::softmax::Softmax;

use crate::error::Result;
use crate::matrix::Matrix;
use crate::optimizer::Optimizer;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;

pub trait Layer: fmt::Debug {
    /// Allocates and seeds any parameters for `inputs` incoming values.
    ///
    /// Returns the number of outputs the next layer should expect.
    fn init(&mut self, inputs: usize, context: &mut InitContext) -> Result<usize>;

    /// Returns the number of inputs to this layer, or 0 before `init`.
    fn input_len(&self) -> usize;

    /// Returns the number of outputs from this layer.
    fn output_len(&self) -> usize;

    /// Feeds `inputs` forward, returning a newly allocated output.
    fn forward(&self, inputs: &Matrix) -> Result<Matrix>;

    /// Feeds `output_errors`, the loss gradient with respect to this layer's
    /// output, backwards through the layer and returns the gradient with
    /// respect to `inputs`.
    ///
    /// `inputs` must be the same activations previously passed to
    /// `forward`.
    fn backward(
        &mut self,
        inputs: &Matrix,
        output_errors: &Matrix,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix>;

    /// Told by the model when this is its output layer whether the loss
    /// gradient has already been folded through a softmax.
    ///
    /// Returns false if the layer cannot back-propagate that gradient. Only
    /// a softmax output accepts a fused gradient.
    fn pair_with_loss(&mut self, fused_with_softmax: bool) -> bool {
        !fused_with_softmax
    }
}

/// Identifies one parameter matrix for the lifetime of a model.
///
/// Optimizers key their per-parameter state by this id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(usize);

/// A learnable matrix together with its identity.
#[derive(Clone, Debug)]
pub struct Param {
    id: ParamId,
    value: Matrix,
}

impl Param {
    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn value(&self) -> &Matrix {
        &self.value
    }

    /// Applies one optimizer step using `gradient`.
    fn update(&mut self, gradient: &Matrix, optimizer: &mut dyn Optimizer) -> Result<()> {
        optimizer.update(self.id, &mut self.value, gradient)
    }
}

/// Shared state handed to each layer while a model is initialized.
#[derive(Debug)]
pub struct InitContext {
    rng: StdRng,
    next_param: usize,
}

impl InitContext {
    /// Creates a context whose random draws are fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        InitContext {
            rng: StdRng::seed_from_u64(seed),
            next_param: 0,
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Wraps `value` as a parameter with a fresh, unique id.
    pub fn param(&mut self, value: Matrix) -> Param {
        let id = ParamId(self.next_param);
        self.next_param += 1;
        Param { id, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_get_unique_ids() {
        let mut context = InitContext::new(0);
        let a = context.param(Matrix::new(1, 1).unwrap());
        let b = context.param(Matrix::new(1, 1).unwrap());
        assert_ne!(a.id(), b.id());
    }
}
