//! Optimizers applying gradient updates to layer parameters.

use crate::error::{Error, Result};
use crate::layers::ParamId;
use crate::matrix::Matrix;
use crate::trainer::TrainingResults;

use itertools::izip;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A gradient-based update rule shared by every layer of a model.
pub trait Optimizer: fmt::Debug {
    /// Moves `param` one step against `gradient`, in place.
    ///
    /// Any per-parameter state is keyed by `id`, so distinct parameters never
    /// share accumulators.
    fn update(&mut self, id: ParamId, param: &mut Matrix, gradient: &Matrix) -> Result<()>;

    /// Called once at the end of every epoch, numbered from 1.
    fn advance_epoch(&mut self, epoch: usize, results: &TrainingResults);

    /// Returns the learning rate currently in effect.
    fn learning_rate(&self) -> f64;
}

/// How the learning rate evolves between epochs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningRateDecay {
    /// The learning rate never changes.
    Constant,
    /// After epoch `n` the learning rate is `initial / sqrt(n)`.
    InverseSqrt,
}

impl LearningRateDecay {
    fn apply(&self, initial: f64, epoch: usize) -> f64 {
        match *self {
            LearningRateDecay::Constant => initial,
            LearningRateDecay::InverseSqrt => initial / (epoch.max(1) as f64).sqrt(),
        }
    }
}

fn check_learning_rate(rate: f64) -> Result<()> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {}",
            rate
        )));
    }
    Ok(())
}

fn check_gradient(param: &Matrix, gradient: &Matrix) -> Result<()> {
    if param.shape() != gradient.shape() {
        return Err(Error::ShapeMismatch {
            op: "apply gradient to",
            left: param.shape(),
            right: gradient.shape(),
        });
    }
    Ok(())
}

/// Plain stochastic gradient descent: `param -= rate * gradient`.
#[derive(Clone, Debug)]
pub struct Sgd {
    initial_rate: f64,
    rate: f64,
    decay: LearningRateDecay,
}

impl Sgd {
    pub fn new(rate: f64) -> Result<Self> {
        check_learning_rate(rate)?;
        Ok(Sgd {
            initial_rate: rate,
            rate,
            decay: LearningRateDecay::Constant,
        })
    }

    pub fn decay(mut self, decay: LearningRateDecay) -> Self {
        self.decay = decay;
        self
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, _: ParamId, param: &mut Matrix, gradient: &Matrix) -> Result<()> {
        check_gradient(param, gradient)?;
        for (p, &g) in izip!(param.as_mut_slice(), gradient.as_slice()) {
            *p -= self.rate * g;
        }
        Ok(())
    }

    fn advance_epoch(&mut self, epoch: usize, _: &TrainingResults) {
        self.rate = self.decay.apply(self.initial_rate, epoch);
    }

    fn learning_rate(&self) -> f64 {
        self.rate
    }
}

/// First and second moment estimates for one parameter.
#[derive(Clone, Debug)]
struct Moments {
    mean: Matrix,
    variance: Matrix,
    steps: i32,
}

/// [Adam](https://arxiv.org/abs/1412.6980) with bias-corrected moments.
#[derive(Clone, Debug)]
pub struct Adam {
    initial_alpha: f64,
    alpha: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    decay: LearningRateDecay,
    moments: HashMap<ParamId, Moments>,
}

impl Default for Adam {
    /// `alpha = 0.001`, `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-8`.
    fn default() -> Self {
        Adam {
            initial_alpha: 0.001,
            alpha: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            decay: LearningRateDecay::Constant,
            moments: HashMap::new(),
        }
    }
}

impl Adam {
    /// Creates an optimizer with explicit hyperparameters.
    ///
    /// Fails unless `alpha` and `epsilon` are positive and both betas lie in
    /// `[0, 1)`.
    pub fn new(alpha: f64, beta1: f64, beta2: f64, epsilon: f64) -> Result<Self> {
        check_learning_rate(alpha)?;
        for &(name, beta) in &[("beta1", beta1), ("beta2", beta2)] {
            if !(beta.is_finite() && (0.0..1.0).contains(&beta)) {
                return Err(Error::InvalidConfig(format!(
                    "adam {} must be finite and in [0,1), got {}",
                    name, beta
                )));
            }
        }
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "adam epsilon must be finite and > 0, got {}",
                epsilon
            )));
        }
        Ok(Adam {
            initial_alpha: alpha,
            alpha,
            beta1,
            beta2,
            epsilon,
            ..Adam::default()
        })
    }

    pub fn decay(mut self, decay: LearningRateDecay) -> Self {
        self.decay = decay;
        self
    }

    /// Returns how many updates have been applied to the parameter `id`.
    pub fn steps(&self, id: ParamId) -> usize {
        self.moments.get(&id).map_or(0, |m| m.steps as usize)
    }
}

impl Optimizer for Adam {
    fn update(&mut self, id: ParamId, param: &mut Matrix, gradient: &Matrix) -> Result<()> {
        check_gradient(param, gradient)?;
        let moments = self.moments.entry(id).or_insert_with(|| Moments {
            mean: Matrix::new_like(param),
            variance: Matrix::new_like(param),
            steps: 0,
        });
        check_gradient(&moments.mean, gradient)?;

        moments.steps += 1;
        let mean_correction = 1.0 - self.beta1.powi(moments.steps);
        let variance_correction = 1.0 - self.beta2.powi(moments.steps);
        for (p, &g, m, v) in izip!(
            param.as_mut_slice(),
            gradient.as_slice(),
            moments.mean.as_mut_slice(),
            moments.variance.as_mut_slice()
        ) {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / mean_correction;
            let v_hat = *v / variance_correction;
            *p -= self.alpha * m_hat / (v_hat.sqrt() + self.epsilon);
        }
        Ok(())
    }

    fn advance_epoch(&mut self, epoch: usize, _: &TrainingResults) {
        self.alpha = self.decay.apply(self.initial_alpha, epoch);
    }

    fn learning_rate(&self) -> f64 {
        self.alpha
    }
}
