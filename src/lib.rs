//! A small feed-forward neural network engine.
//!
//! Everything is built on a dense [`Matrix`](matrix::Matrix) kernel. A
//! [`Model`](feed_forward::Model) stacks [`layers`], evaluates a
//! [`loss`], and hands each layer's gradients to an [`optimizer`]; a
//! [`Trainer`](trainer::Trainer) drives mini-batch training over a
//! [`TrainTestSet`](trainer::TrainTestSet).
//!
//! Gradients come from explicit per-layer backward rules rather than
//! automatic differentiation. All computation is single threaded.

pub mod activator;
pub mod error;
pub mod feed_forward;
pub mod initializer;
pub mod layers;
pub mod loss;
pub mod matrix;
pub mod optimizer;
pub mod trainer;

pub use error::{Error, Result};
