//! Utilities for training neural networks.

use crate::error::{Error, Result};
use crate::feed_forward::Model;
use crate::matrix::Matrix;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_derive::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Labelled examples: one instance per row, with its label on the same row.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSet {
    instances: Matrix,
    labels: Matrix,
}

impl DataSet {
    /// Pairs `instances` with `labels`, which must have the same number of
    /// rows.
    pub fn new(instances: Matrix, labels: Matrix) -> Result<Self> {
        if instances.rows() != labels.rows() {
            return Err(Error::LabelMismatch {
                instances: instances.rows(),
                labels: labels.rows(),
            });
        }
        Ok(DataSet { instances, labels })
    }

    pub fn instances(&self) -> &Matrix {
        &self.instances
    }

    pub fn labels(&self) -> &Matrix {
        &self.labels
    }

    /// Returns the number of examples.
    pub fn len(&self) -> usize {
        self.instances.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `index`th batch of `size` instances and their labels.
    pub fn batch(&self, size: usize, index: usize) -> Result<(Matrix, Matrix)> {
        Ok((
            self.instances.batch(size, index)?,
            self.labels.batch(size, index)?,
        ))
    }

    /// Shuffles the examples in place, keeping every instance with its label.
    pub fn shuffle<R>(&mut self, rng: &mut R) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        let instances: Vec<&[f64]> = indices.iter().map(|&i| self.instances.row(i)).collect();
        let labels: Vec<&[f64]> = indices.iter().map(|&i| self.labels.row(i)).collect();
        let instances = Matrix::from_rows(&instances)?;
        let labels = Matrix::from_rows(&labels)?;
        self.instances = instances;
        self.labels = labels;
        Ok(())
    }
}

/// A training set and an independent, held-out test set.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainTestSet {
    pub train: DataSet,
    pub test: DataSet,
}

/// Losses recorded over a training run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingResults {
    /// Mean batch loss of each epoch.
    pub train_losses: Vec<f64>,
    /// Loss over the whole test set after each epoch.
    pub test_losses: Vec<f64>,
    /// Fraction of test examples classified correctly after each epoch.
    pub test_accuracies: Vec<f64>,
    /// Loss of every batch, in the order they were trained.
    pub batch_losses: Vec<f64>,
}

impl TrainingResults {
    /// Returns the number of completed epochs.
    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }
}

/// Fraction of rows whose largest prediction matches the largest label.
pub fn accuracy(predictions: &Matrix, labels: &Matrix) -> Result<f64> {
    Ok(predictions.argmax().equals(&labels.argmax())?.mean())
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Logging {
    /// No logs will be printed
    Silent,
    /// A summary will be printed at completion
    Completion,
    /// A summary will be printed after every `n` epochs
    Epochs(usize),
    /// Like `Epochs(1)`, plus the loss of every `n`th batch
    Batches(usize),
}

impl Logging {
    /// Performs logging after a batch has been trained.
    fn batch(&self, batch: usize, loss: f64) {
        if let Logging::Batches(freq) = *self {
            if freq > 0 && batch % freq == 0 {
                println!("Batch {}:\tloss={:.3}", batch, loss);
            }
        }
    }

    /// Performs logging at the end of an epoch.
    fn epoch(&self, epoch: usize, elapsed: Duration, results: &TrainingResults) {
        let freq = match *self {
            Logging::Epochs(freq) => freq,
            Logging::Batches(_) => 1,
            _ => return,
        };
        if freq == 0 || epoch % freq != 0 {
            return;
        }
        let latest = (
            results.train_losses.last(),
            results.test_losses.last(),
            results.test_accuracies.last(),
        );
        if let (Some(train), Some(test), Some(accuracy)) = latest {
            println!(
                "Epoch {} ({}ms):\ttrain_loss={:.4}\ttest_loss={:.4}\taccuracy={:.4}",
                epoch,
                elapsed.as_millis(),
                train,
                test,
                accuracy,
            );
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, results: &TrainingResults, start_time: Instant) {
        if let Logging::Silent = *self {
            return;
        }
        println!(
            "Ran {} epochs in {} seconds.",
            results.epochs(),
            start_time.elapsed().as_secs()
        );
        let train = results.train_losses.last();
        let test = results.test_losses.last();
        if let (Some(train), Some(test)) = (train, test) {
            println!("Final loss: train={:.4} test={:.4}", train, test);
        }
    }
}

/// Runs mini-batch training of a [`Model`].
#[derive(Clone, Debug)]
pub struct Trainer {
    epochs: usize,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    logging: Logging,
}

impl Trainer {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * Training examples are reshuffled after every epoch.
    /// * Shuffling is seeded with 0.
    /// * Logs on training completion.
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        Trainer {
            epochs,
            batch_size,
            shuffle: true,
            seed: 0,
            logging: Logging::Completion,
        }
    }

    /// Sets the number of passes over the training set.
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the number of examples per batch. Must evenly divide the number
    /// of training examples.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets whether the training set is reshuffled after every epoch.
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Sets the seed used for shuffling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Trains `model` on `data.train`, evaluating on `data.test` after every
    /// epoch.
    ///
    /// The training set is reshuffled in place if shuffling is enabled.
    ///
    /// Returns:
    ///   The recorded losses, or an error if invalid training parameters
    ///   were provided.
    pub fn train(&self, model: &mut Model, data: &mut TrainTestSet) -> Result<TrainingResults> {
        let total_batches = self.validate(model, data)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut results = TrainingResults::default();

        let start_time = Instant::now();
        for epoch in 1..=self.epochs {
            let epoch_start = Instant::now();
            let mut epoch_loss = 0.0;
            for batch in 0..total_batches {
                let (instances, labels) = data.train.batch(self.batch_size, batch)?;
                let activations = model.forward(&instances)?;
                let predictions = activations.last().ok_or(Error::NoLayers)?;
                let batch_loss = model.loss(predictions, &labels)?.mean();
                epoch_loss += batch_loss;
                results.batch_losses.push(batch_loss);
                self.logging.batch(batch, batch_loss);

                let errors = model.loss_gradient(predictions, &labels)?;
                model.backward(&activations, errors)?;
            }
            results.train_losses.push(epoch_loss / total_batches as f64);

            let predictions = model.predict(data.test.instances())?;
            let test_loss = model.loss(&predictions, data.test.labels())?.mean();
            results.test_losses.push(test_loss);
            results
                .test_accuracies
                .push(accuracy(&predictions, data.test.labels())?);

            if self.shuffle {
                data.train.shuffle(&mut rng)?;
            }
            model.advance_epoch(epoch, &results);
            self.logging.epoch(epoch, epoch_start.elapsed(), &results);
        }
        self.logging.completion(&results, start_time);
        Ok(results)
    }

    /// Verifies that all provided inputs to the `Trainer` are valid, returning
    /// the number of batches per epoch.
    fn validate(&self, model: &Model, data: &TrainTestSet) -> Result<usize> {
        if !model.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be > 0".to_owned()));
        }
        for set in &[&data.train, &data.test] {
            let expected = (model.input_len(), model.output_len());
            let found = (set.instances().cols(), set.labels().cols());
            if found != expected {
                return Err(Error::ShapeMismatch {
                    op: "train on",
                    left: expected,
                    right: found,
                });
            }
        }
        let samples = data.train.len();
        let remainder = samples % self.batch_size;
        if remainder != 0 {
            return Err(Error::BatchSize {
                batch_size: self.batch_size,
                samples,
                remainder,
            });
        }
        Ok(samples / self.batch_size)
    }
}

impl Model {
    /// Trains the model with the default [`Trainer`] settings except for
    /// the ones given.
    pub fn train(
        &mut self,
        data: &mut TrainTestSet,
        epochs: usize,
        batch_size: usize,
        shuffle_after_epoch: bool,
    ) -> Result<TrainingResults> {
        Trainer::new(epochs, batch_size)
            .shuffle(shuffle_after_epoch)
            .train(self, data)
    }
}
