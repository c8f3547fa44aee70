use neurons::activator::Activator;
use neurons::feed_forward::Model;
use neurons::initializer::Initializer;
use neurons::layers::{Dense, Softmax};
use neurons::loss::CategoricalCrossEntropy;
use neurons::matrix::Matrix;
use neurons::optimizer::{Adam, LearningRateDecay};
use neurons::trainer::{self, DataSet, Logging, TrainTestSet, Trainer};

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process;

/// Points scattered around the unit circle, labelled by whether they fall
/// in the first/third or second/fourth quadrant.
fn generate_data(num_samples: usize, seed: u64) -> neurons::Result<DataSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    let radians = Uniform::new(0.0, 2.0 * std::f64::consts::PI);
    let noise = Uniform::new_inclusive(-0.1, 0.1);

    let mut points = Vec::with_capacity(num_samples);
    let mut classes = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        let theta = radians.sample(&mut rng);
        let point = [
            theta.cos() + noise.sample(&mut rng),
            theta.sin() + noise.sample(&mut rng),
        ];
        let class = if point[0] * point[1] > 0.0 {
            [1.0, 0.0]
        } else {
            [0.0, 1.0]
        };
        points.push(point);
        classes.push(class);
    }
    DataSet::new(Matrix::from_rows(&points)?, Matrix::from_rows(&classes)?)
}

fn score(set_name: &str, model: &Model, data: &DataSet) -> neurons::Result<()> {
    let predictions = model.predict(data.instances())?;
    let accuracy = trainer::accuracy(&predictions, data.labels())?;
    println!(
        "{} set results: {:.0} of {} correct",
        set_name,
        accuracy * data.len() as f64,
        data.len()
    );
    Ok(())
}

fn run() -> neurons::Result<()> {
    let mut data = TrainTestSet {
        train: generate_data(10_000, 1)?,
        test: generate_data(1_000, 2)?,
    };

    let mut model = Model::new(
        2,
        CategoricalCrossEntropy,
        Adam::new(0.01, 0.9, 0.999, 1e-8)?.decay(LearningRateDecay::InverseSqrt),
    );
    model
        .add_layer(
            Dense::new(16, Activator::ReLU)?
                .initializer(Initializer::He)
                .bias_initializer(Initializer::Const(0.01)),
        )?
        .add_layer(Dense::new(16, Activator::ReLU)?.initializer(Initializer::He))?
        .add_layer(Dense::new(2, Activator::Linear)?)?
        .add_layer(Softmax::new(2)?)?;
    model.init()?;

    Trainer::new(10, 50)
        .logging(Logging::Epochs(1))
        .train(&mut model, &mut data)?;

    println!();
    score("Training", &model, &data.train)?;
    score("Test", &model, &data.test)
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
