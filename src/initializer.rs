//! Parameter initialization schemes.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde_derive::{Deserialize, Serialize};

/// Strategies for seeding weight and bias matrices.
///
/// Each call to [`Initializer::sample`] is an independent draw, scaled by
/// the fan-in and fan-out of the layer being initialized.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// Uniform in `±sqrt(6 / (fan_in + fan_out))`.
    Glorot,
    /// Uniform in `±sqrt(6 / fan_in)`.
    He,
    /// Uniform in `±sqrt(3 / fan_in)`.
    Lecun,
    Zero,
    Const(f64),
}

impl Initializer {
    /// Draws one value for a layer with `fan_in` inputs and `fan_out` outputs.
    pub fn sample<R>(&self, fan_in: usize, fan_out: usize, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
    {
        match *self {
            Initializer::Glorot => {
                uniform((6.0 / (fan_in + fan_out) as f64).sqrt(), rng)
            }
            Initializer::He => uniform((6.0 / fan_in as f64).sqrt(), rng),
            Initializer::Lecun => uniform((3.0 / fan_in as f64).sqrt(), rng),
            Initializer::Zero => 0.0,
            Initializer::Const(value) => value,
        }
    }
}

fn uniform<R>(limit: f64, rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    Uniform::new_inclusive(-limit, limit).sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn draws(init: Initializer, fan_in: usize, fan_out: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(42);
        (0..1000).map(|_| init.sample(fan_in, fan_out, &mut rng)).collect()
    }

    #[test]
    fn uniform_schemes_respect_their_limits() {
        let cases = [
            (Initializer::Glorot, (6.0f64 / 40.0).sqrt()),
            (Initializer::He, (6.0f64 / 10.0).sqrt()),
            (Initializer::Lecun, (3.0f64 / 10.0).sqrt()),
        ];
        for &(init, limit) in &cases {
            let values = draws(init, 10, 30);
            assert!(values.iter().all(|x| x.abs() <= limit));
            // Draws are independent, so they should not all be the same.
            assert!(values.iter().any(|&x| x != values[0]));
            assert!(values.iter().any(|&x| x < 0.0));
            assert!(values.iter().any(|&x| x > 0.0));
        }
    }

    #[test]
    fn constant_schemes() {
        assert!(draws(Initializer::Zero, 3, 3).iter().all(|&x| x == 0.0));
        assert!(draws(Initializer::Const(0.01), 3, 3)
            .iter()
            .all(|&x| x == 0.01));
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        assert_eq!(draws(Initializer::He, 5, 2), draws(Initializer::He, 5, 2));
    }
}
