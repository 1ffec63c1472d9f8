//! Synthetic training data and the model fitting step

use super::gp::{AdamConfig, GaussianProcess, Input};
use crate::error::ModelError;
use crate::models::NUM_FEATURES;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::PI;

/// Default number of synthetic training samples
pub const DEFAULT_TRAINING_SAMPLES: usize = 100;

/// Standard deviation of the label noise
const LABEL_NOISE_STD: f64 = 0.1;

/// Label noise is truncated to this many standard deviations
const LABEL_NOISE_LIMIT: f64 = 3.0 * LABEL_NOISE_STD;

/// Labeled dataset the regressor is fitted on
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub inputs: Vec<Input>,
    pub targets: Vec<f64>,
}

impl TrainingSet {
    /// Draw `n` samples: inputs from N(0, 1)^6, g-value labels from a fixed
    /// function of the inputs plus truncated gaussian noise, clamped to [0.1, 1.0].
    pub fn synthetic<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut inputs = Vec::with_capacity(n);
        let mut targets = Vec::with_capacity(n);

        for _ in 0..n {
            let mut x = [0.0; NUM_FEATURES];
            for component in x.iter_mut() {
                *component = StandardNormal.sample(rng);
            }
            let noise: f64 = StandardNormal.sample(rng);
            let noise = (noise * LABEL_NOISE_STD).clamp(-LABEL_NOISE_LIMIT, LABEL_NOISE_LIMIT);

            targets.push((target_score(&x) + noise).clamp(0.1, 1.0));
            inputs.push(x);
        }

        Self { inputs, targets }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Noise-free g-value for a synthetic input
pub fn target_score(x: &Input) -> f64 {
    let location = 0.3 + 0.4 * sigmoid(x[0] + x[1]);
    let time_bonus = 0.1 * (x[2] * PI).sin();
    let distance_penalty = -0.05 * x[5];
    location + time_bonus + distance_penalty
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// The fitting step of a training run
pub trait ModelFitter: Send + Sync {
    fn fit(&self, data: &TrainingSet) -> Result<GaussianProcess, ModelError>;
}

/// Fits an exact GP by marginal likelihood maximization
#[derive(Debug, Clone, Default)]
pub struct GaussianProcessFitter {
    adam: AdamConfig,
}

impl GaussianProcessFitter {
    pub fn new(iterations: usize, learning_rate: f64) -> Self {
        Self {
            adam: AdamConfig {
                iterations,
                learning_rate,
                ..Default::default()
            },
        }
    }
}

impl ModelFitter for GaussianProcessFitter {
    fn fit(&self, data: &TrainingSet) -> Result<GaussianProcess, ModelError> {
        GaussianProcess::fit(&data.inputs, &data.targets, &self.adam)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_synthetic_labels_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let data = TrainingSet::synthetic(200, &mut rng);
        assert_eq!(data.len(), 200);
        assert!(data.targets.iter().all(|y| (0.1..=1.0).contains(y)));
        assert!(data.inputs.iter().flatten().all(|x| x.is_finite()));
    }

    #[test]
    fn test_synthetic_reproducible_with_seed() {
        let a = TrainingSet::synthetic(10, &mut ChaCha8Rng::seed_from_u64(42));
        let b = TrainingSet::synthetic(10, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a.inputs, b.inputs);
        assert_eq!(a.targets, b.targets);
    }

    #[test]
    fn test_target_score_shape() {
        let zero = [0.0; NUM_FEATURES];
        assert!((target_score(&zero) - 0.5).abs() < 1e-12);

        let mut favorable = zero;
        favorable[0] = 3.0;
        favorable[1] = 3.0;
        assert!(target_score(&favorable) > target_score(&zero));

        let mut far = zero;
        far[5] = 2.0;
        assert!(target_score(&far) < target_score(&zero));
    }

    #[test]
    fn test_fitter_produces_model() {
        let data = TrainingSet::synthetic(30, &mut ChaCha8Rng::seed_from_u64(1));
        let fitter = GaussianProcessFitter::new(20, 0.1);
        let gp = fitter.fit(&data).unwrap();
        assert_eq!(gp.num_samples(), 30);
        assert!(gp.loss().is_finite());
    }
}
