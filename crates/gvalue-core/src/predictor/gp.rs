//! Exact Gaussian process regression
//!
//! Constant mean, scaled RBF kernel and Gaussian likelihood noise. Kernel
//! hyperparameters are kept in log space and fitted by maximizing the log
//! marginal likelihood with Adam. Matrices are dense `nalgebra` types sized
//! for the small synthetic training sets the regressor uses.

use crate::error::ModelError;
use crate::models::NUM_FEATURES;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Diagonal jitter added to every covariance matrix
const JITTER: f64 = 1e-6;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Bounds on the log-space hyperparameters, keeps Adam away from degenerate kernels
const LOG_LENGTHSCALE_BOUNDS: (f64, f64) = (-3.0, 3.0);
const LOG_OUTPUTSCALE_BOUNDS: (f64, f64) = (-7.0, 2.5);
const LOG_NOISE_BOUNDS: (f64, f64) = (-9.0, 0.0);

pub type Input = [f64; NUM_FEATURES];

/// GP hyperparameters (lengthscale, outputscale and noise in log space)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    pub log_lengthscale: f64,
    pub log_outputscale: f64,
    pub log_noise: f64,
    pub mean: f64,
}

impl Hyperparameters {
    pub fn initial(mean: f64) -> Self {
        Self {
            log_lengthscale: 0.0,
            log_outputscale: 0.0,
            log_noise: (0.1f64).ln(),
            mean,
        }
    }

    pub fn lengthscale(&self) -> f64 {
        self.log_lengthscale.exp()
    }

    pub fn outputscale(&self) -> f64 {
        self.log_outputscale.exp()
    }

    pub fn noise(&self) -> f64 {
        self.log_noise.exp()
    }

    fn to_array(self) -> [f64; 4] {
        [self.log_lengthscale, self.log_outputscale, self.log_noise, self.mean]
    }

    fn from_array(a: [f64; 4]) -> Self {
        Self {
            log_lengthscale: a[0].clamp(LOG_LENGTHSCALE_BOUNDS.0, LOG_LENGTHSCALE_BOUNDS.1),
            log_outputscale: a[1].clamp(LOG_OUTPUTSCALE_BOUNDS.0, LOG_OUTPUTSCALE_BOUNDS.1),
            log_noise: a[2].clamp(LOG_NOISE_BOUNDS.0, LOG_NOISE_BOUNDS.1),
            mean: a[3],
        }
    }
}

/// Adam optimizer settings
#[derive(Debug, Clone, Copy)]
pub struct AdamConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            learning_rate: 0.1,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// A fitted Gaussian process ready for posterior evaluation
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    inputs: Vec<Input>,
    /// Lower Cholesky factor of the training covariance
    chol_l: DMatrix<f64>,
    /// K^-1 (y - mean)
    alpha: DVector<f64>,
    params: Hyperparameters,
    loss: f64,
}

impl GaussianProcess {
    /// Fit hyperparameters with Adam and condition on the training data
    pub fn fit(inputs: &[Input], targets: &[f64], adam: &AdamConfig) -> Result<Self, ModelError> {
        let n = inputs.len();
        if n == 0 || n != targets.len() {
            return Err(ModelError::TrainingFailure(format!(
                "invalid training set: {} inputs, {} targets",
                n,
                targets.len()
            )));
        }
        if adam.iterations == 0 {
            return Err(ModelError::TrainingFailure("zero training iterations".into()));
        }

        let sq_dists = pairwise_sq_dists(inputs);
        let targets = DVector::from_column_slice(targets);
        let mut theta = Hyperparameters::initial(targets.mean()).to_array();
        let mut m = [0.0; 4];
        let mut v = [0.0; 4];

        for t in 1..=adam.iterations {
            let params = Hyperparameters::from_array(theta);
            let (_, grad) = loss_and_grad(&sq_dists, &targets, &params)?;

            for i in 0..4 {
                m[i] = adam.beta1 * m[i] + (1.0 - adam.beta1) * grad[i];
                v[i] = adam.beta2 * v[i] + (1.0 - adam.beta2) * grad[i] * grad[i];
                let m_hat = m[i] / (1.0 - adam.beta1.powi(t as i32));
                let v_hat = v[i] / (1.0 - adam.beta2.powi(t as i32));
                theta[i] -= adam.learning_rate * m_hat / (v_hat.sqrt() + adam.epsilon);
            }
            theta = Hyperparameters::from_array(theta).to_array();
        }

        let params = Hyperparameters::from_array(theta);
        let (loss, _) = loss_and_grad(&sq_dists, &targets, &params)?;
        if !loss.is_finite() {
            return Err(ModelError::TrainingFailure(format!("non-finite loss {}", loss)));
        }

        let (_, chol) = factorize(&sq_dists, &params)?;
        let alpha = chol.solve(&targets.add_scalar(-params.mean));

        Ok(Self {
            inputs: inputs.to_vec(),
            chol_l: chol.l(),
            alpha,
            params,
            loss,
        })
    }

    /// Predictive mean and variance (including likelihood noise) at `x`
    pub fn posterior(&self, x: &Input) -> Result<(f64, f64), ModelError> {
        if x.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::EvaluationFailure("non-finite input".into()));
        }
        let k_star = DVector::from_iterator(
            self.inputs.len(),
            self.inputs.iter().map(|xi| rbf(sq_dist(xi, x), &self.params)),
        );

        let mean = self.params.mean + k_star.dot(&self.alpha);
        let w = self
            .chol_l
            .solve_lower_triangular(&k_star)
            .ok_or_else(|| ModelError::EvaluationFailure("singular covariance factor".into()))?;
        let latent_var = (self.params.outputscale() - w.norm_squared()).max(0.0);
        let variance = latent_var + self.params.noise();

        if !mean.is_finite() || !variance.is_finite() {
            return Err(ModelError::EvaluationFailure(format!(
                "non-finite posterior (mean {}, variance {})",
                mean, variance
            )));
        }
        Ok((mean, variance))
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Final negative log marginal likelihood per sample
    pub fn loss(&self) -> f64 {
        self.loss
    }

    pub fn num_samples(&self) -> usize {
        self.inputs.len()
    }
}

fn rbf(sq_dist: f64, params: &Hyperparameters) -> f64 {
    let l = params.lengthscale();
    params.outputscale() * (-0.5 * sq_dist / (l * l)).exp()
}

fn sq_dist(a: &Input, b: &Input) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn pairwise_sq_dists(inputs: &[Input]) -> DMatrix<f64> {
    let n = inputs.len();
    DMatrix::from_fn(n, n, |i, j| sq_dist(&inputs[i], &inputs[j]))
}

/// Kernel matrix without noise, and the Cholesky factorization of the full
/// training covariance
fn factorize(
    sq_dists: &DMatrix<f64>,
    params: &Hyperparameters,
) -> Result<(DMatrix<f64>, Cholesky<f64, Dyn>), ModelError> {
    let n = sq_dists.nrows();
    let kernel = sq_dists.map(|d| rbf(d, params));
    let covariance = &kernel + DMatrix::<f64>::identity(n, n) * (params.noise() + JITTER);
    let chol = covariance.cholesky().ok_or_else(|| {
        ModelError::TrainingFailure("covariance is not positive definite".into())
    })?;
    Ok((kernel, chol))
}

/// Negative log marginal likelihood per sample and its gradient with respect
/// to (log lengthscale, log outputscale, log noise, mean).
///
/// Each component is `0.5 * (alpha^T dK alpha - tr(K^-1 dK))`, with the trace
/// terms taken from the Cholesky factor.
fn loss_and_grad(
    sq_dists: &DMatrix<f64>,
    targets: &DVector<f64>,
    params: &Hyperparameters,
) -> Result<(f64, [f64; 4]), ModelError> {
    let n = targets.len();
    let nf = n as f64;
    let (kernel, chol) = factorize(sq_dists, params)?;

    let residual = targets.add_scalar(-params.mean);
    let alpha = chol.solve(&residual);
    let l = chol.l();
    let log_det_half: f64 = l.diagonal().iter().map(|d| d.ln()).sum();
    let lml = -0.5 * residual.dot(&alpha) - log_det_half - 0.5 * nf * LN_2PI;

    // tr(K^-1) = ||L^-1||_F^2
    let l_inv = l
        .solve_lower_triangular(&DMatrix::<f64>::identity(n, n))
        .ok_or_else(|| ModelError::TrainingFailure("singular covariance factor".into()))?;
    let tr_k_inv = l_inv.norm_squared();

    let l2 = params.lengthscale().powi(2);
    let noise = params.noise();
    let quad = |dk: &DMatrix<f64>| alpha.dot(&(dk * &alpha));

    let dk_lengthscale = kernel.zip_map(sq_dists, |k, d| k * d / l2);
    let tr_lengthscale = chol.solve(&dk_lengthscale).trace();
    // kernel = K - (noise + jitter) I
    let tr_outputscale = nf - (noise + JITTER) * tr_k_inv;

    let d_lengthscale = 0.5 * (quad(&dk_lengthscale) - tr_lengthscale);
    let d_outputscale = 0.5 * (quad(&kernel) - tr_outputscale);
    let d_noise = 0.5 * noise * (alpha.norm_squared() - tr_k_inv);
    let d_mean = alpha.sum();

    let grad = [
        -d_lengthscale / nf,
        -d_outputscale / nf,
        -d_noise / nf,
        -d_mean / nf,
    ];
    let loss = -lml / nf;

    if !loss.is_finite() || grad.iter().any(|g| !g.is_finite()) {
        return Err(ModelError::TrainingFailure("non-finite marginal likelihood".into()));
    }
    Ok((loss, grad))
}
