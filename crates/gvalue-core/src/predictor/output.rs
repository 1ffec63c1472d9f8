//! Prediction output post-processing
//!
//! Raw model and heuristic outputs are clamped here so every freshly
//! computed prediction respects the same bounds, whichever path produced it.

use crate::models::Prediction;

/// Lowest g-value mean ever reported
pub const MIN_G_MEAN: f64 = 0.1;

/// Highest g-value mean ever reported
pub const MAX_G_MEAN: f64 = 1.0;

/// Lowest g-value variance ever reported
pub const MIN_G_VAR: f64 = 0.01;

/// Highest g-value variance ever reported
pub const MAX_G_VAR: f64 = 0.5;

/// Clamps raw (mean, variance) pairs into a `Prediction`
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter;

impl OutputFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Clamp raw outputs. Non-finite values collapse to the lower bound.
    pub fn format(&self, raw_mean: f64, raw_var: f64) -> Prediction {
        Prediction {
            g_mean: clamp_finite(raw_mean, MIN_G_MEAN, MAX_G_MEAN),
            g_var: clamp_finite(raw_var, MIN_G_VAR, MAX_G_VAR),
        }
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}
