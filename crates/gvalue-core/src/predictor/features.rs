//! Feature encoding for g-value regression
//!
//! Turns a loosely typed feature bundle into the fixed six-component vector
//! the regressor consumes. Location strings are mapped to locality codes with
//! xxHash64 so the same text encodes identically in every process.

use crate::models::{EncodedVector, FeatureBundle};
use xxhash_rust::xxh64::xxh64;

/// Default ETA in minutes when the bundle has none
pub const DEFAULT_ETA_MINUTES: f64 = 15.0;

/// Default hour of day when the bundle has none
pub const DEFAULT_TIME_OF_DAY: f64 = 12.0;

/// Default day of week when the bundle has none
pub const DEFAULT_DAY_OF_WEEK: f64 = 1.0;

/// Longest ETA the encoder distinguishes (4 hours)
pub const MAX_ETA_MINUTES: f64 = 240.0;

/// Number of distinct locality buckets
const LOCALITY_BUCKETS: u64 = 1000;

/// Scale applied to the locality code difference for the distance proxy
const DISTANCE_SCALE: f64 = 10.0;

/// Encodes feature bundles into normalized vectors
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a bundle. Total: missing or malformed attributes are defaulted.
    pub fn encode(&self, bundle: &FeatureBundle) -> EncodedVector {
        let pickup = bundle.pickup_location.as_deref().unwrap_or("");
        let dropoff = bundle.dropoff_location.as_deref().unwrap_or("");
        let eta = self.eta_minutes(bundle);

        let pickup_code = locality_code(pickup);
        let dropoff_code = locality_code(dropoff);

        EncodedVector {
            pickup_code,
            dropoff_code,
            duration: eta / 60.0,
            time_of_day: self.normalize(bundle.time_of_day, DEFAULT_TIME_OF_DAY, 24.0),
            day_of_week: self.normalize(bundle.day_of_week, DEFAULT_DAY_OF_WEEK, 7.0),
            distance: (pickup_code - dropoff_code).abs() * DISTANCE_SCALE,
            fallback_seed: fallback_seed(pickup, dropoff, eta),
        }
    }

    fn eta_minutes(&self, bundle: &FeatureBundle) -> f64 {
        finite_or(bundle.eta, DEFAULT_ETA_MINUTES).clamp(0.0, MAX_ETA_MINUTES)
    }

    fn normalize(&self, value: Option<f64>, default: f64, max: f64) -> f64 {
        finite_or(value, default).clamp(0.0, max) / max
    }
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}

/// Map a free-text location to a stable code in [0, 1)
pub fn locality_code(location: &str) -> f64 {
    (xxh64(location.as_bytes(), 0) % LOCALITY_BUCKETS) as f64 / LOCALITY_BUCKETS as f64
}

/// Seed for the heuristic fallback, stable across processes and platforms
pub fn fallback_seed(pickup: &str, dropoff: &str, eta_minutes: f64) -> u64 {
    let key = format!("{}{}{}", pickup, dropoff, eta_minutes);
    xxh64(key.as_bytes(), 0)
}
