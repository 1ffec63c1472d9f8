//! Core data models for the g-value service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of components in an encoded feature vector
pub const NUM_FEATURES: usize = 6;

/// Feature bundle describing a pickup/dropoff pair and its temporal context.
///
/// Built leniently from any JSON object: unknown keys are ignored and
/// malformed values are dropped, so deserialization never fails on an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct FeatureBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff_location: Option<String>,
    /// Estimated job duration in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,
    /// Hour of day, 0-24
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<f64>,
    /// Day of week, 0-7
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<f64>,
}

impl FeatureBundle {
    pub fn new(pickup: impl Into<String>, dropoff: impl Into<String>) -> Self {
        Self {
            pickup_location: Some(pickup.into()),
            dropoff_location: Some(dropoff.into()),
            ..Default::default()
        }
    }

    pub fn with_eta(mut self, minutes: f64) -> Self {
        self.eta = Some(minutes);
        self
    }

    pub fn with_time(mut self, hour: f64, day_of_week: f64) -> Self {
        self.time_of_day = Some(hour);
        self.day_of_week = Some(day_of_week);
        self
    }
}

impl From<Map<String, Value>> for FeatureBundle {
    fn from(map: Map<String, Value>) -> Self {
        let text = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(as_text));
        let number = |key: &str| map.get(key).and_then(as_number);

        Self {
            pickup_location: text(&["pickup_location", "pickup"]),
            dropoff_location: text(&["dropoff_location", "dropoff"]),
            eta: number("eta"),
            time_of_day: number("time_of_day"),
            day_of_week: number("day_of_week"),
        }
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Fixed-length normalized feature vector for regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EncodedVector {
    pub pickup_code: f64,
    pub dropoff_code: f64,
    /// Duration in hours, clamped to [0, 4]
    pub duration: f64,
    pub time_of_day: f64,
    pub day_of_week: f64,
    /// Mock distance derived from the locality codes, [0, 10)
    pub distance: f64,
    /// Stable seed for the heuristic fallback, derived from the raw inputs
    pub fallback_seed: u64,
}

impl EncodedVector {
    pub fn as_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.pickup_code,
            self.dropoff_code,
            self.duration,
            self.time_of_day,
            self.day_of_week,
            self.distance,
        ]
    }

    /// Duration converted back to minutes
    pub fn eta_minutes(&self) -> f64 {
        self.duration * 60.0
    }
}

/// G-value prediction as exchanged with the cache and callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub g_mean: f64,
    pub g_var: f64,
}

impl Prediction {
    pub fn new(g_mean: f64, g_var: f64) -> Self {
        Self { g_mean, g_var }
    }
}

/// Where a freshly computed prediction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Model,
    Heuristic,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Model => "model",
            PredictionSource::Heuristic => "heuristic",
        }
    }
}

/// Lifecycle state of the probabilistic regressor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegressorState {
    Uninitialized,
    Training,
    Ready,
    Degraded,
}

impl RegressorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegressorState::Uninitialized => "uninitialized",
            RegressorState::Training => "training",
            RegressorState::Ready => "ready",
            RegressorState::Degraded => "degraded",
        }
    }

    /// Numeric code exported through the state gauge
    pub fn code(&self) -> i64 {
        match self {
            RegressorState::Uninitialized => 0,
            RegressorState::Training => 1,
            RegressorState::Ready => 2,
            RegressorState::Degraded => 3,
        }
    }
}

impl std::fmt::Display for RegressorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a successful training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub iterations: usize,
    /// Final negative log marginal likelihood, averaged per sample
    pub loss: f64,
    pub lengthscale: f64,
    pub outputscale: f64,
    pub noise: f64,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundle_from_spec_keys() {
        let bundle: FeatureBundle = serde_json::from_value(json!({
            "pickup": "123 Main St",
            "dropoff": "456 Oak Ave",
            "eta": 15,
            "time_of_day": 14,
            "day_of_week": 1
        }))
        .unwrap();

        assert_eq!(bundle.pickup_location.as_deref(), Some("123 Main St"));
        assert_eq!(bundle.dropoff_location.as_deref(), Some("456 Oak Ave"));
        assert_eq!(bundle.eta, Some(15.0));
        assert_eq!(bundle.time_of_day, Some(14.0));
        assert_eq!(bundle.day_of_week, Some(1.0));
    }

    #[test]
    fn test_bundle_prefers_long_location_keys() {
        let bundle: FeatureBundle = serde_json::from_value(json!({
            "pickup_location": "A",
            "pickup": "B"
        }))
        .unwrap();
        assert_eq!(bundle.pickup_location.as_deref(), Some("A"));
    }

    #[test]
    fn test_malformed_values_dropped() {
        let bundle: FeatureBundle = serde_json::from_value(json!({
            "pickup_location": ["not", "a", "string"],
            "eta": "soon",
            "time_of_day": null,
            "day_of_week": {"nested": true},
            "unknown": 42
        }))
        .unwrap();
        assert_eq!(bundle, FeatureBundle::default());
    }

    #[test]
    fn test_numeric_strings_and_numeric_locations() {
        let bundle: FeatureBundle = serde_json::from_value(json!({
            "pickup_location": 221,
            "eta": " 22.5 "
        }))
        .unwrap();
        assert_eq!(bundle.pickup_location.as_deref(), Some("221"));
        assert_eq!(bundle.eta, Some(22.5));
    }

    #[test]
    fn test_prediction_wire_shape() {
        let json = serde_json::to_value(Prediction::new(0.5, 0.1)).unwrap();
        assert_eq!(json, json!({"g_mean": 0.5, "g_var": 0.1}));
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&RegressorState::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
