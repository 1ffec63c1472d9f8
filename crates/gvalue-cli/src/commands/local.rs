//! Offline commands that run the encoder and heuristic in-process

use anyhow::Result;
use colored::Colorize;
use gvalue_core::predictor::{FallbackPredictor, FeatureEncoder};

use super::FeatureArgs;
use crate::output::{color_g_mean, print_json, print_rows, FieldRow, OutputFormat};

/// Show the encoded feature vector for a set of raw features
pub fn encode(features: &FeatureArgs, format: OutputFormat) -> Result<()> {
    let vector = FeatureEncoder::new().encode(&features.to_bundle());

    match format {
        OutputFormat::Json => print_json(&vector)?,
        OutputFormat::Table => {
            println!("{}", "Encoded Features".bold());
            print_rows(vec![
                FieldRow::new("pickup_code", format!("{:.3}", vector.pickup_code)),
                FieldRow::new("dropoff_code", format!("{:.3}", vector.dropoff_code)),
                FieldRow::new("duration (h)", format!("{:.4}", vector.duration)),
                FieldRow::new("time_of_day", format!("{:.4}", vector.time_of_day)),
                FieldRow::new("day_of_week", format!("{:.4}", vector.day_of_week)),
                FieldRow::new("distance", format!("{:.3}", vector.distance)),
                FieldRow::new("fallback_seed", format!("{:#018x}", vector.fallback_seed)),
            ]);
        }
    }

    Ok(())
}

/// Show the heuristic prediction used when no trained model is available
pub fn heuristic(features: &FeatureArgs, format: OutputFormat) -> Result<()> {
    let vector = FeatureEncoder::new().encode(&features.to_bundle());
    let prediction = FallbackPredictor::predict(&vector);

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            println!("{}", "Heuristic Prediction".bold());
            print_rows(vec![
                FieldRow::new("ETA (min)", format!("{:.1}", vector.eta_minutes())),
                FieldRow::new("Mean", color_g_mean(prediction.g_mean)),
                FieldRow::new("Variance", format!("{:.4}", prediction.g_var)),
            ]);
        }
    }

    Ok(())
}
