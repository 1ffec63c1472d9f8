//! Prediction CLI commands

use anyhow::Result;
use colored::Colorize;
use gvalue_core::Prediction;

use super::FeatureArgs;
use crate::client::{ApiClient, DeleteResponse, PredictRequest};
use crate::output::{color_g_mean, print_info, print_json, print_rows, print_success, FieldRow, OutputFormat};

/// Request a g-value for a worker-order pairing
pub async fn predict(
    client: &ApiClient,
    worker_id: &str,
    order_id: &str,
    features: &FeatureArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = PredictRequest {
        worker_id: worker_id.to_string(),
        order_id: order_id.to_string(),
        features: features.to_bundle(),
    };
    let prediction: Prediction = client.post(&["predict"], &request).await?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            println!("{}", "G-Value Prediction".bold());
            println!("{}", "=".repeat(40));
            print_rows(vec![
                FieldRow::new("Worker", worker_id.cyan()),
                FieldRow::new("Order", order_id.cyan()),
                FieldRow::new("Mean", color_g_mean(prediction.g_mean)),
                FieldRow::new("Variance", format!("{:.4}", prediction.g_var)),
                FieldRow::new("Std dev", format!("{:.4}", prediction.g_var.sqrt())),
            ]);
        }
    }

    Ok(())
}

/// Drop the cached prediction for a pairing
pub async fn invalidate(
    client: &ApiClient,
    worker_id: &str,
    order_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let response: DeleteResponse = client.delete(&["predict", worker_id, order_id]).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            if response.deleted {
                print_success(&format!("Cached prediction for {}/{} removed", worker_id, order_id));
            } else {
                print_info(&format!("No cached prediction for {}/{}", worker_id, order_id));
            }
        }
    }

    Ok(())
}
