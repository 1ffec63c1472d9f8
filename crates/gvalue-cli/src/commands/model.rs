//! Model training and service health commands

use anyhow::Result;
use colored::Colorize;
use gvalue_core::HealthResponse;

use crate::client::{ApiClient, ServiceStatus, TrainResponse};
use crate::output::{color_status, print_json, print_rows, print_success, print_warning, FieldRow, OutputFormat};

/// Trigger a training run on the service
pub async fn train(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: TrainResponse = client.post(&["train"], &serde_json::json!({})).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&response.message),
    }

    Ok(())
}

/// Show liveness and per-component health
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: ServiceStatus = client.get(&["health"]).await?;
    // `/healthz` answers 503 when unhealthy; treat that as missing detail
    let components: Option<HealthResponse> = client.get(&["healthz"]).await.ok();

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "service": status,
            "health": components,
        }))?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(40));
            println!("Service: {}", status.service.cyan());
            println!("Status:  {}", color_status(&status.status));
            println!();

            let Some(health) = components else {
                print_warning("Component health unavailable");
                return Ok(());
            };

            let mut rows: Vec<FieldRow> = health
                .components
                .iter()
                .map(|(name, component)| {
                    let status = format!("{:?}", component.status).to_lowercase();
                    let value = match &component.message {
                        Some(message) => format!("{} ({})", color_status(&status), message),
                        None => color_status(&status),
                    };
                    FieldRow::new(name, value)
                })
                .collect();
            rows.sort_by(|a, b| a.field.cmp(&b.field));
            print_rows(rows);
        }
    }

    Ok(())
}
