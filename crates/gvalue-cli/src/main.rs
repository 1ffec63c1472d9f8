//! G-Value CLI
//!
//! A command-line tool for requesting worker-order g-value predictions,
//! triggering model training, and inspecting the feature encoding and
//! heuristic fallback locally.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{local, model, predict, FeatureArgs};

/// G-Value prediction service CLI
#[derive(Parser)]
#[command(name = "gv")]
#[command(author, version, about = "CLI for the G-Value prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GV_API_URL env var)
    #[arg(long, env = "GV_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get the g-value for a worker-order pairing
    Predict {
        /// Worker identifier
        worker_id: String,

        /// Order identifier
        order_id: String,

        #[command(flatten)]
        features: FeatureArgs,
    },

    /// Retrain the model on the service
    Train,

    /// Remove a cached prediction
    Invalidate {
        /// Worker identifier
        worker_id: String,

        /// Order identifier
        order_id: String,
    },

    /// Show service and component health
    Health,

    /// Encode features locally and show the resulting vector
    Encode {
        #[command(flatten)]
        features: FeatureArgs,
    },

    /// Compute the heuristic fallback prediction locally
    Heuristic {
        #[command(flatten)]
        features: FeatureArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.format;

    // Local commands never touch the network
    match &cli.command {
        Commands::Encode { features } => return local::encode(features, format),
        Commands::Heuristic { features } => return local::heuristic(features, format),
        _ => {}
    }

    let api_url = config::Config::load()?.resolve_api_url(cli.api_url);
    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Predict {
            worker_id,
            order_id,
            features,
        } => {
            predict::predict(&client, &worker_id, &order_id, &features, format).await?;
        }
        Commands::Train => {
            model::train(&client, format).await?;
        }
        Commands::Invalidate {
            worker_id,
            order_id,
        } => {
            predict::invalidate(&client, &worker_id, &order_id, format).await?;
        }
        Commands::Health => {
            model::health(&client, format).await?;
        }
        Commands::Encode { .. } | Commands::Heuristic { .. } => {}
    }

    Ok(())
}
