//! Subcommand implementations

pub mod local;
pub mod model;
pub mod predict;

use clap::Args;
use gvalue_core::FeatureBundle;

/// Raw features of a worker-order pairing; omitted values use encoder defaults
#[derive(Args, Debug, Clone, Default)]
pub struct FeatureArgs {
    /// Pickup location
    #[arg(long)]
    pub pickup: Option<String>,

    /// Dropoff location
    #[arg(long)]
    pub dropoff: Option<String>,

    /// Estimated job duration in minutes
    #[arg(long)]
    pub eta: Option<f64>,

    /// Hour of day (0-24)
    #[arg(long)]
    pub time_of_day: Option<f64>,

    /// Day of week (0-7)
    #[arg(long)]
    pub day_of_week: Option<f64>,
}

impl FeatureArgs {
    pub fn to_bundle(&self) -> FeatureBundle {
        FeatureBundle {
            pickup_location: self.pickup.clone(),
            dropoff_location: self.dropoff.clone(),
            eta: self.eta,
            time_of_day: self.time_of_day,
            day_of_week: self.day_of_week,
        }
    }
}
