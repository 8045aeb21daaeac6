//! Insurance Charge Predictor CLI
//!
//! A command-line tool for querying predictions, triggering retraining,
//! checking service health and generating training data.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{dataset, health, predict, train};
use predictor_lib::generator::{DEFAULT_ROWS, DEFAULT_SEED};
use std::path::PathBuf;

/// Insurance Charge Predictor CLI
#[derive(Parser)]
#[command(name = "ipc")]
#[command(author, version, about = "CLI for the Insurance Charge Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via IPC_API_URL env var)
    #[arg(long, env = "IPC_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service and model health
    Health,

    /// Predict annual charges for one person
    Predict {
        /// Age in years (18-100)
        #[arg(long)]
        age: f64,

        /// male or female
        #[arg(long)]
        sex: String,

        /// Body mass index (10-50)
        #[arg(long)]
        bmi: f64,

        /// Number of dependents (0-10)
        #[arg(long, allow_negative_numbers = true)]
        children: i64,

        /// yes or no
        #[arg(long)]
        smoker: String,

        /// southwest, southeast, northwest or northeast
        #[arg(long)]
        region: String,
    },

    /// Retrain the model from the service's dataset
    Train,

    /// Write a synthetic training dataset to a CSV file
    GenerateDataset {
        /// Number of records
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,

        /// Random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Output file path
        #[arg(long, short, default_value = "insurance.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Offline command; no client needed
    if let Commands::GenerateDataset { rows, seed, output } = &cli.command {
        return dataset::generate_dataset(*rows, *seed, output);
    }

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
        Commands::Predict {
            age,
            sex,
            bmi,
            children,
            smoker,
            region,
        } => {
            let request = client::PredictRequest {
                age,
                sex,
                bmi,
                children,
                smoker,
                region,
            };
            predict::predict(&client, request, cli.format).await?;
        }
        Commands::Train => {
            train::train(&client, cli.format).await?;
        }
        Commands::GenerateDataset { .. } => {}
    }

    Ok(())
}
