//! Model retraining command

use anyhow::Result;

use crate::client::ApiClient;
use crate::output::{format_duration_ms, print_info, print_json, print_success, OutputFormat};

/// Ask the service to retrain from its dataset
pub async fn train(client: &ApiClient, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Table) {
        print_info("Training started; this can take a while");
    }

    let response = client.train().await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&response.message);
            if let Some(rows) = response.training_rows {
                println!("Rows:     {}", rows);
            }
            if let Some(ms) = response.duration_ms {
                println!("Duration: {}", format_duration_ms(ms));
            }
        }
    }

    Ok(())
}
