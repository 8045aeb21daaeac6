//! Service health command

use anyhow::Result;
use colored::Colorize;
use predictor_lib::health::{ComponentHealth, ComponentStatus};
use tabled::{settings::Style, Table, Tabled};

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_warning, OutputFormat};

/// Row for the components table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show service and model health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(50));
            println!("Endpoint:      {}", client.base_url().as_str().cyan());
            println!("Status:        {}", color_status(&health.status));
            println!("Version:       {}", health.version);
            println!("Checked At:    {}", format_timestamp(&health.timestamp));
            println!();
            println!("{}", "Model".bold());
            println!("{}", "-".repeat(50));
            println!("State:         {}", color_status(&health.state));
            println!(
                "Loaded:        {}",
                if health.model_loaded {
                    "yes".green()
                } else {
                    "no".red()
                }
            );
            if let Some(rows) = health.training_rows {
                println!("Training Rows: {}", rows);
            }
            if let Some(trained_at) = health.trained_at.and_then(|t| chrono::DateTime::from_timestamp(t, 0)) {
                println!("Trained At:    {}", trained_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if let Some(checksum) = &health.model_checksum {
                println!("Checksum:      {}", short_checksum(checksum));
            }

            if health.components.is_empty() {
                println!();
                print_warning("No components reported");
                return Ok(());
            }

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(component_status(component)),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!();
            println!("{}", table);
        }
    }

    Ok(())
}

fn component_status(component: &ComponentHealth) -> &'static str {
    match component.status {
        ComponentStatus::Healthy => "healthy",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "unhealthy",
    }
}

fn short_checksum(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

/// Format timestamp for display
fn format_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}
