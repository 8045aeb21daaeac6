//! Charge prediction command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, ApiError, PredictRequest};
use crate::output::{format_currency, print_error, print_json, OutputFormat};

/// Request a charge estimate for one person
pub async fn predict(client: &ApiClient, request: PredictRequest, format: OutputFormat) -> Result<()> {
    let response = match client.predict(&request).await {
        Ok(response) => response,
        Err(e) => {
            if let Some(api_error) = e.downcast_ref::<ApiError>() {
                print_error(&headline(api_error));
                for (field, message) in field_problems(api_error) {
                    eprintln!("  {} {}", format!("{}:", field).yellow(), message);
                }
            }
            return Err(e);
        }
    };

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            println!("{}", "Predicted Annual Charges".bold());
            println!("{}", "=".repeat(40));
            println!(
                "Profile:  age {}, {}, BMI {:.1}, {} children, smoker: {}, {}",
                request.age,
                request.sex,
                request.bmi,
                request.children,
                request.smoker,
                request.region
            );
            println!();
            println!(
                "USD:      {}",
                format_currency(response.predicted_charges_usd, "USD").green().bold()
            );
            println!(
                "INR:      {}",
                format_currency(response.predicted_charges_inr, "INR").green().bold()
            );
        }
    }

    Ok(())
}

/// One-line summary; server-side failures are not the caller's input
fn headline(api_error: &ApiError) -> String {
    match api_error {
        ApiError::Rejected { error, message, .. } if api_error.is_client_error() => {
            format!("{}: {}", error, message)
        }
        ApiError::Rejected { message, .. } => format!("Service failed: {}", message),
        ApiError::Unexpected { status, .. } => format!("Service failed ({})", status),
    }
}

/// Per-field validation problems, only for rejected input
fn field_problems(api_error: &ApiError) -> Vec<(&str, &str)> {
    match api_error {
        ApiError::Rejected { details, .. } if api_error.is_client_error() => details
            .iter()
            .map(|d| (d.field.as_str(), d.message.as_str()))
            .collect(),
        _ => Vec::new(),
    }
}
