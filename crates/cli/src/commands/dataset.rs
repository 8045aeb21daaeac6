//! Synthetic dataset generation

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::generator::{generate, write_csv};
use predictor_lib::models::round_cents;
use std::path::Path;

use crate::output::{format_currency, print_success};

/// Generate a synthetic insurance dataset and write it as CSV
pub fn generate_dataset(rows: usize, seed: u64, output: &Path) -> Result<()> {
    if rows == 0 {
        anyhow::bail!("--rows must be at least 1");
    }

    let records = generate(rows, seed);
    write_csv(output, &records)
        .with_context(|| format!("Failed to write dataset to {}", output.display()))?;

    let smokers = records.iter().filter(|r| r.smoker == "yes").count();
    let mean = records.iter().map(|r| r.charges).sum::<f64>() / records.len() as f64;

    print_success(&format!(
        "Wrote {} records to {}",
        records.len(),
        output.display().to_string().cyan()
    ));
    println!("Seed:         {}", seed);
    println!("Smokers:      {}", smokers);
    println!("Mean charges: {}", format_currency(round_cents(mean), "USD"));

    Ok(())
}
