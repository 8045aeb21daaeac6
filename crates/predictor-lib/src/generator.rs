//! Synthetic insurance dataset generation
//!
//! Produces a labelled dataset whose charges follow a multiplicative model of
//! age, BMI, children, smoking, region and sex, with ±20% noise. The same
//! seed always yields the same rows.

use crate::models::{round_cents, CategoryLabel, InsuranceRecord, Region, Sex, Smoker};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Row count of the reference dataset
pub const DEFAULT_ROWS: usize = 1338;

/// Seed of the reference dataset
pub const DEFAULT_SEED: u64 = 42;

const BASE_CHARGE: f64 = 250.0;
const SMOKER_PROBABILITY: f64 = 0.2;

/// Generate `rows` records deterministically from `seed`
pub fn generate(rows: usize, seed: u64) -> Vec<InsuranceRecord> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..rows)
        .map(|_| {
            let age: u32 = rng.gen_range(18..65);
            let sex = Sex::ALL[rng.gen_range(0..Sex::ALL.len())];
            let bmi: f64 = rng.gen_range(15.0..50.0);
            let children: u32 = rng.gen_range(0..6);
            let smoker = if rng.gen_bool(SMOKER_PROBABILITY) {
                Smoker::Yes
            } else {
                Smoker::No
            };
            let region = Region::ALL[rng.gen_range(0..Region::ALL.len())];
            let noise: f64 = rng.gen_range(0.8..1.2);

            InsuranceRecord {
                age,
                sex: sex.as_str().to_string(),
                bmi,
                children,
                smoker: smoker.as_str().to_string(),
                region: region.as_str().to_string(),
                charges: round_cents(expected_charge(age, sex, bmi, children, smoker, region) * noise),
            }
        })
        .collect()
}

/// Noise-free charge for a profile
pub fn expected_charge(
    age: u32,
    sex: Sex,
    bmi: f64,
    children: u32,
    smoker: Smoker,
    region: Region,
) -> f64 {
    let age_factor = 1.0 + (age as f64 - 18.0) * 0.02;
    let bmi_factor = 1.0 + (bmi - 25.0) * 0.01;
    let children_factor = 1.0 + children as f64 * 0.1;
    let smoker_factor = match smoker {
        Smoker::Yes => 3.0,
        Smoker::No => 1.0,
    };
    let region_factor = match region {
        Region::Southwest => 1.0,
        Region::Southeast => 1.1,
        Region::Northwest => 1.05,
        Region::Northeast => 1.15,
    };
    let sex_factor = match sex {
        Sex::Male => 1.1,
        Sex::Female => 1.0,
    };

    BASE_CHARGE
        * age_factor
        * bmi_factor
        * children_factor
        * smoker_factor
        * region_factor
        * sex_factor
}

/// Write records as a headed CSV file
pub fn write_csv(path: &Path, records: &[InsuranceRecord]) -> csv::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
