//! Service configuration

use anyhow::{bail, Result};
use predictor_lib::{ForestConfig, LifecycleConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Base name of the optional config file (`insurance.toml`, `.yaml`, `.json`)
const CONFIG_FILE: &str = "insurance";

/// Prefix for environment overrides, e.g. `INSURANCE_PORT`
const ENV_PREFIX: &str = "INSURANCE";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Training CSV
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_encoders_path")]
    pub encoders_path: PathBuf,

    /// Fixed USD → INR conversion rate
    #[serde(default = "default_usd_to_inr_rate")]
    pub usd_to_inr_rate: f64,

    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Also append logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    #[serde(default)]
    pub security_headers: bool,

    #[serde(default = "default_training_timeout_secs")]
    pub training_timeout_secs: u64,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

fn default_port() -> u16 {
    5000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("insurance.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("insurance_model.bin")
}

fn default_encoders_path() -> PathBuf {
    PathBuf::from("label_encoders.bin")
}

fn default_usd_to_inr_rate() -> f64 {
    predictor_lib::predictor::DEFAULT_USD_TO_INR_RATE
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_training_timeout_secs() -> u64 {
    300
}

fn default_n_estimators() -> usize {
    ForestConfig::default().n_estimators
}

fn default_max_depth() -> usize {
    ForestConfig::default().max_depth
}

fn default_random_seed() -> u64 {
    ForestConfig::default().random_seed
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            dataset_path: default_dataset_path(),
            model_path: default_model_path(),
            encoders_path: default_encoders_path(),
            usd_to_inr_rate: default_usd_to_inr_rate(),
            log_level: default_log_level(),
            log_file: None,
            log_json: true,
            enable_metrics: true,
            security_headers: false,
            training_timeout_secs: default_training_timeout_secs(),
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            random_seed: default_random_seed(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: config::Config) -> Result<Self> {
        let service: ServiceConfig = config.try_deserialize()?;
        service.validate()?;
        Ok(service)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.usd_to_inr_rate.is_finite() || self.usd_to_inr_rate <= 0.0 {
            bail!(
                "usd_to_inr_rate must be a positive number, got {}",
                self.usd_to_inr_rate
            );
        }
        if self.n_estimators == 0 {
            bail!("n_estimators must be at least 1");
        }
        if self.max_depth == 0 {
            bail!("max_depth must be at least 1");
        }
        if self.training_timeout_secs == 0 {
            bail!("training_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn forest(&self) -> ForestConfig {
        ForestConfig {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            random_seed: self.random_seed,
        }
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            dataset_path: self.dataset_path.clone(),
            forest: self.forest(),
            training_timeout: Duration::from_secs(self.training_timeout_secs),
        }
    }
}
