//! Insurance predictor - charge prediction service
//!
//! Loads or trains the model in the background, then serves predictions,
//! retraining, health and metrics over HTTP.

use anyhow::{Context, Result};
use insurance_server::{
    api::{self, AppState, SERVICE_VERSION},
    config::ServiceConfig,
};
use std::fs::{File, OpenOptions};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load().context("invalid configuration")?;
    init_tracing(&config)?;

    info!(
        port = config.port,
        dataset = %config.dataset_path.display(),
        model = %config.model_path.display(),
        "Service configured"
    );

    let instance = std::env::var("HOSTNAME").unwrap_or_else(|_| "insurance-predictor".to_string());
    let state = Arc::new(AppState::new(&config, &instance));
    state.logger.log_startup(SERVICE_VERSION, config.port);

    // Requests arriving before this finishes wait on the lifecycle gate
    let init_state = state.clone();
    tokio::spawn(async move { init_state.initialize().await });

    let logger = state.logger.clone();
    api::serve(config.port, state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(config: &ServiceConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;

    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let file: File = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(fmt::layer().json().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(config.log_json.then(|| fmt::layer().json()))
        .with((!config.log_json).then(fmt::layer))
        .with(file_layer)
        .init();

    Ok(())
}
