//! Model lifecycle: load, lazy training, retraining and reload
//!
//! The live artifact sits behind an `RwLock<Option<Arc<_>>>`. Predictions
//! clone the `Arc` and release the lock immediately. Training and reloading
//! are serialized by a separate gate; a new artifact is built and persisted
//! off to the side and only then swapped in, so a failed run leaves the
//! previous artifact serving.

use crate::artifact::ArtifactStore;
use crate::encoder::ForestConfig;
use crate::error::{ArtifactError, TrainingError};
use crate::health::{components, HealthRegistry};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::PredictError;
use crate::training::{train_from_path, TrainedArtifact, TrainingReport};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Default bound on one training run
pub const DEFAULT_TRAINING_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Unloaded,
    Loaded,
    TrainingInProgress,
}

/// Configuration for the lifecycle manager
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub dataset_path: PathBuf,
    pub forest: ForestConfig,
    pub training_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("insurance.csv"),
            forest: ForestConfig::default(),
            training_timeout: DEFAULT_TRAINING_TIMEOUT,
        }
    }
}

/// How `initialize` obtained its artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Loaded,
    Trained,
}

/// Point-in-time view for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleSnapshot {
    pub state: LifecycleState,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_checksum: Option<String>,
}

/// Owns the live artifact and every transition of it
pub struct ModelLifecycle {
    config: LifecycleConfig,
    store: ArtifactStore,
    current: RwLock<Option<Arc<TrainedArtifact>>>,
    state: RwLock<LifecycleState>,
    write_gate: Mutex<()>,
    health: HealthRegistry,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl ModelLifecycle {
    pub fn new(
        config: LifecycleConfig,
        store: ArtifactStore,
        health: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            config,
            store,
            current: RwLock::new(None),
            state: RwLock::new(LifecycleState::Unloaded),
            write_gate: Mutex::new(()),
            health,
            metrics,
            logger,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Load the persisted artifact, training one if none is usable
    pub async fn initialize(&self) -> Result<InitOutcome, TrainingError> {
        let _gate = self.write_gate.lock().await;
        if self.current.read().await.is_none() {
            self.health
                .register(components::MODEL, "No model loaded")
                .await;
        }

        match self.load_from_store().await {
            Ok(artifact) => {
                self.swap(artifact).await;
                Ok(InitOutcome::Loaded)
            }
            Err(e) => {
                if e.is_not_found() {
                    info!(
                        model_path = %self.store.model_path().display(),
                        "No persisted model found, training on startup"
                    );
                } else {
                    self.logger.log_artifact_rejected(&e);
                }
                self.train_and_swap().await.map(|_| InitOutcome::Trained)
            }
        }
    }

    /// Retrain from the dataset and swap the result in
    pub async fn retrain(&self) -> Result<TrainingReport, TrainingError> {
        let _gate = self.write_gate.lock().await;
        self.train_and_swap().await
    }

    /// Re-read the artifact from disk; the current one stays on failure
    pub async fn reload(&self) -> Result<(), ArtifactError> {
        let _gate = self.write_gate.lock().await;
        let artifact = self.load_from_store().await?;
        self.swap(artifact).await;
        Ok(())
    }

    /// Current artifact, loading or training it first when absent
    pub async fn ensure_loaded(&self) -> Result<Arc<TrainedArtifact>, PredictError> {
        if let Some(artifact) = self.current().await {
            return Ok(artifact);
        }

        let _gate = self.write_gate.lock().await;
        // Another task may have finished loading while we waited
        if let Some(artifact) = self.current().await {
            return Ok(artifact);
        }

        match self.load_from_store().await {
            Ok(artifact) => {
                self.swap(artifact).await;
            }
            Err(e) => {
                if !e.is_not_found() {
                    self.logger.log_artifact_rejected(&e);
                }
                self.train_and_swap()
                    .await
                    .map_err(|e| PredictError::ModelNotLoaded(e.to_string()))?;
            }
        }

        self.current()
            .await
            .ok_or_else(|| PredictError::ModelNotLoaded("artifact missing after load".to_string()))
    }

    pub async fn current(&self) -> Option<Arc<TrainedArtifact>> {
        self.current.read().await.clone()
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn snapshot(&self) -> LifecycleSnapshot {
        let state = self.state().await;
        let current = self.current().await;
        LifecycleSnapshot {
            state,
            model_loaded: current.is_some(),
            trained_at: current.as_ref().map(|a| a.encoders.trained_at),
            training_rows: current.as_ref().map(|a| a.encoders.training_rows),
            model_checksum: current.as_ref().map(|a| a.encoders.model_checksum.clone()),
        }
    }

    async fn load_from_store(&self) -> Result<TrainedArtifact, ArtifactError> {
        let store = self.store.clone();
        let artifact = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| ArtifactError::Decode {
                path: self.store.model_path().to_path_buf(),
                message: format!("load task failed: {e}"),
            })??;

        self.logger.log_model_loaded(
            &artifact.encoders.model_checksum,
            artifact.encoders.training_rows,
        );
        Ok(artifact)
    }

    /// Caller must hold the write gate
    async fn train_and_swap(&self) -> Result<TrainingReport, TrainingError> {
        self.set_state(LifecycleState::TrainingInProgress).await;
        let start = Instant::now();

        let result = self.build_and_persist().await;
        self.metrics
            .observe_training(start.elapsed().as_secs_f64(), result.is_ok());

        match result {
            Ok((artifact, report)) => {
                self.logger.log_model_trained(
                    report.rows,
                    report.duration_ms,
                    &artifact.encoders.model_checksum,
                );
                self.swap(artifact).await;
                Ok(report)
            }
            Err(e) => {
                self.settle_after_failure(&e).await;
                Err(e)
            }
        }
    }

    async fn build_and_persist(&self) -> Result<(TrainedArtifact, TrainingReport), TrainingError> {
        let dataset_path = self.config.dataset_path.clone();
        let forest = self.config.forest;
        let fit = tokio::task::spawn_blocking(move || train_from_path(&dataset_path, &forest));

        // On timeout the fit keeps running on its blocking thread, but its
        // result is dropped and never persisted
        let (artifact, report) = match tokio::time::timeout(self.config.training_timeout, fit).await
        {
            Err(_) => return Err(TrainingError::Timeout(self.config.training_timeout)),
            Ok(Err(join)) => return Err(TrainingError::Task(join.to_string())),
            Ok(Ok(result)) => result?,
        };

        let store = self.store.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(artifact))
            .await
            .map_err(|e| TrainingError::Task(e.to_string()))??;

        Ok((saved, report))
    }

    async fn swap(&self, artifact: TrainedArtifact) {
        let artifact = Arc::new(artifact);
        debug!(checksum = %artifact.encoders.model_checksum, "Swapping in new artifact");
        *self.current.write().await = Some(artifact);

        self.set_state(LifecycleState::Loaded).await;
        self.metrics.set_model_loaded(true);
        self.health.set_healthy(components::MODEL).await;
    }

    async fn settle_after_failure(&self, error: &TrainingError) {
        let kept_previous = self.is_loaded().await;
        self.logger.log_training_failure(error, kept_previous);

        if kept_previous {
            self.set_state(LifecycleState::Loaded).await;
            self.health
                .set_degraded(
                    components::MODEL,
                    "Last training run failed; serving previous model",
                )
                .await;
        } else {
            warn!("No model available after failed training");
            self.set_state(LifecycleState::Unloaded).await;
            self.metrics.set_model_loaded(false);
            self.health
                .set_unhealthy(components::MODEL, "Training failed; no model loaded")
                .await;
        }
    }

    async fn set_state(&self, state: LifecycleState) {
        *self.state.write().await = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate, write_csv};
    use crate::health::ComponentStatus;
    use crate::models::EncodedFeatureVector;
    use crate::predictor::ChargeModel;
    use tempfile::TempDir;

    fn lifecycle(dir: &TempDir) -> ModelLifecycle {
        let config = LifecycleConfig {
            dataset_path: dir.path().join("insurance.csv"),
            forest: ForestConfig {
                n_estimators: 6,
                max_depth: 5,
                random_seed: 1,
            },
            training_timeout: Duration::from_secs(120),
        };
        let store = ArtifactStore::new(
            dir.path().join("insurance_model.bin"),
            dir.path().join("label_encoders.bin"),
        );
        ModelLifecycle::new(
            config,
            store,
            HealthRegistry::new(),
            ServiceMetrics::new(),
            StructuredLogger::new("test"),
        )
    }

    fn write_dataset(dir: &TempDir, rows: usize) {
        write_csv(&dir.path().join("insurance.csv"), &generate(rows, 42)).unwrap();
    }

    #[tokio::test]
    async fn test_starts_unloaded() {
        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle(&dir);

        assert_eq!(lifecycle.state().await, LifecycleState::Unloaded);
        assert!(!lifecycle.is_loaded().await);
        assert!(!lifecycle.snapshot().await.model_loaded);
    }

    #[tokio::test]
    async fn test_initialize_trains_when_absent_then_loads() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 150);

        let first = lifecycle(&dir);
        assert_eq!(first.initialize().await.unwrap(), InitOutcome::Trained);
        assert_eq!(first.state().await, LifecycleState::Loaded);
        assert!(first.store().exists());

        let second = lifecycle(&dir);
        assert_eq!(second.initialize().await.unwrap(), InitOutcome::Loaded);
        assert_eq!(
            second.snapshot().await.model_checksum,
            first.snapshot().await.model_checksum
        );
    }

    #[tokio::test]
    async fn test_initialize_without_dataset_fails_unloaded() {
        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle(&dir);

        let err = lifecycle.initialize().await.unwrap_err();
        assert!(matches!(err, TrainingError::DatasetMissing { .. }));
        assert_eq!(lifecycle.state().await, LifecycleState::Unloaded);

        let report = lifecycle.health.report().await;
        assert_eq!(report.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_failed_retrain_keeps_previous_model() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 150);
        let lifecycle = lifecycle(&dir);
        lifecycle.initialize().await.unwrap();
        let before = lifecycle.current().await.unwrap();

        std::fs::write(dir.path().join("insurance.csv"), "age,sex\n30,male\n").unwrap();
        let err = lifecycle.retrain().await.unwrap_err();
        assert!(matches!(err, TrainingError::MissingColumns { .. }));

        let after = lifecycle.current().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(lifecycle.state().await, LifecycleState::Loaded);
        assert_eq!(
            lifecycle.health.report().await.status,
            ComponentStatus::Degraded
        );
        // The artifact on disk is untouched too
        assert_eq!(
            lifecycle.store().load().unwrap().encoders.model_checksum,
            before.encoders.model_checksum
        );
    }

    #[tokio::test]
    async fn test_retrain_is_reproducible() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 150);
        let lifecycle = lifecycle(&dir);
        let row = EncodedFeatureVector::new(45.0, 1, 35.0, 2, 1, 0);

        lifecycle.retrain().await.unwrap();
        let first = lifecycle.current().await.unwrap().model.predict(&row);
        lifecycle.retrain().await.unwrap();
        let second = lifecycle.current().await.unwrap().model.predict(&row);

        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_predictions_continue_during_retrain() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 400);
        let mut lifecycle = lifecycle(&dir);
        lifecycle.config.forest.n_estimators = 40;
        let lifecycle = Arc::new(lifecycle);
        lifecycle.initialize().await.unwrap();

        let row = EncodedFeatureVector::new(45.0, 1, 35.0, 2, 1, 0);
        let before = lifecycle.current().await.unwrap();
        let before_value = before.model.predict(&row);

        let retrain = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.retrain().await }
        });

        let mut served = Vec::new();
        loop {
            let finished = retrain.is_finished();
            // Readers never wait on the write gate while a model is loaded
            let artifact = tokio::time::timeout(Duration::from_secs(1), lifecycle.ensure_loaded())
                .await
                .expect("prediction blocked behind retrain")
                .unwrap();
            assert!(artifact.model.predict(&row).is_finite());
            served.push(artifact);
            if finished {
                break;
            }
            tokio::task::yield_now().await;
        }

        retrain.await.unwrap().unwrap();
        let after = lifecycle.current().await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));

        // Every read saw either the old artifact or the final one
        for artifact in &served {
            assert!(Arc::ptr_eq(artifact, &before) || Arc::ptr_eq(artifact, &after));
        }

        // An Arc taken before the swap still predicts as before
        assert_eq!(before.model.predict(&row).to_bits(), before_value.to_bits());
        assert_eq!(lifecycle.state().await, LifecycleState::Loaded);
    }

    #[tokio::test]
    async fn test_ensure_loaded_trains_lazily() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 120);
        let lifecycle = lifecycle(&dir);

        let artifact = lifecycle.ensure_loaded().await.unwrap();
        assert_eq!(artifact.encoders.training_rows, 120);
        assert!(lifecycle.is_loaded().await);
    }

    #[tokio::test]
    async fn test_ensure_loaded_without_dataset_is_model_not_loaded() {
        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle(&dir);

        let err = lifecycle.ensure_loaded().await.unwrap_err();
        assert!(matches!(err, PredictError::ModelNotLoaded(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_current() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 120);
        let lifecycle = lifecycle(&dir);
        lifecycle.initialize().await.unwrap();

        std::fs::remove_file(lifecycle.store().encoders_path()).unwrap();
        let err = lifecycle.reload().await.unwrap_err();
        assert!(err.is_not_found());
        assert!(lifecycle.is_loaded().await);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_retrained() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 120);
        let first = lifecycle(&dir);
        first.initialize().await.unwrap();

        std::fs::write(first.store().model_path(), b"corrupt").unwrap();

        let fresh = lifecycle(&dir);
        assert_eq!(fresh.initialize().await.unwrap(), InitOutcome::Trained);
        assert!(fresh.store().load().is_ok());
    }

    #[tokio::test]
    async fn test_training_timeout() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir, 400);
        let mut lifecycle = lifecycle(&dir);
        lifecycle.config.training_timeout = Duration::from_nanos(1);
        lifecycle.config.forest.n_estimators = 50;

        let err = lifecycle.retrain().await.unwrap_err();
        assert!(matches!(err, TrainingError::Timeout(_)));
        assert!(!lifecycle.is_loaded().await);
        assert!(!lifecycle.store().exists());
    }
}
