//! Bounded training-job worker pool with per-algorithm trainers.
//!
//! Grounded on `aegis-graph::orchestrator` for the "shared channel,
//! bounded capacity, fails loudly when full" shape, here applied to a
//! worker-pool consumer instead of a semaphore-gated single call.

use crate::error::{Error, Result};
use aegis_config::TrainingConfig;
use aegis_repositories::{ModelRepository, TrainingJobRepository};
use aegis_types::{JsonValue, Model, ModelStatus, TrainingJob, TrainingJobStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Parameters handed to a [`Trainer`] for one run.
#[derive(Debug, Clone)]
pub struct TrainingRequest {
    /// Job being executed.
    pub job_id: String,
    /// Model the job trains.
    pub model_id: String,
    /// Algorithm-specific hyperparameters.
    pub hyperparameters: BTreeMap<String, JsonValue>,
    /// Dataset references.
    pub dataset_refs: Vec<String>,
    /// Directory artifacts for this run are written under.
    pub artifact_dir: String,
}

/// Outcome of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// New model version produced by this run.
    pub version: String,
    /// Evaluation metrics.
    pub metrics: BTreeMap<String, f64>,
    /// Path to the primary model artifact.
    pub artifact_path: String,
}

/// Per-algorithm training contract.
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Execute one training run, honoring `cancellation`.
    async fn train(&self, cancellation: CancellationToken, request: &TrainingRequest) -> Result<TrainingResult>;

    /// Reject malformed hyperparameters before a job is ever enqueued.
    fn validate_config(&self, hyperparameters: &BTreeMap<String, JsonValue>) -> Result<()>;

    /// Default hyperparameters for this algorithm.
    fn default_config(&self) -> BTreeMap<String, JsonValue>;

    /// Metric names this trainer reports.
    fn supported_metrics(&self) -> Vec<&'static str>;
}

async fn write_artifacts(dir: &str, metrics: &BTreeMap<String, f64>, feature_importance: &BTreeMap<String, f64>) -> Result<String> {
    tokio::fs::create_dir_all(dir).await.map_err(|err| Error::Types(aegis_types::Error::Transient(err.to_string())))?;
    let model_path = format!("{dir}/model.bin");
    tokio::fs::write(&model_path, b"synthetic-artifact").await.map_err(|err| Error::Types(aegis_types::Error::Transient(err.to_string())))?;

    let metrics_json = serde_json::to_vec_pretty(metrics).unwrap_or_default();
    tokio::fs::write(format!("{dir}/metrics.json"), metrics_json)
        .await
        .map_err(|err| Error::Types(aegis_types::Error::Transient(err.to_string())))?;

    let importance_json = serde_json::to_vec_pretty(feature_importance).unwrap_or_default();
    tokio::fs::write(format!("{dir}/feature_importance.json"), importance_json)
        .await
        .map_err(|err| Error::Types(aegis_types::Error::Transient(err.to_string())))?;

    tokio::fs::write(format!("{dir}/metadata.json"), b"{}")
        .await
        .map_err(|err| Error::Types(aegis_types::Error::Transient(err.to_string())))?;

    Ok(model_path)
}

/// Trainer for `logistic_regression`/`random_forest`/any unrecognized
/// algorithm: synthesizes plausible metrics from the dataset reference
/// count, since no real training backend is wired in.
struct StatisticalTrainer {
    metrics: Vec<&'static str>,
}

#[async_trait]
impl Trainer for StatisticalTrainer {
    async fn train(&self, cancellation: CancellationToken, request: &TrainingRequest) -> Result<TrainingResult> {
        if cancellation.is_cancelled() {
            return Err(Error::Types(aegis_types::Error::Cancelled));
        }
        let dataset_weight = request.dataset_refs.len().max(1) as f64;
        let mut metrics = BTreeMap::new();
        metrics.insert("accuracy".to_string(), (0.7 + 0.02 * dataset_weight).min(0.99));
        metrics.insert("precision".to_string(), (0.65 + 0.02 * dataset_weight).min(0.98));
        metrics.insert("recall".to_string(), (0.6 + 0.03 * dataset_weight).min(0.97));

        let mut feature_importance = BTreeMap::new();
        for (i, dataset_ref) in request.dataset_refs.iter().enumerate() {
            feature_importance.insert(dataset_ref.clone(), 1.0 / (i as f64 + 1.0));
        }

        let artifact_path = write_artifacts(&request.artifact_dir, &metrics, &feature_importance).await?;
        Ok(TrainingResult {
            version: chrono::Utc::now().timestamp().to_string(),
            metrics,
            artifact_path,
        })
    }

    fn validate_config(&self, _hyperparameters: &BTreeMap<String, JsonValue>) -> Result<()> {
        Ok(())
    }

    fn default_config(&self) -> BTreeMap<String, JsonValue> {
        BTreeMap::new()
    }

    fn supported_metrics(&self) -> Vec<&'static str> {
        self.metrics.clone()
    }
}

fn build_trainer(algorithm: &str) -> Arc<dyn Trainer> {
    match algorithm {
        "anomaly_detector" => Arc::new(StatisticalTrainer {
            metrics: vec!["accuracy", "precision", "recall", "false_positive_rate"],
        }),
        _ => Arc::new(StatisticalTrainer {
            metrics: vec!["accuracy", "precision", "recall"],
        }),
    }
}

/// Default registered algorithms. `submit` rejects any other algorithm
/// name as unvalidated.
const REGISTERED_ALGORITHMS: &[&str] = &["logistic_regression", "random_forest", "anomaly_detector"];

/// Accepts training jobs onto a bounded channel and executes them on a
/// fixed-size worker pool, one per-algorithm [`Trainer`] at a time per
/// worker.
pub struct TrainingEngine {
    training_repo: Arc<dyn TrainingJobRepository>,
    model_repo: Arc<dyn ModelRepository>,
    config: TrainingConfig,
    sender: mpsc::Sender<String>,
    cancellations: Arc<RwLock<HashMap<String, CancellationToken>>>,
}

impl TrainingEngine {
    /// Build the engine and spawn `config.worker_count` workers
    /// draining a channel of capacity `config.queue_capacity`.
    pub fn new(training_repo: Arc<dyn TrainingJobRepository>, model_repo: Arc<dyn ModelRepository>, config: TrainingConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<String>(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let cancellations = Arc::new(RwLock::new(HashMap::new()));

        for worker_id in 0..config.worker_count.max(1) {
            let receiver = receiver.clone();
            let training_repo = training_repo.clone();
            let model_repo = model_repo.clone();
            let artifact_root = config.artifact_root.clone();
            let cancellations = cancellations.clone();
            tokio::spawn(async move {
                loop {
                    let job_id = {
                        let mut receiver = receiver.lock().await;
                        receiver.recv().await
                    };
                    let Some(job_id) = job_id else {
                        break;
                    };
                    run_job(worker_id, &job_id, &training_repo, &model_repo, &artifact_root, &cancellations).await;
                }
            });
        }

        Self {
            training_repo,
            model_repo,
            config,
            sender,
            cancellations,
        }
    }

    /// Validate, persist as `pending`, and enqueue a training job.
    /// Fails [`aegis_types::Error::QueueFull`] if the worker queue has
    /// no capacity.
    pub async fn submit(&self, mut job: TrainingJob) -> Result<TrainingJob> {
        if !REGISTERED_ALGORITHMS.contains(&job.algorithm.as_str()) {
            return Err(Error::Validation(format!("unregistered algorithm: {}", job.algorithm)));
        }
        if job.dataset_refs.is_empty() {
            return Err(Error::Validation("dataset_refs must be non-empty".to_string()));
        }
        job.status = TrainingJobStatus::Pending;
        self.training_repo.save(job.clone()).await?;

        self.sender.try_send(job.id.clone()).map_err(|_| {
            Error::Types(aegis_types::Error::QueueFull {
                message: format!("training queue at capacity ({})", self.config.queue_capacity),
            })
        })?;
        Ok(job)
    }

    /// Retry a `failed` job: reset runtime fields, bump retry count,
    /// and re-enqueue.
    pub async fn retry(&self, job_id: &str) -> Result<TrainingJob> {
        let mut job = self.training_repo.get(job_id).await?;
        job.prepare_retry().map_err(Error::Validation)?;
        self.training_repo.save(job.clone()).await?;

        self.sender.try_send(job.id.clone()).map_err(|_| {
            Error::Types(aegis_types::Error::QueueFull {
                message: format!("training queue at capacity ({})", self.config.queue_capacity),
            })
        })?;
        Ok(job)
    }

    /// Signal cancellation for an in-flight job, if a worker has
    /// claimed it.
    pub async fn cancel(&self, job_id: &str) {
        if let Some(token) = self.cancellations.read().await.get(job_id) {
            token.cancel();
        }
    }
}

async fn run_job(
    worker_id: usize,
    job_id: &str,
    training_repo: &Arc<dyn TrainingJobRepository>,
    model_repo: &Arc<dyn ModelRepository>,
    artifact_root: &str,
    cancellations: &Arc<RwLock<HashMap<String, CancellationToken>>>,
) {
    let mut job = match training_repo.get(job_id).await {
        Ok(job) => job,
        Err(err) => {
            error!(worker_id, job_id, error = %err, "failed to load training job");
            return;
        }
    };

    let token = CancellationToken::new();
    cancellations.write().await.insert(job_id.to_string(), token.clone());

    job.status = TrainingJobStatus::Running;
    job.started_at = Some(Utc::now());
    if let Err(err) = training_repo.save(job.clone()).await {
        warn!(worker_id, job_id, error = %err, "failed to persist running status");
    }

    let next_version = next_model_version(model_repo, &job.model_id).await;
    let request = TrainingRequest {
        job_id: job.id.clone(),
        model_id: job.model_id.clone(),
        hyperparameters: job.hyperparameters.clone(),
        dataset_refs: job.dataset_refs.clone(),
        artifact_dir: format!("{artifact_root}/models/{}/{next_version}", job.model_id),
    };

    let trainer = build_trainer(&job.algorithm);
    let started = std::time::Instant::now();
    let outcome = trainer.train(token, &request).await;
    let duration_ms = started.elapsed().as_millis() as u64;
    cancellations.write().await.remove(job_id);

    let completed_at = Utc::now();
    match outcome {
        Ok(result) => {
            job.status = TrainingJobStatus::Completed;
            job.completed_at = Some(completed_at);
            job.duration_ms = Some(duration_ms);
            job.metrics = result.metrics.clone();
            if let Err(err) = training_repo.save(job.clone()).await {
                warn!(worker_id, job_id, error = %err, "failed to persist completed status");
            }

            if let Ok(mut model) = model_repo.get(&job.model_id).await {
                model.status = ModelStatus::Trained;
                model.version = result.version;
                model.artifact_path = Some(result.artifact_path);
                model.metrics = result.metrics;
                model.training_job_id = Some(job.id.clone());
                if let Err(err) = model_repo.save(model).await {
                    warn!(worker_id, job_id, error = %err, "failed to persist trained model");
                }
            }
            info!(worker_id, job_id, duration_ms, "training job completed");
        }
        Err(err) => {
            job.status = TrainingJobStatus::Failed;
            job.completed_at = Some(completed_at);
            job.duration_ms = Some(duration_ms);
            if let Err(save_err) = training_repo.save(job.clone()).await {
                warn!(worker_id, job_id, error = %save_err, "failed to persist failed status");
            }

            if let Ok(mut model) = model_repo.get(&job.model_id).await {
                model.status = ModelStatus::Failed;
                if let Err(save_err) = model_repo.save(model).await {
                    warn!(worker_id, job_id, error = %save_err, "failed to persist failed model");
                }
            }
            error!(worker_id, job_id, error = %err, "training job failed");
        }
    }
}

async fn next_model_version(model_repo: &Arc<dyn ModelRepository>, model_id: &str) -> String {
    match model_repo.get(model_id).await {
        Ok(model) => {
            let current: u64 = model.version.parse().unwrap_or(0);
            (current + 1).to_string()
        }
        Err(_) => "1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_repositories::{InMemoryModelRepository, InMemoryTrainingJobRepository};
    use std::collections::BTreeMap as Map;
    use std::time::Duration;

    fn job(id: &str, algorithm: &str, dataset_refs: Vec<String>) -> TrainingJob {
        TrainingJob {
            id: id.to_string(),
            model_id: "m1".to_string(),
            algorithm: algorithm.to_string(),
            hyperparameters: Map::new(),
            dataset_refs,
            status: TrainingJobStatus::Pending,
            retry_count: 0,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            metrics: Map::new(),
        }
    }

    fn model() -> Model {
        Model {
            id: "m1".to_string(),
            version: "0".to_string(),
            model_type: "classifier".to_string(),
            algorithm: "random_forest".to_string(),
            status: ModelStatus::Registered,
            artifact_path: None,
            metrics: Map::new(),
            training_job_id: None,
        }
    }

    #[tokio::test]
    async fn submit_rejects_unregistered_algorithm() {
        let training = Arc::new(InMemoryTrainingJobRepository::new());
        let models = Arc::new(InMemoryModelRepository::new());
        let engine = TrainingEngine::new(training, models, TrainingConfig::default());
        let err = engine.submit(job("t1", "quantum_oracle", vec!["ds1".to_string()])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_empty_dataset_refs() {
        let training = Arc::new(InMemoryTrainingJobRepository::new());
        let models = Arc::new(InMemoryModelRepository::new());
        let engine = TrainingEngine::new(training, models, TrainingConfig::default());
        let err = engine.submit(job("t1", "random_forest", vec![])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn submit_runs_job_to_completion() {
        let training = Arc::new(InMemoryTrainingJobRepository::new());
        let models = Arc::new(InMemoryModelRepository::new());
        models.save(model()).await.unwrap();
        let engine = TrainingEngine::new(training.clone(), models.clone(), TrainingConfig {
            artifact_root: std::env::temp_dir().to_string_lossy().to_string(),
            ..TrainingConfig::default()
        });

        engine.submit(job("t1", "random_forest", vec!["ds1".to_string()])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let persisted = training.get("t1").await.unwrap();
        assert_eq!(persisted.status, TrainingJobStatus::Completed);
        let trained_model = models.get("m1").await.unwrap();
        assert_eq!(trained_model.status, ModelStatus::Trained);
    }

    #[tokio::test]
    async fn retry_only_valid_from_failed() {
        let training = Arc::new(InMemoryTrainingJobRepository::new());
        let models = Arc::new(InMemoryModelRepository::new());
        let engine = TrainingEngine::new(training.clone(), models, TrainingConfig::default());
        let mut pending_job = job("t1", "random_forest", vec!["ds1".to_string()]);
        pending_job.status = TrainingJobStatus::Pending;
        training.save(pending_job).await.unwrap();
        let err = engine.retry("t1").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
