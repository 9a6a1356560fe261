//! ML-domain entities: registered models, training jobs, and prediction
//! requests.

use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a registered [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// Registered, no training has been attempted yet.
    Registered,
    /// A training job is in flight.
    Training,
    /// Training succeeded; artifact is available but not serving.
    Trained,
    /// Deployed and eligible to serve predictions.
    Deployed,
    /// The last training attempt failed.
    Failed,
}

/// A registered model and its most recent training outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Unique id.
    pub id: String,
    /// Version string, bumped on every successful retrain.
    pub version: String,
    /// Model kind (`"classifier"`, `"anomaly_detector"`, …).
    pub model_type: String,
    /// Underlying algorithm (`"random_forest"`, `"logistic_regression"`, …).
    pub algorithm: String,
    /// Current lifecycle status.
    pub status: ModelStatus,
    /// Path to the serialized model artifact, once trained.
    pub artifact_path: Option<String>,
    /// Evaluation metrics from the last successful training run.
    pub metrics: BTreeMap<String, f64>,
    /// Id of the training job that produced the current artifact.
    pub training_job_id: Option<String>,
}

/// Lifecycle status of a [`TrainingJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingJobStatus {
    /// Enqueued, not yet started.
    Pending,
    /// Currently executing on a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

/// A request to (re)train a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJob {
    /// Unique id.
    pub id: String,
    /// Model this job trains.
    pub model_id: String,
    /// Algorithm to train with.
    pub algorithm: String,
    /// Algorithm-specific hyperparameters.
    pub hyperparameters: BTreeMap<String, JsonValue>,
    /// Dataset references (paths, query ids, …).
    pub dataset_refs: Vec<String>,
    /// Current lifecycle status.
    pub status: TrainingJobStatus,
    /// Number of times this job has been retried from `Failed`.
    pub retry_count: u32,
    /// When execution began.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock training duration, once complete.
    pub duration_ms: Option<u64>,
    /// Evaluation metrics produced by the trainer.
    pub metrics: BTreeMap<String, f64>,
}

impl TrainingJob {
    /// Only valid from `Failed`: reset runtime fields and bump retry count.
    pub fn prepare_retry(&mut self) -> Result<(), String> {
        if self.status != TrainingJobStatus::Failed {
            return Err(format!("cannot retry training job in status {:?}", self.status));
        }
        self.retry_count += 1;
        self.status = TrainingJobStatus::Pending;
        self.started_at = None;
        self.completed_at = None;
        self.duration_ms = None;
        Ok(())
    }
}

/// Outcome status of a single [`PredictionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    /// Prediction produced successfully.
    Ok,
    /// Prediction failed; `error` on the request describes why.
    Error,
}

/// A single prediction request/response pair, persisted for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Unique id.
    pub request_id: String,
    /// Model the request was served by.
    pub model_id: String,
    /// Input feature vector, by name.
    pub features: BTreeMap<String, f64>,
    /// Predicted label or score, if successful.
    pub prediction: Option<JsonValue>,
    /// Confidence in `[0, 1]`, if the model reports one.
    pub confidence: Option<f64>,
    /// Full class-probability distribution, if the model reports one.
    pub probability: Option<BTreeMap<String, f64>>,
    /// Wall-clock milliseconds the predictor itself took.
    pub processing_time_ms: u64,
    /// Wall-clock milliseconds including queueing/rate-limit waits.
    pub response_time_ms: u64,
    /// Outcome status.
    pub status: PredictionStatus,
    /// Error message, if `status == Error`.
    pub error: Option<String>,
}
