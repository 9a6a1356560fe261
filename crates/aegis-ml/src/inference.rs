//! Uniform prediction contract over heterogeneous model kinds: model
//! loading, rate-limited and circuit-broken prediction, and batch
//! prediction.

use crate::circuit_breaker::CircuitBreaker;
use crate::error::{Error, Result};
use crate::predictor::{build_predictor, PredictorHandle};
use crate::rate_limit::PredictionRateLimiter;
use aegis_config::InferenceConfig;
use aegis_repositories::{ModelRepository, PredictionRequestRepository};
use aegis_types::{ModelStatus, PredictionRequest, PredictionStatus};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// A single prediction request.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    /// Model to serve the prediction.
    pub model_id: String,
    /// Input feature vector, by name.
    pub features: BTreeMap<String, f64>,
    /// Caller-supplied deadline; the engine honors the smaller of this
    /// and `config.max_latency_ms`.
    pub timeout: Option<Duration>,
}

/// A batch of prediction requests against a single model.
#[derive(Debug, Clone)]
pub struct BatchPredictRequest {
    /// Model to serve the predictions.
    pub model_id: String,
    /// Input feature vectors, by name.
    pub features: Vec<BTreeMap<String, f64>>,
    /// Per-item deadline, as in [`PredictRequest`].
    pub timeout: Option<Duration>,
}

struct LoadedModel {
    predictor: PredictorHandle,
    circuit_breaker: CircuitBreaker,
}

/// Serves predictions for loaded models behind a process-wide rate
/// limiter and a per-model circuit breaker, and persists every
/// request/response pair for audit.
pub struct InferenceEngine {
    model_repo: Arc<dyn ModelRepository>,
    prediction_repo: Arc<dyn PredictionRequestRepository>,
    config: InferenceConfig,
    rate_limiter: PredictionRateLimiter,
    loaded: RwLock<HashMap<String, Arc<LoadedModel>>>,
    shut_down: AtomicBool,
}

impl InferenceEngine {
    /// Construct an engine over the given repositories and configuration.
    pub fn new(model_repo: Arc<dyn ModelRepository>, prediction_repo: Arc<dyn PredictionRequestRepository>, config: InferenceConfig) -> Self {
        let rate_limiter = PredictionRateLimiter::new(&config);
        Self {
            model_repo,
            prediction_repo,
            config,
            rate_limiter,
            loaded: RwLock::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(Error::ShutDown);
        }
        Ok(())
    }

    /// Load `model_id`, instantiate its predictor, and (if the config
    /// enables a cache) run a warmup pass. Rejects models that are
    /// neither `Trained` nor `Deployed`.
    pub async fn load_model(&self, model_id: &str) -> Result<()> {
        self.ensure_running()?;
        let model = self.model_repo.get(model_id).await?;
        if model.status != ModelStatus::Trained && model.status != ModelStatus::Deployed {
            return Err(Error::Validation(format!("model {model_id} is not trained or deployed (status {:?})", model.status)));
        }
        let predictor = PredictorHandle::new(build_predictor(model));
        if self.config.cache_enabled {
            predictor.warmup().await?;
        }
        let loaded = Arc::new(LoadedModel {
            predictor,
            circuit_breaker: CircuitBreaker::new(&self.config),
        });
        self.loaded.write().await.insert(model_id.to_string(), loaded);
        Ok(())
    }

    async fn loaded_model(&self, model_id: &str) -> Result<Arc<LoadedModel>> {
        let loaded = self.loaded.read().await;
        let entry = loaded.get(model_id).ok_or_else(|| Error::ModelNotLoaded(model_id.to_string()))?;
        if !entry.predictor.is_healthy().await {
            return Err(Error::ModelNotLoaded(model_id.to_string()));
        }
        Ok(entry.clone())
    }

    /// Serve a single prediction: rate limit, deadline, circuit breaker,
    /// then persist the outcome for audit.
    pub async fn predict(&self, request: PredictRequest) -> Result<PredictionRequest> {
        self.ensure_running()?;
        self.rate_limiter.check()?;

        let entry = self.loaded_model(&request.model_id).await?;
        let deadline = match request.timeout {
            Some(requested) => requested.min(Duration::from_millis(self.config.max_latency_ms)),
            None => Duration::from_millis(self.config.max_latency_ms),
        };

        if !entry.circuit_breaker.allow_request().await {
            return Err(Error::Types(aegis_types::Error::CircuitOpen {
                message: format!("circuit open for model {}", request.model_id),
            }));
        }

        let start = std::time::Instant::now();
        let now = Utc::now();
        let outcome = tokio::time::timeout(deadline, entry.predictor.predict(&request.features, now)).await;

        let request_id = Uuid::new_v4().to_string();
        let processing_time_ms = start.elapsed().as_millis() as u64;

        let record = match outcome {
            Ok(Ok(output)) => {
                entry.circuit_breaker.record_success().await;
                PredictionRequest {
                    request_id,
                    model_id: request.model_id.clone(),
                    features: request.features,
                    prediction: Some(output.prediction),
                    confidence: output.confidence,
                    probability: output.probability,
                    processing_time_ms,
                    response_time_ms: processing_time_ms,
                    status: PredictionStatus::Ok,
                    error: None,
                }
            }
            Ok(Err(err)) => {
                entry.circuit_breaker.record_failure().await;
                PredictionRequest {
                    request_id,
                    model_id: request.model_id.clone(),
                    features: request.features,
                    prediction: None,
                    confidence: None,
                    probability: None,
                    processing_time_ms,
                    response_time_ms: processing_time_ms,
                    status: PredictionStatus::Error,
                    error: Some(err.to_string()),
                }
            }
            Err(_) => {
                entry.circuit_breaker.record_failure().await;
                PredictionRequest {
                    request_id,
                    model_id: request.model_id.clone(),
                    features: request.features,
                    prediction: None,
                    confidence: None,
                    probability: None,
                    processing_time_ms,
                    response_time_ms: processing_time_ms,
                    status: PredictionStatus::Error,
                    error: Some("prediction deadline exceeded".to_string()),
                }
            }
        };

        let persisted = record.clone();
        let prediction_repo = self.prediction_repo.clone();
        tokio::spawn(async move {
            if let Err(err) = prediction_repo.save(persisted).await {
                warn!(error = %err, "failed to persist prediction request");
            }
        });

        // A failed prediction is still a served response, not a caller-facing
        // error: the record's `status`/`error` fields carry the failure and
        // the request was persisted above either way.
        Ok(record)
    }

    /// Serve a batch of predictions, chunked by `config.batch_size`.
    /// Stops at the first chunk containing a failure, returning the
    /// results collected so far.
    pub async fn predict_batch(&self, request: BatchPredictRequest) -> Result<Vec<PredictionRequest>> {
        self.ensure_running()?;
        let mut results = Vec::with_capacity(request.features.len());
        for chunk in request.features.chunks(self.config.batch_size.max(1)) {
            for features in chunk {
                let single = PredictRequest {
                    model_id: request.model_id.clone(),
                    features: features.clone(),
                    timeout: request.timeout,
                };
                match self.predict(single).await {
                    Ok(record) => {
                        let failed = record.status == PredictionStatus::Error;
                        results.push(record);
                        if failed {
                            return Ok(results);
                        }
                    }
                    Err(_) => return Ok(results),
                }
            }
        }
        Ok(results)
    }

    /// Drain and release the predictor for `model_id`, if loaded.
    pub async fn unload_model(&self, model_id: &str) -> Result<()> {
        let removed = self.loaded.write().await.remove(model_id);
        if let Some(entry) = removed {
            entry.predictor.shutdown().await;
        }
        Ok(())
    }

    /// Release every loaded predictor and refuse further work.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let mut loaded = self.loaded.write().await;
        for entry in loaded.values() {
            entry.predictor.shutdown().await;
        }
        loaded.clear();
    }

    /// Invocation count and last-used timestamp for a loaded model, for
    /// health/ops reporting.
    pub async fn model_stats(&self, model_id: &str) -> Option<(u64, Option<chrono::DateTime<Utc>>)> {
        let loaded = self.loaded.read().await;
        loaded.get(model_id).map(|entry| (entry.predictor.invocation_count(), entry.predictor.last_used()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_repositories::{InMemoryModelRepository, InMemoryPredictionRequestRepository};
    use aegis_types::Model;
    use std::collections::BTreeMap as Map;

    fn model(id: &str, status: ModelStatus) -> Model {
        Model {
            id: id.to_string(),
            version: "1".to_string(),
            model_type: "classifier".to_string(),
            algorithm: "logistic_regression".to_string(),
            status,
            artifact_path: None,
            metrics: Map::new(),
            training_job_id: None,
        }
    }

    async fn engine(config: InferenceConfig) -> (InferenceEngine, Arc<InMemoryModelRepository>) {
        let models = Arc::new(InMemoryModelRepository::new());
        let predictions = Arc::new(InMemoryPredictionRequestRepository::new());
        (InferenceEngine::new(models.clone(), predictions, config), models)
    }

    #[tokio::test]
    async fn load_model_rejects_registered_status() {
        let (engine, models) = engine(InferenceConfig::default()).await;
        models.save(model("m1", ModelStatus::Registered)).await.unwrap();
        let err = engine.load_model("m1").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn predict_without_loading_fails_model_not_loaded() {
        let (engine, _models) = engine(InferenceConfig::default()).await;
        let mut features = Map::new();
        features.insert("f1".to_string(), 1.0);
        let err = engine
            .predict(PredictRequest {
                model_id: "missing".to_string(),
                features,
                timeout: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelNotLoaded(_)));
    }

    #[tokio::test]
    async fn predict_succeeds_once_loaded() {
        let (engine, models) = engine(InferenceConfig::default()).await;
        models.save(model("m1", ModelStatus::Deployed)).await.unwrap();
        engine.load_model("m1").await.unwrap();
        let mut features = Map::new();
        features.insert("amount_zscore".to_string(), 3.0);
        let record = engine
            .predict(PredictRequest {
                model_id: "m1".to_string(),
                features,
                timeout: None,
            })
            .await
            .unwrap();
        assert_eq!(record.status, PredictionStatus::Ok);
    }

    #[tokio::test]
    async fn shutdown_refuses_further_work() {
        let (engine, models) = engine(InferenceConfig::default()).await;
        models.save(model("m1", ModelStatus::Deployed)).await.unwrap();
        engine.load_model("m1").await.unwrap();
        engine.shutdown().await;
        let err = engine.load_model("m1").await.unwrap_err();
        assert!(matches!(err, Error::ShutDown));
    }
}
