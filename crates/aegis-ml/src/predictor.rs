//! The per-model [`Predictor`] contract plus a small catalogue of
//! statistical predictor implementations keyed by algorithm name, and
//! [`PredictorHandle`], which wraps a loaded predictor with atomic
//! invocation-count/last-used counters.

use crate::error::Result;
use aegis_types::{JsonValue, Model};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Output of a single prediction.
#[derive(Debug, Clone)]
pub struct PredictionOutput {
    /// Predicted label or score.
    pub prediction: JsonValue,
    /// Confidence in `[0, 1]`, if the predictor reports one.
    pub confidence: Option<f64>,
    /// Full class-probability distribution, if the predictor reports one.
    pub probability: Option<BTreeMap<String, f64>>,
}

/// Uniform contract every loaded model's predictor satisfies, regardless
/// of underlying algorithm.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Produce a single prediction from a feature vector.
    async fn predict(&self, features: &BTreeMap<String, f64>) -> Result<PredictionOutput>;

    /// Produce predictions for a batch of feature vectors. The default
    /// implementation predicts sequentially; predictors with a faster
    /// vectorized path can override it.
    async fn predict_batch(&self, features: &[BTreeMap<String, f64>]) -> Result<Vec<PredictionOutput>> {
        let mut results = Vec::with_capacity(features.len());
        for item in features {
            results.push(self.predict(item).await?);
        }
        Ok(results)
    }

    /// Metadata about the model this predictor serves.
    fn model_info(&self) -> &Model;

    /// Whether the predictor is currently able to serve predictions.
    async fn is_healthy(&self) -> bool {
        true
    }

    /// Run a synthetic prediction to pay for first-call initialization
    /// costs ahead of real traffic.
    async fn warmup(&self) -> Result<()> {
        self.predict(&BTreeMap::new()).await.map(|_| ())
    }

    /// Release any resources the predictor holds.
    async fn shutdown(&self);
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Logistic-regression-style predictor: a weighted sum of feature
/// values (equal weights absent a trained artifact) passed through a
/// sigmoid, thresholded at `0.5`.
struct LogisticRegressionPredictor {
    model: Model,
}

#[async_trait]
impl Predictor for LogisticRegressionPredictor {
    async fn predict(&self, features: &BTreeMap<String, f64>) -> Result<PredictionOutput> {
        if features.is_empty() {
            return Ok(PredictionOutput {
                prediction: JsonValue::from(false),
                confidence: Some(0.5),
                probability: None,
            });
        }
        let weight = 1.0 / features.len() as f64;
        let score = sigmoid(features.values().map(|v| v * weight).sum());
        let mut probability = BTreeMap::new();
        probability.insert("positive".to_string(), score);
        probability.insert("negative".to_string(), 1.0 - score);
        Ok(PredictionOutput {
            prediction: JsonValue::from(score >= 0.5),
            confidence: Some((score - 0.5).abs() * 2.0),
            probability: Some(probability),
        })
    }

    fn model_info(&self) -> &Model {
        &self.model
    }

    async fn shutdown(&self) {}
}

/// Random-forest-style predictor: an ensemble of simple per-feature
/// threshold votes, majority wins.
struct RandomForestPredictor {
    model: Model,
}

#[async_trait]
impl Predictor for RandomForestPredictor {
    async fn predict(&self, features: &BTreeMap<String, f64>) -> Result<PredictionOutput> {
        if features.is_empty() {
            return Ok(PredictionOutput {
                prediction: JsonValue::from(false),
                confidence: Some(0.5),
                probability: None,
            });
        }
        let votes_for = features.values().filter(|&&v| v > 0.0).count();
        let total = features.len();
        let ratio = votes_for as f64 / total as f64;
        Ok(PredictionOutput {
            prediction: JsonValue::from(ratio >= 0.5),
            confidence: Some((ratio - 0.5).abs() * 2.0),
            probability: None,
        })
    }

    fn model_info(&self) -> &Model {
        &self.model
    }

    async fn shutdown(&self) {}
}

/// Anomaly-detector predictor: flags feature vectors whose mean
/// z-score against the model's stored baseline exceeds 2 standard
/// deviations.
struct AnomalyDetectorPredictor {
    model: Model,
    baseline_mean: f64,
    baseline_stddev: f64,
}

#[async_trait]
impl Predictor for AnomalyDetectorPredictor {
    async fn predict(&self, features: &BTreeMap<String, f64>) -> Result<PredictionOutput> {
        if features.is_empty() || self.baseline_stddev <= 0.0 {
            return Ok(PredictionOutput {
                prediction: JsonValue::from(false),
                confidence: Some(0.0),
                probability: None,
            });
        }
        let mean_value = features.values().sum::<f64>() / features.len() as f64;
        let z_score = (mean_value - self.baseline_mean).abs() / self.baseline_stddev;
        let is_anomaly = z_score > 2.0;
        Ok(PredictionOutput {
            prediction: JsonValue::from(is_anomaly),
            confidence: Some((z_score / 4.0).min(1.0)),
            probability: None,
        })
    }

    fn model_info(&self) -> &Model {
        &self.model
    }

    async fn shutdown(&self) {}
}

/// Instantiate the predictor registered for `model.algorithm`. Unknown
/// algorithms fall back to the logistic-regression predictor, matching
/// the platform's default scoring behavior for unrecognized model
/// kinds.
pub fn build_predictor(model: Model) -> Box<dyn Predictor> {
    match model.algorithm.as_str() {
        "random_forest" => Box::new(RandomForestPredictor { model }),
        "anomaly_detector" => {
            let baseline_mean = model.metrics.get("baseline_mean").copied().unwrap_or(0.0);
            let baseline_stddev = model.metrics.get("baseline_stddev").copied().unwrap_or(1.0);
            Box::new(AnomalyDetectorPredictor {
                model,
                baseline_mean,
                baseline_stddev,
            })
        }
        _ => Box::new(LogisticRegressionPredictor { model }),
    }
}

/// Wraps a loaded [`Predictor`] with atomic invocation-count and
/// last-used bookkeeping, safe for concurrent calls.
pub struct PredictorHandle {
    predictor: Box<dyn Predictor>,
    invocation_count: AtomicU64,
    last_used_unix_ms: AtomicI64,
}

impl PredictorHandle {
    /// Wrap a freshly built predictor with zeroed counters.
    pub fn new(predictor: Box<dyn Predictor>) -> Self {
        Self {
            predictor,
            invocation_count: AtomicU64::new(0),
            last_used_unix_ms: AtomicI64::new(0),
        }
    }

    /// Model metadata for the wrapped predictor.
    pub fn model_info(&self) -> &Model {
        self.predictor.model_info()
    }

    /// Total predictions served by this handle.
    pub fn invocation_count(&self) -> u64 {
        self.invocation_count.load(Ordering::SeqCst)
    }

    /// When this handle last served a prediction, if ever.
    pub fn last_used(&self) -> Option<DateTime<Utc>> {
        let millis = self.last_used_unix_ms.load(Ordering::SeqCst);
        if millis == 0 {
            None
        } else {
            Utc.timestamp_millis_opt(millis).single()
        }
    }

    /// Whether the wrapped predictor reports healthy.
    pub async fn is_healthy(&self) -> bool {
        self.predictor.is_healthy().await
    }

    /// Run the predictor's warmup pass.
    pub async fn warmup(&self) -> Result<()> {
        self.predictor.warmup().await
    }

    /// Predict, bumping the invocation counter and last-used timestamp
    /// regardless of outcome.
    pub async fn predict(&self, features: &BTreeMap<String, f64>, now: DateTime<Utc>) -> Result<PredictionOutput> {
        self.invocation_count.fetch_add(1, Ordering::SeqCst);
        self.last_used_unix_ms.store(now.timestamp_millis(), Ordering::SeqCst);
        self.predictor.predict(features).await
    }

    /// Batch-predict, bumping counters once per item.
    pub async fn predict_batch(&self, features: &[BTreeMap<String, f64>], now: DateTime<Utc>) -> Result<Vec<PredictionOutput>> {
        self.invocation_count.fetch_add(features.len() as u64, Ordering::SeqCst);
        self.last_used_unix_ms.store(now.timestamp_millis(), Ordering::SeqCst);
        self.predictor.predict_batch(features).await
    }

    /// Release the wrapped predictor's resources.
    pub async fn shutdown(&self) {
        self.predictor.shutdown().await;
    }
}
