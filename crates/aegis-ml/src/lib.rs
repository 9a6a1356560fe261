//! ML inference and training engines for AegisShield: a uniform
//! prediction contract over heterogeneous model kinds, protected by a
//! process-wide rate limiter and per-model circuit breaker, plus a
//! bounded training worker pool with per-algorithm trainers.

pub mod circuit_breaker;
pub mod error;
pub mod inference;
pub mod predictor;
pub mod rate_limit;
pub mod training;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use error::{Error, Result};
pub use inference::{BatchPredictRequest, InferenceEngine, PredictRequest};
pub use predictor::{build_predictor, PredictionOutput, Predictor, PredictorHandle};
pub use rate_limit::PredictionRateLimiter;
pub use training::{Trainer, TrainingEngine, TrainingRequest, TrainingResult};
