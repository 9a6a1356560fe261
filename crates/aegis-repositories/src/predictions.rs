//! [`PredictionRequest`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, PredictionRequest, Result};
use async_trait::async_trait;

/// Persistence contract for audited [`PredictionRequest`] records.
#[async_trait]
pub trait PredictionRequestRepository: Send + Sync {
    /// Persist a prediction request/response pair.
    async fn save(&self, request: PredictionRequest) -> Result<()>;
    /// Fetch a single prediction request by id.
    async fn get(&self, request_id: &str) -> Result<PredictionRequest>;
    /// List every prediction request served by `model_id`.
    async fn list_for_model(&self, model_id: &str) -> Result<Vec<PredictionRequest>>;
}

/// In-memory [`PredictionRequestRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryPredictionRequestRepository {
    store: InMemoryStore<PredictionRequest>,
}

impl InMemoryPredictionRequestRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PredictionRequestRepository for InMemoryPredictionRequestRepository {
    async fn save(&self, request: PredictionRequest) -> Result<()> {
        self.store.put(request.request_id.clone(), request).await;
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<PredictionRequest> {
        self.store
            .get(request_id)
            .await
            .ok_or_else(|| Error::not_found("prediction_request", request_id))
    }

    async fn list_for_model(&self, model_id: &str) -> Result<Vec<PredictionRequest>> {
        let all = self.store.all().await;
        Ok(all.into_iter().filter(|r| r.model_id == model_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::PredictionStatus;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn list_for_model_filters_correctly() {
        let repo = InMemoryPredictionRequestRepository::new();
        repo.save(PredictionRequest {
            request_id: "r1".into(),
            model_id: "m1".into(),
            features: BTreeMap::new(),
            prediction: None,
            confidence: None,
            probability: None,
            processing_time_ms: 5,
            response_time_ms: 7,
            status: PredictionStatus::Ok,
            error: None,
        })
        .await
        .unwrap();

        assert_eq!(repo.list_for_model("m1").await.unwrap().len(), 1);
        assert!(repo.list_for_model("m2").await.unwrap().is_empty());
    }
}
