//! [`Model`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, Model, ModelStatus, Result};
use async_trait::async_trait;

/// Persistence contract for registered [`Model`] records.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Insert or overwrite a model.
    async fn save(&self, model: Model) -> Result<()>;
    /// Fetch a single model by id.
    async fn get(&self, id: &str) -> Result<Model>;
    /// List every model currently in `Deployed` status.
    async fn list_deployed(&self) -> Result<Vec<Model>>;
}

/// In-memory [`ModelRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryModelRepository {
    store: InMemoryStore<Model>,
}

impl InMemoryModelRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRepository for InMemoryModelRepository {
    async fn save(&self, model: Model) -> Result<()> {
        self.store.put(model.id.clone(), model).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Model> {
        self.store.get(id).await.ok_or_else(|| Error::not_found("model", id))
    }

    async fn list_deployed(&self) -> Result<Vec<Model>> {
        let all = self.store.all().await;
        Ok(all.into_iter().filter(|m| m.status == ModelStatus::Deployed).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn model(id: &str, status: ModelStatus) -> Model {
        Model {
            id: id.to_string(),
            version: "1".into(),
            model_type: "classifier".into(),
            algorithm: "random_forest".into(),
            status,
            artifact_path: None,
            metrics: BTreeMap::new(),
            training_job_id: None,
        }
    }

    #[tokio::test]
    async fn list_deployed_excludes_other_statuses() {
        let repo = InMemoryModelRepository::new();
        repo.save(model("m1", ModelStatus::Deployed)).await.unwrap();
        repo.save(model("m2", ModelStatus::Trained)).await.unwrap();
        let deployed = repo.list_deployed().await.unwrap();
        assert_eq!(deployed.len(), 1);
        assert_eq!(deployed[0].id, "m1");
    }
}
