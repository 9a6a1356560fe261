//! [`TrainingJob`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, Result, TrainingJob, TrainingJobStatus};
use async_trait::async_trait;

/// Persistence contract for [`TrainingJob`] records.
#[async_trait]
pub trait TrainingJobRepository: Send + Sync {
    /// Insert or overwrite a training job.
    async fn save(&self, job: TrainingJob) -> Result<()>;
    /// Fetch a single training job by id.
    async fn get(&self, id: &str) -> Result<TrainingJob>;
    /// List jobs currently queued (`Pending`), in submission order by id.
    async fn list_pending(&self) -> Result<Vec<TrainingJob>>;
}

/// In-memory [`TrainingJobRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryTrainingJobRepository {
    store: InMemoryStore<TrainingJob>,
}

impl InMemoryTrainingJobRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrainingJobRepository for InMemoryTrainingJobRepository {
    async fn save(&self, job: TrainingJob) -> Result<()> {
        self.store.put(job.id.clone(), job).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<TrainingJob> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| Error::not_found("training_job", id))
    }

    async fn list_pending(&self) -> Result<Vec<TrainingJob>> {
        let mut pending: Vec<TrainingJob> = self
            .store
            .all()
            .await
            .into_iter()
            .filter(|j| j.status == TrainingJobStatus::Pending)
            .collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pending)
    }
}
