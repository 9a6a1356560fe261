//! [`IngestionJob`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, IngestionJob, IngestionJobStatus, Result};
use async_trait::async_trait;

/// Persistence contract for [`IngestionJob`] records.
#[async_trait]
pub trait IngestionJobRepository: Send + Sync {
    /// Insert or overwrite an ingestion job.
    async fn save(&self, job: IngestionJob) -> Result<()>;
    /// Fetch a single ingestion job by id.
    async fn get(&self, id: &str) -> Result<IngestionJob>;
    /// List jobs that are not yet in a terminal status.
    async fn list_active(&self) -> Result<Vec<IngestionJob>>;
}

/// In-memory [`IngestionJobRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryIngestionJobRepository {
    store: InMemoryStore<IngestionJob>,
}

impl InMemoryIngestionJobRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IngestionJobRepository for InMemoryIngestionJobRepository {
    async fn save(&self, job: IngestionJob) -> Result<()> {
        self.store.put(job.id.clone(), job).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<IngestionJob> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| Error::not_found("ingestion_job", id))
    }

    async fn list_active(&self) -> Result<Vec<IngestionJob>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|j| !matches!(j.status, IngestionJobStatus::Completed | IngestionJobStatus::Failed | IngestionJobStatus::Cancelled))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(id: &str, status: IngestionJobStatus) -> IngestionJob {
        IngestionJob {
            id: id.to_string(),
            source_id: "src1".into(),
            status,
            records_processed: 0,
            records_failed: 0,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_jobs() {
        let repo = InMemoryIngestionJobRepository::new();
        repo.save(job("j1", IngestionJobStatus::Running)).await.unwrap();
        repo.save(job("j2", IngestionJobStatus::Completed)).await.unwrap();
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "j1");
    }
}
