//! Graph [`AnalysisJob`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{AnalysisJob, Error, JobStatus, Result};
use async_trait::async_trait;

/// Persistence contract for [`AnalysisJob`] records.
#[async_trait]
pub trait AnalysisJobRepository: Send + Sync {
    /// Insert or overwrite an analysis job.
    async fn save(&self, job: AnalysisJob) -> Result<()>;
    /// Fetch a single job by id.
    async fn get(&self, id: &str) -> Result<AnalysisJob>;
    /// List jobs in the given status, if any.
    async fn list(&self, status: Option<JobStatus>) -> Result<Vec<AnalysisJob>>;
}

/// In-memory [`AnalysisJobRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryAnalysisJobRepository {
    store: InMemoryStore<AnalysisJob>,
}

impl InMemoryAnalysisJobRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisJobRepository for InMemoryAnalysisJobRepository {
    async fn save(&self, job: AnalysisJob) -> Result<()> {
        self.store.put(job.id.clone(), job).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<AnalysisJob> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| Error::not_found("analysis_job", id))
    }

    async fn list(&self, status: Option<JobStatus>) -> Result<Vec<AnalysisJob>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::JsonValue;

    #[tokio::test]
    async fn list_filters_by_status() {
        let repo = InMemoryAnalysisJobRepository::new();
        repo.save(AnalysisJob::new("j1", "subgraph", JsonValue::empty_object(), "system"))
            .await
            .unwrap();
        let mut job2 = AnalysisJob::new("j2", "paths", JsonValue::empty_object(), "system");
        job2.mark_processing(chrono::Utc::now());
        repo.save(job2).await.unwrap();

        let pending = repo.list(Some(JobStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "j1");
    }
}
