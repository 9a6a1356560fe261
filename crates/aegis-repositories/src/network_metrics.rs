//! [`NetworkMetrics`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{NetworkMetrics, Result};
use async_trait::async_trait;

/// Persistence contract for computed [`NetworkMetrics`].
///
/// Keyed by entity id rather than a synthetic id: at most one metrics
/// snapshot is retained per entity, overwritten on every recomputation.
#[async_trait]
pub trait NetworkMetricsRepository: Send + Sync {
    /// Overwrite the metrics snapshot for `metrics.entity_id`.
    async fn upsert(&self, metrics: NetworkMetrics) -> Result<()>;
    /// Fetch the current metrics snapshot for an entity, if computed.
    async fn get(&self, entity_id: &str) -> Result<Option<NetworkMetrics>>;
    /// List every entity currently assigned to `community_id`.
    async fn list_by_community(&self, community_id: &str) -> Result<Vec<NetworkMetrics>>;
}

/// In-memory [`NetworkMetricsRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryNetworkMetricsRepository {
    store: InMemoryStore<NetworkMetrics>,
}

impl InMemoryNetworkMetricsRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NetworkMetricsRepository for InMemoryNetworkMetricsRepository {
    async fn upsert(&self, metrics: NetworkMetrics) -> Result<()> {
        self.store.put(metrics.entity_id.clone(), metrics).await;
        Ok(())
    }

    async fn get(&self, entity_id: &str) -> Result<Option<NetworkMetrics>> {
        Ok(self.store.get(entity_id).await)
    }

    async fn list_by_community(&self, community_id: &str) -> Result<Vec<NetworkMetrics>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|m| m.community_id.as_deref() == Some(community_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn metrics(entity_id: &str, community_id: Option<&str>) -> NetworkMetrics {
        NetworkMetrics {
            entity_id: entity_id.to_string(),
            degree: 3.0,
            betweenness: 0.1,
            closeness: 0.2,
            eigenvector: 0.3,
            pagerank: 0.1,
            clustering: 0.4,
            community_id: community_id.map(str::to_string),
            calculated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_previous_snapshot() {
        let repo = InMemoryNetworkMetricsRepository::new();
        repo.upsert(metrics("e1", None)).await.unwrap();
        repo.upsert(metrics("e1", Some("c1"))).await.unwrap();
        let got = repo.get("e1").await.unwrap().unwrap();
        assert_eq!(got.community_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn list_by_community_filters_correctly() {
        let repo = InMemoryNetworkMetricsRepository::new();
        repo.upsert(metrics("e1", Some("c1"))).await.unwrap();
        repo.upsert(metrics("e2", Some("c2"))).await.unwrap();
        let members = repo.list_by_community("c1").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].entity_id, "e1");
    }
}
