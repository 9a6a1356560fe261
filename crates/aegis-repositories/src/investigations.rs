//! Investigation repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, Investigation, Result};
use async_trait::async_trait;

/// Persistence contract for [`Investigation`] records.
#[async_trait]
pub trait InvestigationRepository: Send + Sync {
    /// Insert or overwrite an investigation.
    async fn save(&self, investigation: Investigation) -> Result<()>;
    /// Fetch a single investigation by id.
    async fn get(&self, id: &str) -> Result<Investigation>;
    /// List every investigation that includes `entity_id` as a member.
    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Investigation>>;
}

/// In-memory [`InvestigationRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryInvestigationRepository {
    store: InMemoryStore<Investigation>,
}

impl InMemoryInvestigationRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvestigationRepository for InMemoryInvestigationRepository {
    async fn save(&self, investigation: Investigation) -> Result<()> {
        self.store.put(investigation.id.clone(), investigation).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Investigation> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| Error::not_found("investigation", id))
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Investigation>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|inv| inv.member_entity_ids.contains(entity_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    #[tokio::test]
    async fn list_for_entity_matches_membership() {
        let repo = InMemoryInvestigationRepository::new();
        let now = Utc::now();
        let mut members = HashSet::new();
        members.insert("e1".to_string());
        repo.save(Investigation {
            id: "inv1".into(),
            name: "case".into(),
            status: "open".into(),
            priority: 1,
            member_entity_ids: members,
            created_at: now,
            updated_at: now,
            created_by: "analyst".into(),
            assigned_to: None,
        })
        .await
        .unwrap();

        let found = repo.list_for_entity("e1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(repo.list_for_entity("e2").await.unwrap().is_empty());
    }
}
