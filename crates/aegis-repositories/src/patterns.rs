//! Detected [`Pattern`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, Pattern, Result};
use async_trait::async_trait;

/// Persistence contract for [`Pattern`] records.
#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Insert or overwrite a detected pattern.
    async fn save(&self, pattern: Pattern) -> Result<()>;
    /// Fetch a single pattern by id.
    async fn get(&self, id: &str) -> Result<Pattern>;
    /// List patterns that involve the given entity.
    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Pattern>>;
}

/// In-memory [`PatternRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryPatternRepository {
    store: InMemoryStore<Pattern>,
}

impl InMemoryPatternRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn save(&self, pattern: Pattern) -> Result<()> {
        self.store.put(pattern.id.clone(), pattern).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Pattern> {
        self.store.get(id).await.ok_or_else(|| Error::not_found("pattern", id))
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Pattern>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|p| p.involved_entities.iter().any(|e| e == entity_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::PatternType;
    use chrono::Utc;

    #[tokio::test]
    async fn list_for_entity_matches_involved_entities() {
        let repo = InMemoryPatternRepository::new();
        repo.save(Pattern {
            id: "p1".into(),
            pattern_type: PatternType::Smurfing,
            confidence: 0.8,
            risk_score: Pattern::risk_score_for(0.8, PatternType::Smurfing),
            involved_entities: vec!["e1".into(), "e2".into()],
            indicators: vec!["many small deposits".into()],
            detected_at: Utc::now(),
        })
        .await
        .unwrap();

        assert_eq!(repo.list_for_entity("e1").await.unwrap().len(), 1);
        assert!(repo.list_for_entity("e9").await.unwrap().is_empty());
    }
}
