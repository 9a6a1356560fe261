//! [`AuditEvent`] repository contract and in-memory reference adapter.
//!
//! Audit events are append-only: there is no update or delete, only `record`
//! and `list`.

use crate::store::InMemoryStore;
use aegis_types::{AuditEvent, Result};
use async_trait::async_trait;

/// Append-only persistence contract for [`AuditEvent`] records.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append a new audit event.
    async fn record(&self, event: AuditEvent) -> Result<()>;
    /// List every recorded event concerning `entity_id`, oldest first.
    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<AuditEvent>>;
}

/// In-memory [`AuditRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryAuditRepository {
    store: InMemoryStore<AuditEvent>,
}

impl InMemoryAuditRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        self.store.put(event.id.clone(), event).await;
        Ok(())
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<AuditEvent>> {
        let mut events: Vec<AuditEvent> = self
            .store
            .all()
            .await
            .into_iter()
            .filter(|e| e.entity_id == entity_id)
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn list_for_entity_returns_oldest_first() {
        let repo = InMemoryAuditRepository::new();
        let t0 = Utc::now();
        repo.record(AuditEvent {
            id: "a2".into(),
            actor: "scheduler".into(),
            action: "alert_escalated".into(),
            entity_id: "alert-1".into(),
            rule_id: None,
            timestamp: t0 + chrono::Duration::seconds(5),
        })
        .await
        .unwrap();
        repo.record(AuditEvent {
            id: "a1".into(),
            actor: "scheduler".into(),
            action: "alert_created".into(),
            entity_id: "alert-1".into(),
            rule_id: None,
            timestamp: t0,
        })
        .await
        .unwrap();

        let events = repo.list_for_entity("alert-1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "a1");
        assert_eq!(events[1].id, "a2");
    }
}
