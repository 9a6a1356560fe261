//! Alert repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Alert, AlertStatus, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter applied by [`AlertRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    /// Restrict to alerts in this status.
    pub status: Option<AlertStatus>,
    /// Restrict to alerts with this escalation policy set.
    pub has_escalation_policy: Option<bool>,
    /// Restrict to alerts created strictly before this time.
    pub created_before: Option<DateTime<Utc>>,
    /// Restrict to alerts created strictly after this time.
    pub created_after: Option<DateTime<Utc>>,
    /// Restrict to alerts that have never been acknowledged.
    pub unacknowledged_only: bool,
}

/// Persistence contract for [`Alert`] records.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Insert or overwrite an alert.
    async fn save(&self, alert: Alert) -> Result<()>;
    /// Fetch a single alert by id.
    async fn get(&self, id: &str) -> Result<Alert>;
    /// List alerts matching `filter`.
    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>>;
    /// Delete an alert, idempotently.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory [`AlertRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryAlertRepository {
    store: InMemoryStore<Alert>,
}

impl InMemoryAlertRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn save(&self, alert: Alert) -> Result<()> {
        self.store.put(alert.id.clone(), alert).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Alert> {
        self.store.get(id).await.ok_or_else(|| Error::not_found("alert", id))
    }

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| {
                filter
                    .has_escalation_policy
                    .is_none_or(|has| a.escalation_policy_id.is_some() == has)
            })
            .filter(|a| filter.created_before.is_none_or(|t| a.created_at < t))
            .filter(|a| filter.created_after.is_none_or(|t| a.created_at > t))
            .filter(|a| !filter.unacknowledged_only || a.acknowledged_at.is_none())
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::{AlertSeverity, JsonValue};

    fn alert(id: &str, status: AlertStatus) -> Alert {
        let now = Utc::now();
        Alert {
            id: id.to_string(),
            title: "t".into(),
            description: "d".into(),
            severity: AlertSeverity::Medium,
            priority: 1,
            status,
            source: "rule".into(),
            created_at: now,
            updated_at: now,
            acknowledged_at: None,
            resolved_at: None,
            escalation_level: 0,
            escalation_policy_id: None,
            created_by: "system".into(),
            updated_by: "system".into(),
            metadata: JsonValue::empty_object(),
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let repo = InMemoryAlertRepository::new();
        repo.save(alert("a1", AlertStatus::Active)).await.unwrap();
        let got = repo.get("a1").await.unwrap();
        assert_eq!(got.id, "a1");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let repo = InMemoryAlertRepository::new();
        let err = repo.get("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let repo = InMemoryAlertRepository::new();
        repo.save(alert("a1", AlertStatus::Active)).await.unwrap();
        repo.save(alert("a2", AlertStatus::Resolved)).await.unwrap();
        let filter = AlertFilter {
            status: Some(AlertStatus::Active),
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a1");
    }
}
