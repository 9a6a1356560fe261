//! Notification repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, Notification, NotificationStatus, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter applied by [`NotificationRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    /// Restrict to notifications in this status.
    pub status: Option<NotificationStatus>,
    /// Restrict to notifications created strictly before this time.
    pub created_before: Option<DateTime<Utc>>,
}

/// Persistence contract for [`Notification`] records.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert or overwrite a notification.
    async fn save(&self, notification: Notification) -> Result<()>;
    /// Fetch a single notification by id.
    async fn get(&self, id: &str) -> Result<Notification>;
    /// List notifications matching `filter`.
    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>>;
    /// Delete notifications older than `cutoff` with a terminal status,
    /// returning the number removed.
    async fn delete_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// In-memory [`NotificationRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    store: InMemoryStore<Notification>,
}

impl InMemoryNotificationRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, notification: Notification) -> Result<()> {
        self.store.put(notification.id.clone(), notification).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Notification> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| Error::not_found("notification", id))
    }

    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|n| filter.status.is_none_or(|s| n.status == s))
            .filter(|n| filter.created_before.is_none_or(|t| n.created_at < t))
            .collect())
    }

    async fn delete_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .store
            .retain(|n| {
                let terminal = matches!(
                    n.status,
                    NotificationStatus::Sent | NotificationStatus::Failed
                );
                !(terminal && n.created_at < cutoff)
            })
            .await;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::{JsonValue, NotificationPriority};

    fn notification(id: &str, status: NotificationStatus, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: id.to_string(),
            alert_id: None,
            rule_id: None,
            channel: aegis_types::Channel::Email,
            recipient: "user@example.com".into(),
            subject: "s".into(),
            message: "m".into(),
            priority: NotificationPriority::Medium,
            status,
            retry_count: 0,
            max_retries: 3,
            template_id: None,
            template_data: JsonValue::empty_object(),
            external_id: None,
            created_at,
            last_error: None,
        }
    }

    #[tokio::test]
    async fn delete_terminal_before_only_removes_old_terminal_entries() {
        let repo = InMemoryNotificationRepository::new();
        let old = Utc::now() - chrono::Duration::days(40);
        let recent = Utc::now();
        repo.save(notification("n1", NotificationStatus::Sent, old)).await.unwrap();
        repo.save(notification("n2", NotificationStatus::Pending, old)).await.unwrap();
        repo.save(notification("n3", NotificationStatus::Sent, recent)).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let removed = repo.delete_terminal_before(cutoff).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get("n1").await.is_err());
        assert!(repo.get("n2").await.is_ok());
        assert!(repo.get("n3").await.is_ok());
    }
}
