//! [`UploadRecord`] repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, Result, UploadRecord};
use async_trait::async_trait;

/// Persistence contract for [`UploadRecord`]s.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Insert or overwrite an upload record.
    async fn save(&self, upload: UploadRecord) -> Result<()>;
    /// Fetch a single upload record by id.
    async fn get(&self, id: &str) -> Result<UploadRecord>;
}

/// In-memory [`UploadRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryUploadRepository {
    store: InMemoryStore<UploadRecord>,
}

impl InMemoryUploadRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UploadRepository for InMemoryUploadRepository {
    async fn save(&self, upload: UploadRecord) -> Result<()> {
        self.store.put(upload.id.clone(), upload).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<UploadRecord> {
        self.store.get(id).await.ok_or_else(|| Error::not_found("upload", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::UploadStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let repo = InMemoryUploadRepository::new();
        let now = Utc::now();
        repo.save(UploadRecord {
            id: "u1".into(),
            file_name: "transactions.csv".into(),
            file_type: "text/csv".into(),
            file_size: 1024,
            uploaded_by: "analyst".into(),
            status: UploadStatus::Uploading,
            storage_key: UploadRecord::storage_key_for("u1", now),
            error: None,
            created_at: now,
        })
        .await
        .unwrap();

        let got = repo.get("u1").await.unwrap();
        assert_eq!(got.file_name, "transactions.csv");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let repo = InMemoryUploadRepository::new();
        let err = repo.get("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
