//! File upload handling: durable bytes via the object-storage adapter,
//! lifecycle tracking via [`UploadRepository`], and a `file_upload`
//! event on success.

use crate::error::{Error, Result};
use aegis_bus::{BusEvent, FileUploadEvent, Headers, MessageBusProducer};
use aegis_repositories::{ObjectStorage, UploadRepository};
use aegis_types::{JsonValue, UploadRecord, UploadStatus};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Accepts uploaded files, writes them to object storage, and tracks
/// their lifecycle through `uploading -> (uploaded | failed)`.
pub struct UploadPipeline {
    uploads: Arc<dyn UploadRepository>,
    storage: Arc<dyn ObjectStorage>,
    bus: Arc<dyn MessageBusProducer>,
    max_upload_size_bytes: u64,
}

impl UploadPipeline {
    /// Construct a pipeline rejecting uploads over `max_upload_size_bytes`.
    pub fn new(uploads: Arc<dyn UploadRepository>, storage: Arc<dyn ObjectStorage>, bus: Arc<dyn MessageBusProducer>, max_upload_size_bytes: u64) -> Self {
        Self {
            uploads,
            storage,
            bus,
            max_upload_size_bytes,
        }
    }

    /// Create an upload record in `uploading`, write `bytes` to storage
    /// under `uploads/YYYY/MM/DD/<id>`, and on success mark `uploaded`
    /// and publish a `file_upload` event. On write failure marks
    /// `failed` with the error and returns it.
    pub async fn upload(&self, file_name: String, file_type: String, bytes: Vec<u8>, uploaded_by: String) -> Result<UploadRecord> {
        if bytes.len() as u64 > self.max_upload_size_bytes {
            return Err(Error::Validation(format!(
                "upload of {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.max_upload_size_bytes
            )));
        }

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let storage_key = UploadRecord::storage_key_for(&id, now);
        let file_size = bytes.len() as u64;

        let mut record = UploadRecord {
            id: id.clone(),
            file_name: file_name.clone(),
            file_type: file_type.clone(),
            file_size,
            uploaded_by: uploaded_by.clone(),
            status: UploadStatus::Uploading,
            storage_key: storage_key.clone(),
            error: None,
            created_at: now,
        };
        self.uploads.save(record.clone()).await?;

        match self.storage.put(&storage_key, bytes).await {
            Ok(()) => {
                record.status = UploadStatus::Uploaded;
                self.uploads.save(record.clone()).await?;

                self.bus
                    .publish(
                        BusEvent::FileUpload(FileUploadEvent {
                            event_id: Uuid::new_v4().to_string(),
                            file_id: record.id.clone(),
                            file_name: record.file_name.clone(),
                            file_type: record.file_type.clone(),
                            file_size: record.file_size,
                            uploaded_by: record.uploaded_by.clone(),
                            timestamp: Utc::now(),
                            metadata: JsonValue::empty_object(),
                        }),
                        Headers::new(),
                    )
                    .await?;

                Ok(record)
            }
            Err(err) => {
                record.status = UploadStatus::Failed;
                record.error = Some(err.to_string());
                self.uploads.save(record.clone()).await?;
                Err(Error::Types(err))
            }
        }
    }
}
