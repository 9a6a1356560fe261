//! Ingestion-domain entities: file uploads and stream processing jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an [`UploadRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Bytes are being written to storage.
    Uploading,
    /// Write succeeded; a `file_upload` event has been published.
    Uploaded,
    /// Write failed.
    Failed,
}

/// A record of an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Unique id, also used as the storage object's final path segment.
    pub id: String,
    /// Original file name as supplied by the uploader.
    pub file_name: String,
    /// MIME type, if known.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Actor that performed the upload.
    pub uploaded_by: String,
    /// Current lifecycle status.
    pub status: UploadStatus,
    /// Storage key the bytes were (or are being) written to.
    pub storage_key: String,
    /// Error message, if `status == Failed`.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Object-store key for an upload, `uploads/YYYY/MM/DD/<id>`.
    pub fn storage_key_for(id: &str, now: DateTime<Utc>) -> String {
        format!("uploads/{}/{}", now.format("%Y/%m/%d"), id)
    }
}

/// Lifecycle status of an ingestion [`IngestionJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionJobStatus {
    /// Queued, not yet started.
    Pending,
    /// Currently processing records.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion; refused from a terminal state.
    Cancelled,
}

impl IngestionJobStatus {
    /// True for `Completed`, `Failed`, and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IngestionJobStatus::Completed | IngestionJobStatus::Failed | IngestionJobStatus::Cancelled
        )
    }
}

/// A streamed-ingestion processing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJob {
    /// Unique id.
    pub id: String,
    /// Upload or stream source this job processes.
    pub source_id: String,
    /// Current lifecycle status.
    pub status: IngestionJobStatus,
    /// Records successfully processed so far.
    pub records_processed: u64,
    /// Records that failed validation/processing.
    pub records_failed: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp, once terminal.
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message, if `status == Failed`.
    pub error: Option<String>,
}

impl IngestionJob {
    /// Refuses to cancel a job already in a terminal state.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status.is_terminal() {
            return Err(format!("cannot cancel job already in terminal status {:?}", self.status));
        }
        self.status = IngestionJobStatus::Cancelled;
        self.completed_at = Some(now);
        Ok(())
    }
}
