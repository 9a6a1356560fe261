//! Streamed-record ingestion: per-record publishes to the
//! transaction-flow topic plus `pending -> running -> (completed |
//! failed | cancelled)` job lifecycle tracking.

use crate::error::{Error, Result};
use aegis_bus::events::transaction_flow_headers;
use aegis_bus::{BusEvent, MessageBusProducer, TransactionFlowEvent};
use aegis_repositories::IngestionJobRepository;
use aegis_types::{IngestionJob, IngestionJobStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A single transaction record accepted by the streaming pipeline.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    /// Unique transaction id.
    pub transaction_id: String,
    /// Originating entity id.
    pub from_entity: String,
    /// Receiving entity id.
    pub to_entity: String,
    /// Transaction amount.
    pub amount: f64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Free-form risk tier.
    pub risk_level: String,
    /// Numeric risk score in `[0, 100]`.
    pub risk_score: f64,
    /// When the transaction occurred.
    pub timestamp: DateTime<Utc>,
}

/// Publishes streamed transaction records onto the transaction-flow
/// topic in best-effort-atomic batches, and tracks the owning
/// [`IngestionJob`] through to completion.
pub struct StreamIngestionPipeline {
    jobs: Arc<dyn IngestionJobRepository>,
    bus: Arc<dyn MessageBusProducer>,
    batch_size: usize,
}

impl StreamIngestionPipeline {
    /// Construct a pipeline batching publishes by `batch_size` records.
    pub fn new(jobs: Arc<dyn IngestionJobRepository>, bus: Arc<dyn MessageBusProducer>, batch_size: usize) -> Self {
        Self { jobs, bus, batch_size: batch_size.max(1) }
    }

    /// Open a new ingestion job in `pending` for `source_id`.
    pub async fn start_job(&self, source_id: String) -> Result<IngestionJob> {
        let job = IngestionJob {
            id: Uuid::new_v4().to_string(),
            source_id,
            status: IngestionJobStatus::Pending,
            records_processed: 0,
            records_failed: 0,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        };
        self.jobs.save(job.clone()).await?;
        Ok(job)
    }

    /// Publish `records` in batches of `batch_size`, transitioning
    /// `job_id` to `running` and then to `completed` or `failed`.
    pub async fn ingest(&self, job_id: &str, records: Vec<TransactionRecord>) -> Result<IngestionJob> {
        let mut job = self.jobs.get(job_id).await?;
        job.status = IngestionJobStatus::Running;
        self.jobs.save(job.clone()).await?;

        let headers = transaction_flow_headers();
        for chunk in records.chunks(self.batch_size) {
            let batch: Vec<(BusEvent, aegis_bus::Headers)> = chunk
                .iter()
                .map(|record| {
                    (
                        BusEvent::TransactionFlow(TransactionFlowEvent {
                            transaction_id: record.transaction_id.clone(),
                            from_entity: record.from_entity.clone(),
                            to_entity: record.to_entity.clone(),
                            amount: record.amount,
                            currency: record.currency.clone(),
                            risk_level: record.risk_level.clone(),
                            risk_score: record.risk_score,
                            timestamp: record.timestamp,
                        }),
                        headers.clone(),
                    )
                })
                .collect();

            match self.bus.publish_batch(batch).await {
                Ok(()) => job.records_processed += chunk.len() as u64,
                Err(err) => {
                    job.records_failed += chunk.len() as u64;
                    job.status = IngestionJobStatus::Failed;
                    job.error = Some(err.to_string());
                    job.completed_at = Some(Utc::now());
                    self.jobs.save(job.clone()).await?;
                    return Err(Error::Types(err));
                }
            }
        }

        job.status = IngestionJobStatus::Completed;
        job.completed_at = Some(Utc::now());
        self.jobs.save(job.clone()).await?;
        Ok(job)
    }

    /// Cancel a job that hasn't reached a terminal status.
    pub async fn cancel(&self, job_id: &str) -> Result<IngestionJob> {
        let mut job = self.jobs.get(job_id).await?;
        job.cancel(Utc::now()).map_err(Error::Validation)?;
        self.jobs.save(job.clone()).await?;
        Ok(job)
    }
}
