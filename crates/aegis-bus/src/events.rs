//! Typed payloads for every bus topic named in the platform's external
//! interfaces, plus the [`BusEvent`] envelope that carries one of them.

use aegis_types::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Published whenever the ingestion pipeline finishes writing an uploaded
/// file to object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadEvent {
    /// Unique event id.
    pub event_id: String,
    /// File this event concerns.
    pub file_id: String,
    /// Original file name.
    pub file_name: String,
    /// MIME type, if known.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Actor that performed the upload.
    pub uploaded_by: String,
    /// When the upload completed.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata carried with the upload.
    pub metadata: JsonValue,
}

/// Published as a streamed ingestion job progresses or finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProcessingEvent {
    /// Ingestion job this event concerns.
    pub job_id: String,
    /// Source file, if the job originated from an upload.
    pub file_id: Option<String>,
    /// Free-form job status (`"running"`, `"completed"`, `"failed"`).
    pub status: String,
    /// Records successfully processed so far.
    pub records_processed: u64,
    /// Records that failed validation/processing.
    pub records_failed: u64,
    /// Wall-clock milliseconds spent processing so far.
    pub processing_time_ms: u64,
    /// When this status was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Published when a batch of records has been validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataValidationEvent {
    /// Ingestion job this event concerns.
    pub job_id: String,
    /// Whether the batch as a whole is valid.
    pub is_valid: bool,
    /// Number of records that failed validation.
    pub error_count: u64,
    /// Human-readable validation error messages.
    pub validation_errors: Vec<String>,
    /// When validation completed.
    pub timestamp: DateTime<Utc>,
}

/// Published per-record onto the transaction-flow topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionFlowEvent {
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
    /// Free-form risk tier (`"low"`, `"medium"`, `"high"`, `"critical"`).
    pub risk_level: String,
    /// Numeric risk score in `[0, 100]`.
    pub risk_score: f64,
    /// When the transaction occurred.
    pub timestamp: DateTime<Utc>,
}

/// Published by any component that wants to surface an operational error
/// without failing its own caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Component that raised the error (`"notification-manager"`, …).
    pub component: String,
    /// Operation that was being attempted.
    pub operation: String,
    /// Stable error code/category.
    pub error_code: String,
    /// Human-readable error message.
    pub error_message: String,
    /// Free-form additional context.
    pub context: JsonValue,
    /// When the error occurred.
    pub timestamp: DateTime<Utc>,
}

/// Published by the graph engine orchestrator when an analysis job
/// completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCompletedEvent {
    /// Analysis job this event concerns.
    pub job_id: String,
    /// Analysis kind (`"subgraph"`, `"paths"`, …).
    pub job_type: String,
    /// Entities covered by the analysis.
    pub entity_ids: Vec<String>,
    /// When the analysis completed.
    pub timestamp: DateTime<Utc>,
}

/// Published when a new investigation is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationCreatedEvent {
    /// Investigation id.
    pub investigation_id: String,
    /// Actor that created it.
    pub created_by: String,
    /// Entities that were members at creation time.
    pub member_entity_ids: Vec<String>,
    /// When the investigation was created.
    pub timestamp: DateTime<Utc>,
}

/// Published by the entity resolver once a candidate has been matched or
/// admitted as new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityResolvedEvent {
    /// Candidate entity id that was resolved.
    pub entity_id: String,
    /// Matched entity id, if the candidate was merged into an existing one.
    pub matched_entity_id: Option<String>,
    /// Matching strategy that produced the result.
    pub strategy: String,
    /// Confidence of the match, if any.
    pub confidence: Option<f64>,
    /// When resolution completed.
    pub timestamp: DateTime<Utc>,
}

/// Published by the pattern detector for each pattern found above its
/// confidence threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDetectedEvent {
    /// Detected pattern id.
    pub pattern_id: String,
    /// Pattern type, as its wire name (see [`aegis_types::PatternType`]).
    pub pattern_type: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Derived risk score in `[0, 100]`.
    pub risk_score: f64,
    /// Entities involved in the pattern.
    pub involved_entities: Vec<String>,
    /// When the pattern was detected.
    pub timestamp: DateTime<Utc>,
}

/// Envelope around every typed payload this bus carries, tagged by variant
/// so `topic()` can report the topic it belongs on without a lookup table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BusEvent {
    /// See [`FileUploadEvent`].
    FileUpload(FileUploadEvent),
    /// See [`DataProcessingEvent`].
    DataProcessing(DataProcessingEvent),
    /// See [`DataValidationEvent`].
    DataValidation(DataValidationEvent),
    /// See [`TransactionFlowEvent`].
    TransactionFlow(TransactionFlowEvent),
    /// See [`ErrorEvent`].
    ErrorEvent(ErrorEvent),
    /// See [`AnalysisCompletedEvent`].
    AnalysisCompleted(AnalysisCompletedEvent),
    /// See [`InvestigationCreatedEvent`].
    InvestigationCreated(InvestigationCreatedEvent),
    /// See [`EntityResolvedEvent`].
    EntityResolved(EntityResolvedEvent),
    /// See [`PatternDetectedEvent`].
    PatternDetected(PatternDetectedEvent),
}

impl BusEvent {
    /// The well-known topic name this event is published onto.
    pub fn topic(&self) -> &'static str {
        match self {
            BusEvent::FileUpload(_) => "file_upload",
            BusEvent::DataProcessing(_) => "data_processing",
            BusEvent::DataValidation(_) => "data_validation",
            BusEvent::TransactionFlow(_) => "transaction_flow",
            BusEvent::ErrorEvent(_) => "error_events",
            BusEvent::AnalysisCompleted(_) => "analysis_completed",
            BusEvent::InvestigationCreated(_) => "investigation_created",
            BusEvent::EntityResolved(_) => "entity_resolved",
            BusEvent::PatternDetected(_) => "pattern_detected",
        }
    }
}

/// Headers attached to a published message, e.g.
/// `content-type=application/json`, `source-service=data-ingestion`.
pub type Headers = BTreeMap<String, String>;

/// Standard headers the ingestion pipeline attaches to every
/// `transaction_flow` publish.
pub fn transaction_flow_headers() -> Headers {
    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), "application/json".to_string());
    headers.insert("source-service".to_string(), "data-ingestion".to_string());
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_match_external_interface_contract() {
        let event = BusEvent::TransactionFlow(TransactionFlowEvent {
            transaction_id: "t1".into(),
            from_entity: "e1".into(),
            to_entity: "e2".into(),
            amount: 100.0,
            currency: "USD".into(),
            risk_level: "low".into(),
            risk_score: 10.0,
            timestamp: Utc::now(),
        });
        assert_eq!(event.topic(), "transaction_flow");
    }
}
