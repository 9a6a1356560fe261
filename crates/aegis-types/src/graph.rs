//! Graph-domain entities: analysis jobs, investigations, entities,
//! relationships, and computed network metrics.

use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Lifecycle status of an [`AnalysisJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet started.
    Pending,
    /// Currently executing.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

/// A graph-analysis job tracked from submission through completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// Unique id.
    pub id: String,
    /// Analysis kind (`"subgraph"`, `"paths"`, …).
    pub job_type: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Parameters the job was submitted with.
    pub parameters: JsonValue,
    /// Result payload, non-empty iff `status == Completed`.
    pub results: JsonValue,
    /// Work units completed so far.
    pub progress: u64,
    /// Total work units, if known up front.
    pub total: u64,
    /// When execution began.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution finished (success or failure).
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message, non-empty iff `status == Failed`.
    pub error: Option<String>,
    /// Actor that submitted the job.
    pub created_by: String,
}

impl AnalysisJob {
    /// Create a new job in `Pending` status.
    pub fn new(id: impl Into<String>, job_type: impl Into<String>, parameters: JsonValue, created_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            status: JobStatus::Pending,
            parameters,
            results: JsonValue::Null,
            progress: 0,
            total: 0,
            started_at: None,
            completed_at: None,
            error: None,
            created_by: created_by.into(),
        }
    }

    /// Mark the job as started.
    pub fn mark_processing(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Processing;
        self.started_at = Some(now);
    }

    /// Mark the job completed with non-empty results.
    pub fn mark_completed(&mut self, results: JsonValue, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.results = results;
        self.completed_at = Some(now);
    }

    /// Mark the job failed with a non-empty error message.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(now);
    }
}

/// A named grouping of entities and alerts under active review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    /// Unique id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form status (`"open"`, `"closed"`, …).
    pub status: String,
    /// Operator-assigned priority.
    pub priority: u32,
    /// Entities that are members of this investigation.
    pub member_entity_ids: HashSet<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
    /// Actor that created the investigation.
    pub created_by: String,
    /// Actor currently assigned to work it.
    pub assigned_to: Option<String>,
}

/// A node in the entity-relationship property graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id.
    pub id: String,
    /// Entity kind (`"person"`, `"account"`, `"company"`, …).
    pub entity_type: String,
    /// Arbitrary typed properties (name, DOB, account number, …).
    pub properties: BTreeMap<String, JsonValue>,
}

impl Entity {
    /// Convenience accessor into `properties`.
    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Convenience accessor for string-valued properties.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(JsonValue::as_str)
    }
}

/// A directed edge between two [`Entity`] nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity id.
    pub source: String,
    /// Target entity id.
    pub target: String,
    /// Relationship kind (`"transfer"`, `"owns"`, `"same_address"`, …).
    pub relationship_type: String,
    /// Arbitrary typed properties.
    pub properties: BTreeMap<String, JsonValue>,
}

impl Relationship {
    /// `confidence` property, if present and numeric.
    pub fn confidence(&self) -> Option<f64> {
        self.properties.get("confidence").and_then(JsonValue::as_f64)
    }

    /// `amount` property, if present and numeric.
    pub fn amount(&self) -> Option<f64> {
        self.properties.get("amount").and_then(JsonValue::as_f64)
    }

    /// `timestamp` property, parsed as RFC 3339, if present.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.properties
            .get("timestamp")
            .and_then(JsonValue::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Computed network-analysis metrics for a single entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMetrics {
    /// Entity these metrics describe.
    pub entity_id: String,
    /// Number of direct relationships.
    pub degree: f64,
    /// Betweenness centrality.
    pub betweenness: f64,
    /// Closeness centrality.
    pub closeness: f64,
    /// Eigenvector centrality.
    pub eigenvector: f64,
    /// PageRank score.
    pub pagerank: f64,
    /// Local clustering coefficient.
    pub clustering: f64,
    /// Detected community id, if community detection has run.
    pub community_id: Option<String>,
    /// When these metrics were computed.
    pub calculated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_job_completion_sets_required_fields() {
        let mut job = AnalysisJob::new("j1", "subgraph", JsonValue::empty_object(), "system");
        let start = Utc::now();
        job.mark_processing(start);
        let end = start + chrono::Duration::seconds(1);
        job.mark_completed(JsonValue::from("ok"), end);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.unwrap() >= job.started_at.unwrap());
        assert!(!matches!(job.results, JsonValue::Null));
    }

    #[test]
    fn analysis_job_failure_has_nonempty_error() {
        let mut job = AnalysisJob::new("j2", "subgraph", JsonValue::empty_object(), "system");
        job.mark_processing(Utc::now());
        job.mark_failed("boom", Utc::now());
        assert_eq!(job.status, JobStatus::Failed);
        assert!(!job.error.unwrap().is_empty());
    }
}
