//! Shared data model for the AegisShield financial-crime detection
//! platform, plus the cross-cutting [`error`] taxonomy and [`json`] value
//! abstraction every other crate builds on.

pub mod alert;
pub mod audit;
pub mod error;
pub mod graph;
pub mod ingestion;
pub mod json;
pub mod ml;
pub mod notification;
pub mod pattern;
pub mod rule;
pub mod scheduled_task;

pub use alert::{Alert, AlertSeverity, AlertStatus};
pub use audit::AuditEvent;
pub use error::{Error, Result};
pub use graph::{AnalysisJob, Entity, Investigation, JobStatus, NetworkMetrics, Relationship};
pub use ingestion::{IngestionJob, IngestionJobStatus, UploadRecord, UploadStatus};
pub use json::JsonValue;
pub use ml::{Model, ModelStatus, PredictionRequest, PredictionStatus, TrainingJob, TrainingJobStatus};
pub use notification::{Channel, Notification, NotificationPriority, NotificationStatus};
pub use pattern::{Pattern, PatternType};
pub use rule::{ConditionOperator, Rule, RuleAction, RuleCondition, RuleType};
pub use scheduled_task::ScheduledTask;
