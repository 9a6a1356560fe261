//! Persistence contracts for AegisShield's durable entities, plus
//! in-memory reference adapters used by tests and local composition.
//!
//! Every contract here follows the same shape: a small `#[async_trait]`
//! trait named `<Entity>Repository`, and an `InMemory<Entity>Repository`
//! backed by [`store::InMemoryStore`]. Production deployments swap the
//! in-memory adapter for a real relational-store adapter behind the same
//! trait; nothing above this layer needs to change.

pub mod alerts;
pub mod audit;
pub mod ingestion_jobs;
pub mod investigations;
pub mod jobs;
pub mod models;
pub mod network_metrics;
pub mod notifications;
pub mod object_storage;
pub mod patterns;
pub mod predictions;
pub mod rules;
pub mod store;
pub mod training_jobs;
pub mod uploads;

pub use alerts::{AlertFilter, AlertRepository, InMemoryAlertRepository};
pub use audit::{AuditRepository, InMemoryAuditRepository};
pub use ingestion_jobs::{IngestionJobRepository, InMemoryIngestionJobRepository};
pub use investigations::{InMemoryInvestigationRepository, InvestigationRepository};
pub use jobs::{AnalysisJobRepository, InMemoryAnalysisJobRepository};
pub use models::{InMemoryModelRepository, ModelRepository};
pub use network_metrics::{InMemoryNetworkMetricsRepository, NetworkMetricsRepository};
pub use notifications::{InMemoryNotificationRepository, NotificationFilter, NotificationRepository};
pub use object_storage::{FilesystemObjectStorage, ObjectStorage};
pub use patterns::{InMemoryPatternRepository, PatternRepository};
pub use predictions::{InMemoryPredictionRequestRepository, PredictionRequestRepository};
pub use rules::{InMemoryRuleRepository, RuleRepository};
pub use store::InMemoryStore;
pub use training_jobs::{InMemoryTrainingJobRepository, TrainingJobRepository};
pub use uploads::{InMemoryUploadRepository, UploadRepository};
